//! Pipeline orchestration
//!
//! This module provides the public analysis API. It runs the full pipeline
//! once over a complete recording:
//! 1. GravityNoiseFilterPipeline - isolate the breathing signal
//! 2. BreathingRateExtractor - breath peaks and breathing rate
//! 3. HrvExtractor - IBI extrema and HRV, resampled onto breathing-rate times

use tracing::{debug, warn};

use crate::breathing::BreathingRateExtractor;
use crate::config::AnalysisConfig;
use crate::error::ComputeError;
use crate::hrv::HrvExtractor;
use crate::signal::{FilteredAccelerometer, GravityNoiseFilterPipeline};
use crate::types::{AnalysisSummary, BreathingAnalysis, Recording};

/// Analyse a recording JSON document with the default configuration.
///
/// # Returns
/// The analysis serialized as JSON
///
/// # Example
/// ```ignore
/// let analysis_json = analyze_recording_json(&recording_json)?;
/// ```
pub fn analyze_recording_json(recording_json: &str) -> Result<String, ComputeError> {
    let recording = Recording::from_json(recording_json)?;
    let analysis = BreathingAnalyser::new(AnalysisConfig::default())?.analyze(&recording)?;
    Ok(serde_json::to_string(&analysis)?)
}

/// Reusable analyser holding the designed filters and extractor settings.
#[derive(Debug, Clone)]
pub struct BreathingAnalyser {
    config: AnalysisConfig,
    filters: GravityNoiseFilterPipeline,
    breathing: BreathingRateExtractor,
    hrv: HrvExtractor,
}

impl BreathingAnalyser {
    /// Validate `config` and design the filters it describes
    pub fn new(config: AnalysisConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self {
            filters: GravityNoiseFilterPipeline::new(&config)?,
            breathing: BreathingRateExtractor::new(&config),
            hrv: HrvExtractor::new(&config),
            config,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run the gravity and noise filter stages only
    pub fn filter_accelerometer(&self, recording: &Recording) -> FilteredAccelerometer {
        self.filters.filter(&recording.accelerometer)
    }

    /// Analyse a complete recording.
    ///
    /// Degenerate streams are not errors: too few samples simply produce
    /// empty output series.
    pub fn analyze(&self, recording: &Recording) -> Result<BreathingAnalysis, ComputeError> {
        recording.validate()?;

        if recording.accelerometer.len() < 3 {
            warn!(
                samples = recording.accelerometer.len(),
                "accelerometer stream too short for breath detection"
            );
        }
        if recording.ibi.len() < 3 {
            warn!(
                samples = recording.ibi.len(),
                "IBI stream too short for HRV extraction"
            );
        }

        let breathing_signal = self.filters.breathing_signal(&recording.accelerometer);
        debug!(samples = breathing_signal.len(), "breathing signal filtered");

        let acc_times: Vec<f64> = recording.accelerometer.iter().map(|s| s.time).collect();
        let breathing = self.breathing.extract(&acc_times, &breathing_signal);
        debug!(
            peaks = breathing.peaks.len(),
            rates = breathing.rate.len(),
            "breathing rate extracted"
        );

        let hrv = self.hrv.extract(&recording.ibi);
        let br_times: Vec<f64> = breathing.rate.iter().map(|s| s.time).collect();
        let hrv_resampled = hrv.resample(&br_times);
        debug!(
            extrema = hrv.extrema.len(),
            hrv = hrv.values.len(),
            resampled = hrv_resampled.len(),
            "HRV extracted"
        );
        if hrv.values.is_empty() && !br_times.is_empty() {
            warn!("no HRV samples; resampled HRV series is empty");
        }

        let summary = AnalysisSummary {
            accelerometer_samples: recording.accelerometer.len(),
            ibi_samples: recording.ibi.len(),
            breath_peaks: breathing.peaks.len(),
            ibi_extrema: hrv.extrema.len(),
            mean_breathing_rate_bpm: mean(breathing.rate.iter().map(|s| s.rate)),
            mean_hrv_ms: mean(hrv.values.iter().map(|s| s.value)),
        };

        Ok(BreathingAnalysis {
            session_id: recording.session_id,
            summary,
            breathing_signal,
            breath_peaks: breathing.peaks,
            breathing_rate: breathing.rate,
            breathing_rate_smoothed: breathing.smoothed,
            ibi_extrema: hrv.extrema,
            hrv: hrv.values,
            hrv_resampled,
        })
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
