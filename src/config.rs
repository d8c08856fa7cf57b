//! Analysis configuration
//!
//! Every tunable constant of the breathing and HRV pipeline lives here. The
//! defaults reproduce the reference tuning for a chest strap sampling its
//! accelerometer at 200 Hz.

use serde::{Deserialize, Serialize};

use crate::decoder::ACC_SAMPLE_RATE_HZ;
use crate::error::ComputeError;

/// Tunables for [`crate::pipeline::BreathingAnalyser`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Accelerometer sampling frequency (Hz)
    pub sample_rate_hz: f64,
    /// Raw accelerometer counts are divided by this before filtering
    pub input_scale: f64,
    /// Gravity low-pass cutoff (Hz)
    pub gravity_cutoff_hz: f64,
    /// Noise low-pass cutoff (Hz)
    pub noise_cutoff_hz: f64,
    /// Minimum peak-to-trough rise for a breath peak to be accepted
    pub breath_peak_threshold: f64,
    /// Half-width of the breathing-rate smoothing window (samples)
    pub smoothing_half_width: usize,
    /// Number of recent accepted IBI swings tracked for the HRV threshold
    pub hrv_buffer_len: usize,
    /// Fraction of the largest recent swing an IBI swing must exceed
    pub hrv_threshold_ratio: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: ACC_SAMPLE_RATE_HZ,
            input_scale: 100.0,
            gravity_cutoff_hz: 0.04,
            noise_cutoff_hz: 0.5,
            breath_peak_threshold: 0.02,
            smoothing_half_width: 3,
            hrv_buffer_len: 3,
            hrv_threshold_ratio: 0.15,
        }
    }
}

impl AnalysisConfig {
    /// Check the configuration for values the pipeline cannot work with
    pub fn validate(&self) -> Result<(), ComputeError> {
        if !(self.sample_rate_hz.is_finite() && self.sample_rate_hz > 0.0) {
            return Err(invalid("sample_rate_hz must be positive"));
        }
        if !(self.input_scale.is_finite() && self.input_scale > 0.0) {
            return Err(invalid("input_scale must be positive"));
        }

        let nyquist = 0.5 * self.sample_rate_hz;
        for (name, cutoff) in [
            ("gravity_cutoff_hz", self.gravity_cutoff_hz),
            ("noise_cutoff_hz", self.noise_cutoff_hz),
        ] {
            if !(cutoff > 0.0 && cutoff < nyquist) {
                return Err(invalid(&format!(
                    "{} must be in (0, {}) Hz, got {}",
                    name, nyquist, cutoff
                )));
            }
        }

        if !(self.breath_peak_threshold.is_finite() && self.breath_peak_threshold >= 0.0) {
            return Err(invalid("breath_peak_threshold must be non-negative"));
        }
        if self.hrv_buffer_len == 0 {
            return Err(invalid("hrv_buffer_len must be at least 1"));
        }
        if !(self.hrv_threshold_ratio.is_finite() && self.hrv_threshold_ratio >= 0.0) {
            return Err(invalid("hrv_threshold_ratio must be non-negative"));
        }
        Ok(())
    }

    /// Load a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to pretty JSON
    pub fn to_json_pretty(&self) -> Result<String, ComputeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn invalid(msg: &str) -> ComputeError {
    ComputeError::InvalidConfig(msg.to_string())
}
