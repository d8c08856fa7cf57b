//! Core types for the breath-flux pipeline
//!
//! This module defines the data structures that flow through each stage:
//! decoded sensor samples, the captured recording, and the derived breathing
//! rate and HRV series.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ComputeError;

/// Sensor stream identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stream {
    Accelerometer,
    HeartRate,
}

impl Stream {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stream::Accelerometer => "accelerometer",
            Stream::HeartRate => "heart_rate",
        }
    }
}

/// One tri-axial accelerometer reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccelerometerSample {
    /// Sample time (seconds)
    pub time: f64,
    /// X axis, raw sensor counts (milli-g on the H10)
    pub x: f64,
    /// Y axis, raw sensor counts
    pub y: f64,
    /// Z axis, raw sensor counts
    pub z: f64,
}

impl AccelerometerSample {
    pub fn new(time: f64, x: f64, y: f64, z: f64) -> Self {
        Self { time, x, y, z }
    }

    pub fn axes(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

/// One inter-beat interval, stamped with its receipt time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IbiSample {
    /// Receipt time (seconds)
    pub time: f64,
    /// Interval (milliseconds)
    pub value: f64,
}

impl IbiSample {
    pub fn new(time: f64, value: f64) -> Self {
        Self { time, value }
    }
}

/// Breathing rate derived from one pair of accepted breath peaks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreathingRateSample {
    /// Time of the later peak (seconds)
    pub time: f64,
    /// Breaths per minute
    pub rate: f64,
}

/// HRV derived from one pair of accepted IBI extrema
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HrvSample {
    /// Time of the later extremum (seconds)
    pub time: f64,
    /// Absolute IBI difference (milliseconds)
    pub value: f64,
}

/// A complete captured session, ready for analysis.
///
/// Accelerometer times are relative to the first accelerometer sample; IBI
/// times are relative to the wall-clock start of the accelerometer stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    #[serde(default = "Uuid::new_v4")]
    pub session_id: Uuid,
    /// Wall-clock time the accelerometer stream started, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub accelerometer: Vec<AccelerometerSample>,
    #[serde(default)]
    pub ibi: Vec<IbiSample>,
}

impl Recording {
    /// Build a recording from already captured sample arrays
    pub fn new(accelerometer: Vec<AccelerometerSample>, ibi: Vec<IbiSample>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            started_at: None,
            accelerometer,
            ibi,
        }
    }

    /// Check that both streams are finite and non-decreasing in time
    pub fn validate(&self) -> Result<(), ComputeError> {
        check_stream(
            Stream::Accelerometer,
            self.accelerometer
                .iter()
                .map(|s| (s.time, s.x.is_finite() && s.y.is_finite() && s.z.is_finite())),
        )?;
        check_stream(
            Stream::HeartRate,
            self.ibi.iter().map(|s| (s.time, s.value.is_finite())),
        )
    }

    /// Load a recording from JSON
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the recording to JSON
    pub fn to_json(&self) -> Result<String, ComputeError> {
        Ok(serde_json::to_string(self)?)
    }
}

fn check_stream(
    stream: Stream,
    samples: impl Iterator<Item = (f64, bool)>,
) -> Result<(), ComputeError> {
    let mut previous = f64::NEG_INFINITY;
    for (index, (time, values_finite)) in samples.enumerate() {
        if !time.is_finite() || !values_finite {
            return Err(ComputeError::NonFiniteValue {
                stream: stream.as_str().to_string(),
                index,
            });
        }
        if time < previous {
            return Err(ComputeError::NonMonotonicTime {
                stream: stream.as_str().to_string(),
                index,
            });
        }
        previous = time;
    }
    Ok(())
}

/// Headline figures of one analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub accelerometer_samples: usize,
    pub ibi_samples: usize,
    pub breath_peaks: usize,
    pub ibi_extrema: usize,
    /// Mean of the raw breathing-rate series (bpm)
    pub mean_breathing_rate_bpm: Option<f64>,
    /// Mean of the HRV series (ms)
    pub mean_hrv_ms: Option<f64>,
}

/// Immutable result of analysing one recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreathingAnalysis {
    pub session_id: Uuid,
    pub summary: AnalysisSummary,
    /// Gravity- and noise-filtered motion magnitude, one value per accelerometer sample
    pub breathing_signal: Vec<f64>,
    /// Accepted breath peak indices into the accelerometer stream
    pub breath_peaks: Vec<usize>,
    pub breathing_rate: Vec<BreathingRateSample>,
    pub breathing_rate_smoothed: Vec<BreathingRateSample>,
    /// Accepted extremum indices into the IBI stream
    pub ibi_extrema: Vec<usize>,
    pub hrv: Vec<HrvSample>,
    /// HRV resampled onto the breathing-rate timestamps
    pub hrv_resampled: Vec<HrvSample>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_equal_times() {
        let recording = Recording::new(
            vec![
                AccelerometerSample::new(0.0, 1.0, 2.0, 3.0),
                AccelerometerSample::new(0.005, 1.0, 2.0, 3.0),
            ],
            vec![IbiSample::new(1.0, 800.0), IbiSample::new(1.0, 810.0)],
        );
        assert!(recording.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_backwards_time() {
        let recording = Recording::new(
            vec![],
            vec![IbiSample::new(2.0, 800.0), IbiSample::new(1.0, 810.0)],
        );
        match recording.validate() {
            Err(ComputeError::NonMonotonicTime { stream, index }) => {
                assert_eq!(stream, "heart_rate");
                assert_eq!(index, 1);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_nan() {
        let recording = Recording::new(
            vec![AccelerometerSample::new(0.0, f64::NAN, 0.0, 0.0)],
            vec![],
        );
        assert!(matches!(
            recording.validate(),
            Err(ComputeError::NonFiniteValue { index: 0, .. })
        ));
    }

    #[test]
    fn test_recording_json_without_session_fields() {
        let json = r#"{
            "accelerometer": [{"time": 0.0, "x": -184.0, "y": -28.0, "z": 949.0}],
            "ibi": [{"time": 0.4, "value": 1000.0}]
        }"#;
        let recording = Recording::from_json(json).unwrap();
        assert_eq!(recording.accelerometer.len(), 1);
        assert_eq!(recording.ibi[0].value, 1000.0);
        assert!(recording.started_at.is_none());

        let reloaded = Recording::from_json(&recording.to_json().unwrap()).unwrap();
        assert_eq!(reloaded, recording);
    }
}
