//! Gravity separation and breathing signal extraction
//!
//! Chest-wall motion from breathing is a slow (roughly 0.1-0.5 Hz)
//! modulation riding on a large, slowly varying gravity offset plus faster
//! motion noise. Two zero-phase low-pass stages isolate it:
//!
//! 1. A 0.04 Hz low-pass per axis estimates gravity, which is subtracted.
//! 2. A 0.5 Hz low-pass over the norm of what remains gives the breathing
//!    signal.

use crate::config::AnalysisConfig;
use crate::error::ComputeError;
use crate::filter::ZeroPhaseLowPass;
use crate::types::AccelerometerSample;

/// Intermediate and final series of the gravity/noise filter stages, one
/// entry per accelerometer sample.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredAccelerometer {
    /// Estimated gravity vector (scaled units)
    pub gravity: Vec<[f64; 3]>,
    /// Acceleration with gravity removed (scaled units)
    pub linear: Vec<[f64; 3]>,
    /// Norm of the gravity-free acceleration
    pub motion_magnitude: Vec<f64>,
    /// Noise-filtered motion magnitude
    pub breathing_signal: Vec<f64>,
}

/// Two-stage zero-phase low-pass pipeline over a full accelerometer capture
#[derive(Debug, Clone)]
pub struct GravityNoiseFilterPipeline {
    gravity_filter: ZeroPhaseLowPass,
    noise_filter: ZeroPhaseLowPass,
    input_scale: f64,
}

impl GravityNoiseFilterPipeline {
    pub fn new(config: &AnalysisConfig) -> Result<Self, ComputeError> {
        Ok(Self {
            gravity_filter: ZeroPhaseLowPass::butterworth(
                config.gravity_cutoff_hz,
                config.sample_rate_hz,
            )?,
            noise_filter: ZeroPhaseLowPass::butterworth(
                config.noise_cutoff_hz,
                config.sample_rate_hz,
            )?,
            input_scale: config.input_scale,
        })
    }

    /// Run both filter stages, keeping every intermediate series.
    pub fn filter(&self, samples: &[AccelerometerSample]) -> FilteredAccelerometer {
        if samples.is_empty() {
            return FilteredAccelerometer::default();
        }

        let scaled: Vec<[f64; 3]> = samples
            .iter()
            .map(|s| s.axes().map(|v| v / self.input_scale))
            .collect();

        let mut gravity = vec![[0.0; 3]; scaled.len()];
        for axis in 0..3 {
            let channel: Vec<f64> = scaled.iter().map(|v| v[axis]).collect();
            for (g, value) in gravity.iter_mut().zip(self.gravity_filter.filtfilt(&channel)) {
                g[axis] = value;
            }
        }

        let linear: Vec<[f64; 3]> = scaled
            .iter()
            .zip(&gravity)
            .map(|(a, g)| [a[0] - g[0], a[1] - g[1], a[2] - g[2]])
            .collect();

        let motion_magnitude: Vec<f64> = linear
            .iter()
            .map(|v| (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt())
            .collect();

        let breathing_signal = self.noise_filter.filtfilt(&motion_magnitude);

        FilteredAccelerometer {
            gravity,
            linear,
            motion_magnitude,
            breathing_signal,
        }
    }

    /// Breathing signal only, aligned 1:1 with `samples`.
    pub fn breathing_signal(&self, samples: &[AccelerometerSample]) -> Vec<f64> {
        self.filter(samples).breathing_signal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn breathing_capture(seconds: f64, breath_period: f64, amplitude: f64) -> Vec<AccelerometerSample> {
        let n = (seconds * 200.0) as usize;
        (0..n)
            .map(|i| {
                let t = i as f64 / 200.0;
                let z = 1000.0 + amplitude * (2.0 * PI * t / breath_period).sin();
                AccelerometerSample::new(t, -180.0, -30.0, z)
            })
            .collect()
    }

    #[test]
    fn test_lengths_preserved() {
        let pipeline = GravityNoiseFilterPipeline::new(&AnalysisConfig::default()).unwrap();
        let samples = breathing_capture(10.0, 4.0, 50.0);
        let filtered = pipeline.filter(&samples);

        assert_eq!(filtered.gravity.len(), samples.len());
        assert_eq!(filtered.linear.len(), samples.len());
        assert_eq!(filtered.motion_magnitude.len(), samples.len());
        assert_eq!(filtered.breathing_signal.len(), samples.len());
    }

    #[test]
    fn test_gravity_tracks_static_offset() {
        let pipeline = GravityNoiseFilterPipeline::new(&AnalysisConfig::default()).unwrap();
        let samples = breathing_capture(30.0, 4.0, 50.0);
        let filtered = pipeline.filter(&samples);

        let mid = samples.len() / 2;
        let g = filtered.gravity[mid];
        assert!((g[0] + 1.8).abs() < 1e-6);
        assert!((g[1] + 0.3).abs() < 1e-6);
        assert!((g[2] - 10.0).abs() < 0.05, "gravity z {}", g[2]);
    }

    #[test]
    fn test_still_sensor_gives_flat_signal() {
        let pipeline = GravityNoiseFilterPipeline::new(&AnalysisConfig::default()).unwrap();
        let samples: Vec<AccelerometerSample> = (0..2000)
            .map(|i| AccelerometerSample::new(i as f64 / 200.0, 10.0, 20.0, 990.0))
            .collect();
        let signal = pipeline.breathing_signal(&samples);
        assert!(signal.iter().all(|v| v.abs() < 1e-6));
    }

    #[test]
    fn test_empty_capture() {
        let pipeline = GravityNoiseFilterPipeline::new(&AnalysisConfig::default()).unwrap();
        assert_eq!(pipeline.filter(&[]), FilteredAccelerometer::default());
    }

    #[test]
    fn test_invalid_cutoff_is_a_construction_error() {
        let config = AnalysisConfig {
            gravity_cutoff_hz: 400.0,
            ..Default::default()
        };
        assert!(matches!(
            GravityNoiseFilterPipeline::new(&config),
            Err(ComputeError::InvalidFilter(_))
        ));
    }
}
