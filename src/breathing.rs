//! Breathing rate extraction
//!
//! Breath landmarks are the low-acceleration points at mid-inhale and
//! mid-exhale, found as maxima of the negated breathing signal. Each accepted
//! peak counts as half a breath cycle, so a pair of consecutive peaks `dt`
//! seconds apart gives `60 / (2 * dt)` breaths per minute.

use crate::config::AnalysisConfig;
use crate::peaks::{local_maxima, sliding_mean};
use crate::types::BreathingRateSample;

/// Breathing rate series derived from one breathing signal
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BreathingRate {
    /// Accepted peak indices into the breathing signal
    pub peaks: Vec<usize>,
    pub rate: Vec<BreathingRateSample>,
    pub smoothed: Vec<BreathingRateSample>,
}

/// Adaptive peak detector over the breathing signal
#[derive(Debug, Clone)]
pub struct BreathingRateExtractor {
    peak_threshold: f64,
    smoothing_half_width: usize,
}

impl Default for BreathingRateExtractor {
    fn default() -> Self {
        Self::new(&AnalysisConfig::default())
    }
}

impl BreathingRateExtractor {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            peak_threshold: config.breath_peak_threshold,
            smoothing_half_width: config.smoothing_half_width,
        }
    }

    /// Extract the breathing rate from `signal` sampled at `times`.
    ///
    /// `signal` and `times` must have the same length; mismatched inputs
    /// yield an empty result.
    pub fn extract(&self, times: &[f64], signal: &[f64]) -> BreathingRate {
        if times.len() != signal.len() {
            return BreathingRate::default();
        }

        let negated: Vec<f64> = signal.iter().map(|v| -v).collect();
        let peaks = self.accepted_peaks(&negated);

        let rate: Vec<BreathingRateSample> = peaks
            .windows(2)
            .map(|pair| {
                let dt = times[pair[1]] - times[pair[0]];
                BreathingRateSample {
                    time: times[pair[1]],
                    rate: 60.0 / (2.0 * dt),
                }
            })
            .collect();

        let values: Vec<f64> = rate.iter().map(|s| s.rate).collect();
        let smoothed = rate
            .iter()
            .zip(sliding_mean(&values, self.smoothing_half_width))
            .map(|(s, mean)| BreathingRateSample {
                time: s.time,
                rate: mean,
            })
            .collect();

        BreathingRate {
            peaks,
            rate,
            smoothed,
        }
    }

    /// Keep candidates that rise at least the threshold above the lowest
    /// point since the previous candidate.
    ///
    /// The trough window starts at the previous raw candidate, whether or
    /// not that candidate was accepted.
    fn accepted_peaks(&self, negated: &[f64]) -> Vec<usize> {
        let candidates = local_maxima(negated);
        let mut accepted = Vec::with_capacity(candidates.len());

        for (i, &peak) in candidates.iter().enumerate() {
            if i == 0 {
                accepted.push(peak);
                continue;
            }
            let start = candidates[i - 1];
            let trough = negated[start..peak]
                .iter()
                .copied()
                .fold(f64::INFINITY, f64::min);
            if negated[peak] - trough >= self.peak_threshold {
                accepted.push(peak);
            }
        }
        accepted
    }
}
