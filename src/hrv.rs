//! Heart rate variability extraction
//!
//! HRV here is the swing between successive IBI extrema that survive an
//! adaptive threshold: a swing must exceed a fraction of the largest of the
//! last few accepted swings. The resulting series is resampled onto the
//! breathing-rate timestamps so both can be compared sample by sample.

use std::collections::VecDeque;

use crate::config::AnalysisConfig;
use crate::peaks::{interp_clamped, local_maxima, local_minima};
use crate::types::{HrvSample, IbiSample};

/// HRV series derived from one IBI stream
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hrv {
    /// Accepted extremum indices into the IBI stream
    pub extrema: Vec<usize>,
    pub values: Vec<HrvSample>,
}

impl Hrv {
    /// Resample onto `times` by linear interpolation, clamping outside the
    /// HRV time range. Empty when there is no HRV sample to interpolate.
    pub fn resample(&self, times: &[f64]) -> Vec<HrvSample> {
        let xs: Vec<f64> = self.values.iter().map(|s| s.time).collect();
        let ys: Vec<f64> = self.values.iter().map(|s| s.value).collect();

        times
            .iter()
            .filter_map(|&time| {
                interp_clamped(time, &xs, &ys).map(|value| HrvSample { time, value })
            })
            .collect()
    }
}

/// Adaptive extrema detector over IBI samples
#[derive(Debug, Clone)]
pub struct HrvExtractor {
    buffer_len: usize,
    threshold_ratio: f64,
}

impl Default for HrvExtractor {
    fn default() -> Self {
        Self::new(&AnalysisConfig::default())
    }
}

impl HrvExtractor {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            buffer_len: config.hrv_buffer_len.max(1),
            threshold_ratio: config.hrv_threshold_ratio,
        }
    }

    pub fn extract(&self, ibi: &[IbiSample]) -> Hrv {
        let values: Vec<f64> = ibi.iter().map(|s| s.value).collect();
        let extrema = self.accepted_extrema(&values);

        let hrv = extrema
            .windows(2)
            .map(|pair| HrvSample {
                time: ibi[pair[1]].time,
                value: (values[pair[1]] - values[pair[0]]).abs(),
            })
            .collect();

        Hrv {
            extrema,
            values: hrv,
        }
    }

    /// Candidate extrema are all local maxima and minima in index order.
    /// A swing is measured against the previous raw candidate, accepted or
    /// not, and compared with the largest of the recent accepted swings.
    fn accepted_extrema(&self, values: &[f64]) -> Vec<usize> {
        let mut candidates = local_maxima(values);
        candidates.extend(local_minima(values));
        candidates.sort_unstable();

        let mut swings: VecDeque<f64> = std::iter::repeat(0.0).take(self.buffer_len).collect();
        let mut accepted = Vec::with_capacity(candidates.len());

        for (i, &idx) in candidates.iter().enumerate() {
            if i == 0 {
                accepted.push(idx);
                continue;
            }
            let threshold = self.threshold_ratio * swings.iter().copied().fold(0.0, f64::max);
            let swing = (values[idx] - values[candidates[i - 1]]).abs();
            if swing > threshold {
                accepted.push(idx);
                swings.pop_front();
                swings.push_back(swing);
            }
        }
        accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ibi_series(values: &[f64]) -> Vec<IbiSample> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| IbiSample::new(i as f64, v))
            .collect()
    }

    #[test]
    fn test_constant_ibi_has_no_hrv() {
        let hrv = HrvExtractor::default().extract(&ibi_series(&[800.0; 20]));
        assert!(hrv.extrema.is_empty());
        assert!(hrv.values.is_empty());
        assert!(hrv.resample(&[1.0, 2.0]).is_empty());
    }

    #[test]
    fn test_alternating_ibi() {
        let ibi = ibi_series(&[800.0, 850.0, 780.0, 860.0, 770.0, 800.0]);
        let hrv = HrvExtractor::default().extract(&ibi);

        assert_eq!(hrv.extrema, vec![1, 2, 3, 4]);
        let values: Vec<f64> = hrv.values.iter().map(|s| s.value).collect();
        assert_eq!(values, vec![70.0, 80.0, 90.0]);
        let times: Vec<f64> = hrv.values.iter().map(|s| s.time).collect();
        assert_eq!(times, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_small_swing_rejected_after_large_ones() {
        // Swings: 100, 100, then 10 (< 0.15 * 100), then 100 again
        let ibi = ibi_series(&[800.0, 900.0, 800.0, 900.0, 890.0, 990.0, 900.0]);
        let hrv = HrvExtractor::default().extract(&ibi);

        // Candidates 1..=5; candidate 4 (890) swings 10 against 3 and is dropped.
        // Candidate 5 swings 100 against raw candidate 4, not accepted 3.
        assert_eq!(hrv.extrema, vec![1, 2, 3, 5]);
        let values: Vec<f64> = hrv.values.iter().map(|s| s.value).collect();
        assert_eq!(values, vec![100.0, 100.0, 90.0]);
    }

    #[test]
    fn test_resample_clamps_to_boundaries() {
        let hrv = Hrv {
            extrema: vec![],
            values: vec![
                HrvSample { time: 10.0, value: 40.0 },
                HrvSample { time: 20.0, value: 60.0 },
            ],
        };
        let resampled = hrv.resample(&[5.0, 15.0, 25.0]);
        let values: Vec<f64> = resampled.iter().map(|s| s.value).collect();
        assert_eq!(values, vec![40.0, 50.0, 60.0]);
        assert_eq!(resampled[2].time, 25.0);
    }

    #[test]
    fn test_short_ibi_series() {
        let extractor = HrvExtractor::default();
        assert_eq!(extractor.extract(&[]), Hrv::default());
        assert_eq!(extractor.extract(&ibi_series(&[800.0, 900.0])), Hrv::default());
    }
}
