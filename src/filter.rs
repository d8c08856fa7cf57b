//! Zero-phase low-pass filtering
//!
//! Second-order Butterworth low-pass sections designed and applied with
//! `sci_rs`, run forward then backward over a fully buffered signal so the
//! output is not shifted in time relative to the input.
//!
//! This is a batch operation: the whole signal must be materialised before
//! any output sample exists.

use sci_rs::signal::filter::design::{
    butter_dyn, DigitalFilter, FilterBandType, FilterOutputType, Sos, SosFormatFilter,
};
use sci_rs::signal::filter::sosfiltfilt_dyn;

use crate::error::ComputeError;

/// Butterworth filter order used throughout the pipeline
pub const FILTER_ORDER: usize = 2;

/// Edge padding used by the forward-backward pass for a single section.
/// Signals of this length or shorter cannot be padded.
pub const PAD_LEN: usize = 3 * (FILTER_ORDER + 1);

/// Second-order Butterworth low-pass filter held as one second-order
/// section. Coefficients are normalised so that `a[0] == 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZeroPhaseLowPass {
    b: [f64; 3],
    a: [f64; 3],
}

impl ZeroPhaseLowPass {
    /// Design a low-pass filter with cutoff `cutoff_hz` for a signal sampled
    /// at `sample_rate_hz`.
    ///
    /// The cutoff must lie strictly between zero and the Nyquist frequency.
    pub fn butterworth(cutoff_hz: f64, sample_rate_hz: f64) -> Result<Self, ComputeError> {
        if !sample_rate_hz.is_finite() || sample_rate_hz <= 0.0 {
            return Err(ComputeError::InvalidFilter(format!(
                "sample rate must be positive, got {}",
                sample_rate_hz
            )));
        }
        let nyquist = 0.5 * sample_rate_hz;
        if !cutoff_hz.is_finite() || cutoff_hz <= 0.0 || cutoff_hz >= nyquist {
            return Err(ComputeError::InvalidFilter(format!(
                "cutoff {} Hz outside (0, {}) Hz",
                cutoff_hz, nyquist
            )));
        }

        let filter = butter_dyn(
            FILTER_ORDER,
            vec![cutoff_hz],
            Some(FilterBandType::Lowpass),
            Some(false),
            Some(FilterOutputType::Sos),
            Some(sample_rate_hz),
        );
        let DigitalFilter::Sos(SosFormatFilter { sos, .. }) = filter else {
            return Err(ComputeError::InvalidFilter(
                "Butterworth design did not return second-order sections".to_string(),
            ));
        };
        match sos.as_slice() {
            [section] => Ok(Self {
                b: section.b,
                a: section.a,
            }),
            _ => Err(ComputeError::InvalidFilter(format!(
                "expected one second-order section, got {}",
                sos.len()
            ))),
        }
    }

    /// Numerator coefficients
    pub fn b(&self) -> [f64; 3] {
        self.b
    }

    /// Denominator coefficients
    pub fn a(&self) -> [f64; 3] {
        self.a
    }

    /// Apply the filter forward and backward.
    ///
    /// The signal is padded by odd reflection and each pass starts from the
    /// steady state for its first sample. Output length equals input length.
    /// A signal of at most [`PAD_LEN`] samples cannot be padded and is
    /// replaced by its mean, the only component a low-pass this narrow can
    /// resolve over so few samples.
    pub fn filtfilt(&self, signal: &[f64]) -> Vec<f64> {
        let n = signal.len();
        if n == 0 {
            return Vec::new();
        }
        if n <= PAD_LEN {
            let mean = signal.iter().sum::<f64>() / n as f64;
            return vec![mean; n];
        }

        sosfiltfilt_dyn(signal.iter(), &[Sos::new(self.b, self.a)])
    }
}
