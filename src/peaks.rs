//! Series primitives shared by the breathing and HRV extractors
//!
//! - Local maximum detection with flat-plateau handling
//! - Linear interpolation clamped to the boundary values
//! - Sliding mean over a window truncated at the series ends

/// Indices of the local maxima of `signal`.
///
/// A sample is a maximum when its left neighbour is strictly smaller and the
/// first differing sample to its right is strictly smaller. A flat plateau
/// yields one index, its middle (lower middle for even widths). The first
/// and last samples are never maxima.
pub fn local_maxima(signal: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if signal.len() < 3 {
        return peaks;
    }

    let last = signal.len() - 1;
    let mut i = 1;
    while i < last {
        if signal[i - 1] < signal[i] {
            let mut ahead = i + 1;
            while ahead < last && signal[ahead] == signal[i] {
                ahead += 1;
            }
            if signal[ahead] < signal[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    peaks
}

/// Indices of the local minima of `signal`, same plateau rule as
/// [`local_maxima`].
pub fn local_minima(signal: &[f64]) -> Vec<usize> {
    let negated: Vec<f64> = signal.iter().map(|v| -v).collect();
    local_maxima(&negated)
}

/// Piecewise-linear interpolation of `(xs, ys)` at `x`.
///
/// `xs` must be non-decreasing. Queries left of `xs[0]` return `ys[0]`,
/// queries right of the last point return the last value. Returns `None`
/// when there are no points.
pub fn interp_clamped(x: f64, xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n == 0 {
        return None;
    }
    if x < xs[0] {
        return Some(ys[0]);
    }
    if x >= xs[n - 1] {
        return Some(ys[n - 1]);
    }

    // First point strictly right of x; repeated abscissae resolve to the last
    let j = xs[..n].partition_point(|&p| p <= x).max(1);
    let (x0, x1) = (xs[j - 1], xs[j]);
    let (y0, y1) = (ys[j - 1], ys[j]);
    Some(y0 + (x - x0) * (y1 - y0) / (x1 - x0))
}

/// Sliding mean with half-width `half_width`.
///
/// Interior samples average `values[i - w ..= i + w]`. The first `w`
/// samples average `values[.. i + w]` and samples past `len - w` average
/// `values[i - w ..]`; no padding is applied.
pub fn sliding_mean(values: &[f64], half_width: usize) -> Vec<f64> {
    let len = values.len();
    let w = half_width;

    (0..len)
        .map(|i| {
            let window = if i < w {
                &values[..(i + w).min(len)]
            } else if i + w > len {
                &values[i - w..]
            } else {
                &values[i - w..(i + w + 1).min(len)]
            };
            if window.is_empty() {
                values[i]
            } else {
                window.iter().sum::<f64>() / window.len() as f64
            }
        })
        .collect()
}
