//! Plug-in bandwidth selection.
//!
//! Silverman's rule of thumb for a d-dimensional product Gaussian kernel:
//!
//! ```text
//! hᵢ = σᵢ × (4 / ((d + 2) n))^(1 / (d + 4))
//! ```
//!
//! With d = 1 the factor is (4 / 3n)^(1/5) ≈ 1.06 n^(-1/5), the familiar
//! univariate form. σᵢ is the robust scale `min(sd, IQR / 1.349)`, which
//! keeps heavy tails from oversmoothing the bulk of the distribution.

use crate::error::{Error, Result};

/// IQR of a standard normal, used to put the IQR on the sd scale.
const NORMAL_IQR: f64 = 1.349;

/// Sample mean.
pub fn mean(x: &[f64]) -> f64 {
    x.iter().sum::<f64>() / x.len() as f64
}

/// Unbiased sample standard deviation. Zero for fewer than two values.
pub fn standard_deviation(x: &[f64]) -> f64 {
    if x.len() < 2 {
        return 0.0;
    }
    let m = mean(x);
    let ss: f64 = x.iter().map(|v| (v - m) * (v - m)).sum();
    (ss / (x.len() - 1) as f64).sqrt()
}

/// Linearly interpolated quantile of already sorted data.
fn sorted_quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    let frac = pos - lo as f64;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}

/// Robust spread: `min(sd, IQR / 1.349)`, or sd alone when the IQR is zero.
pub fn robust_scale(x: &[f64]) -> f64 {
    let sd = standard_deviation(x);
    if x.len() < 2 {
        return sd;
    }
    let mut sorted = x.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let iqr = (sorted_quantile(&sorted, 0.75) - sorted_quantile(&sorted, 0.25)) / NORMAL_IQR;
    if iqr > 0.0 {
        sd.min(iqr)
    } else {
        sd
    }
}

/// Silverman's sample-size and dimensionality factor.
pub fn silverman_factor(n: usize, dims: usize) -> f64 {
    let d = dims as f64;
    (4.0 / ((d + 2.0) * n as f64)).powf(1.0 / (d + 4.0))
}

/// Per-axis Silverman bandwidth, scaled by `multiplier`.
///
/// Returns [`Error::DegenerateInput`] for fewer than three observations or
/// zero spread, where the rule would produce a zero bandwidth.
pub fn silverman_bandwidth(x: &[f64], dims: usize, multiplier: f64) -> Result<f64> {
    if x.len() < 3 {
        return Err(Error::DegenerateInput("fewer than 3 observations"));
    }
    let h = robust_scale(x) * silverman_factor(x.len(), dims) * multiplier;
    if !(h.is_finite() && h > 0.0) {
        return Err(Error::DegenerateInput("zero bandwidth"));
    }
    Ok(h)
}
