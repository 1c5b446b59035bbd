//! Evaluation grids and linear binning.

use crate::error::{Error, Result};

/// Evenly spaced evaluation points along one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AxisGrid {
    start: f64,
    step: f64,
    len: usize,
}

impl AxisGrid {
    /// Grid over the observed range of `x`, widened by `extension × range`
    /// on both sides so kernel mass near the extremes is not truncated.
    pub fn spanning(x: &[f64], extension: f64, len: usize) -> Result<Self> {
        if len < 2 {
            return Err(Error::InvalidParameter {
                name: "grid_size",
                message: "must be at least 2",
            });
        }
        let (start, span) = extent(x, extension)?;
        Ok(Self {
            start,
            step: span / (len - 1) as f64,
            len,
        })
    }

    /// Grid over the range of `x` with at least `min_len` points, refined up
    /// to `max_len` points so the step does not exceed `bandwidth`.
    ///
    /// A heavy tail stretches the range far beyond the bulk of the data; at
    /// the base resolution the bulk would then share one or two cells.
    pub fn resolving(
        x: &[f64],
        extension: f64,
        bandwidth: f64,
        min_len: usize,
        max_len: usize,
    ) -> Result<Self> {
        let coarse = Self::spanning(x, extension, min_len)?;
        let usable = bandwidth.is_finite() && bandwidth > 0.0;
        if max_len <= min_len || !usable || coarse.step <= bandwidth {
            return Ok(coarse);
        }
        let (_, span) = extent(x, extension)?;
        let wanted = (span / bandwidth).ceil() as usize + 1;
        Self::spanning(x, extension, wanted.clamp(min_len, max_len))
    }

    /// Number of grid points.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false; grids have at least two points.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Spacing between neighbouring points.
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Coordinate of point `i`.
    pub fn point(&self, i: usize) -> f64 {
        self.start + self.step * i as f64
    }

    /// All coordinates.
    pub fn points(&self) -> Vec<f64> {
        (0..self.len).map(|i| self.point(i)).collect()
    }

    /// Left neighbour index and the fractional weight of the right neighbour.
    pub(crate) fn locate(&self, v: f64) -> (usize, f64) {
        let p = (v - self.start) / self.step;
        let i = (p.floor().max(0.0) as usize).min(self.len - 2);
        let frac = (p - i as f64).clamp(0.0, 1.0);
        (i, frac)
    }

    /// Linear binning: each value splits unit mass between its two
    /// neighbouring grid points.
    pub fn bin(&self, x: &[f64]) -> Vec<f64> {
        let mut weights = vec![0.0; self.len];
        for &v in x {
            let (i, frac) = self.locate(v);
            weights[i] += 1.0 - frac;
            weights[i + 1] += frac;
        }
        weights
    }
}

/// Grid start and total span: the observed range widened by
/// `extension × range` on both sides.
fn extent(x: &[f64], extension: f64) -> Result<(f64, f64)> {
    let (lo, hi) = x
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = hi - lo;
    if !(range.is_finite() && range > 0.0) {
        return Err(Error::DegenerateInput("zero range"));
    }
    let pad = range * extension;
    Ok((lo - pad, range + 2.0 * pad))
}

/// Convolve binned weights with a Gaussian of bandwidth `h`, truncated at ±4h.
///
/// `step` is the grid spacing. Output has the same length as `weights`.
pub(crate) fn gaussian_smooth(weights: &[f64], h: f64, step: f64) -> Vec<f64> {
    let g = weights.len();
    let reach = ((4.0 * h / step).ceil() as usize).min(g.saturating_sub(1));
    let norm = 1.0 / (h * (2.0 * std::f64::consts::PI).sqrt());
    let kernel: Vec<f64> = (0..=reach)
        .map(|j| {
            let z = j as f64 * step / h;
            norm * (-0.5 * z * z).exp()
        })
        .collect();

    let mut out = vec![0.0; g];
    for (i, slot) in out.iter_mut().enumerate() {
        let lo = i.saturating_sub(reach);
        let hi = (i + reach).min(g - 1);
        *slot = (lo..=hi).map(|j| weights[j] * kernel[i.abs_diff(j)]).sum();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_extends_range() {
        let grid = AxisGrid::spanning(&[0.0, 10.0], 0.1, 13).unwrap();
        assert!((grid.point(0) + 1.0).abs() < 1e-12);
        assert!((grid.point(12) - 11.0).abs() < 1e-12);
        assert!((grid.step() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_binning_conserves_mass() {
        let x = [0.0, 0.25, 3.7, 9.99, 10.0];
        let grid = AxisGrid::spanning(&x, 0.0, 8).unwrap();
        let w = grid.bin(&x);
        assert!((w.iter().sum::<f64>() - 5.0).abs() < 1e-12);
        assert!(w.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_resolving_refines_until_step_fits_bandwidth() {
        let x = [0.0, 1.0, 2.0, 1000.0];
        let grid = AxisGrid::resolving(&x, 0.0, 10.0, 16, 512).unwrap();
        assert_eq!(grid.len(), 101);
        assert!(grid.step() <= 10.0);

        let capped = AxisGrid::resolving(&x, 0.0, 0.5, 16, 512).unwrap();
        assert_eq!(capped.len(), 512);

        let coarse = AxisGrid::resolving(&x, 0.0, 500.0, 16, 512).unwrap();
        assert_eq!(coarse.len(), 16);
    }

    #[test]
    fn test_zero_range_is_degenerate() {
        assert_eq!(
            AxisGrid::spanning(&[3.0, 3.0, 3.0], 0.1, 16),
            Err(Error::DegenerateInput("zero range"))
        );
    }

    #[test]
    fn test_smoothing_is_symmetric() {
        let mut w = vec![0.0; 21];
        w[10] = 1.0;
        let s = gaussian_smooth(&w, 2.0, 1.0);
        for d in 1..=10 {
            assert!((s[10 - d] - s[10 + d]).abs() < 1e-15);
        }
        assert!(s[10] > s[11]);
    }
}
