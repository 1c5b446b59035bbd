//! Information coefficient: a signed, bounded, non-linear association score.
//!
//! Mutual information I(X; Y) detects any dependence, monotonic or not, but
//! it is unbounded and unsigned. The information coefficient maps it onto
//! [-1, 1]:
//!
//! ```text
//! IC = sign(ρ) × √(1 − exp(−2 I(X; Y)))
//! ```
//!
//! For a bivariate Gaussian, I = −½ ln(1 − ρ²), so |IC| recovers |ρ| exactly;
//! for non-linear relationships |IC| exceeds |ρ|. The sign is borrowed from
//! the Pearson correlation ρ (positive when ρ is exactly 0).
//!
//! # Estimation
//!
//! The joint density is estimated on a grid by [`crate::density`]. The
//! bandwidth is the bivariate Silverman bandwidth shrunk by
//! `1 − correlation_shrink × |ρ|`: strongly correlated pairs concentrate
//! near a line, and a full-width kernel would smear that structure away.
//! I(X; Y) is then the discrete mutual information of the grid-cell
//! probabilities.
//!
//! # Degenerate inputs
//!
//! Fewer than three observations, zero variance, or non-finite values score
//! 0.0 rather than failing; batch callers score thousands of pairs and must
//! not abort on one constant feature. Only a length mismatch is an error.

use crate::density::{self, bandwidth, KdeConfig};
use crate::error::{Error, Result};
use ndarray::{Array2, ArrayView2};
use std::cmp::Ordering;
use tracing::trace;

/// Settings for [`compute_information_coefficient`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InformationConfig {
    /// Density estimation settings.
    pub kde: KdeConfig,
    /// Bandwidth shrink per unit of |Pearson ρ|, in [0, 1).
    pub correlation_shrink: f64,
}

impl Default for InformationConfig {
    fn default() -> Self {
        Self {
            kde: KdeConfig::default(),
            correlation_shrink: 0.75,
        }
    }
}

impl InformationConfig {
    /// Set the density estimation settings.
    pub fn with_kde(mut self, kde: KdeConfig) -> Self {
        self.kde = kde;
        self
    }

    /// Set the correlation-dependent bandwidth shrink.
    pub fn with_correlation_shrink(mut self, shrink: f64) -> Self {
        self.correlation_shrink = shrink;
        self
    }
}

/// Pearson correlation. `None` when either input has zero variance.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> Result<Option<f64>> {
    if x.len() != y.len() {
        return Err(Error::DimensionMismatch {
            expected: x.len(),
            found: y.len(),
        });
    }
    if x.len() < 2 {
        return Ok(None);
    }
    let mx = bandwidth::mean(x);
    let my = bandwidth::mean(y);
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let (dx, dy) = (a - mx, b - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return Ok(None);
    }
    Ok(Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)))
}

/// Mutual information (nats) of a discrete joint distribution.
///
/// `joint` must be non-negative and sum to 1.
pub fn discrete_mutual_information(joint: ArrayView2<'_, f64>) -> f64 {
    let px = joint.sum_axis(ndarray::Axis(1));
    let py = joint.sum_axis(ndarray::Axis(0));
    let mut mi = 0.0;
    for ((i, j), &p) in joint.indexed_iter() {
        if p > 0.0 {
            mi += p * (p / (px[i] * py[j])).ln();
        }
    }
    mi.max(0.0)
}

/// Information coefficient between `x` and `y`, in [-1, 1].
///
/// Fails only when the lengths differ; every other degenerate case is 0.0.
pub fn compute_information_coefficient(
    x: &[f64],
    y: &[f64],
    config: &InformationConfig,
) -> Result<f64> {
    if x.len() != y.len() {
        return Err(Error::DimensionMismatch {
            expected: x.len(),
            found: y.len(),
        });
    }
    let (x, y) = canonical_pair(x, y);
    match information_coefficient_inner(x, y, config) {
        Ok(ic) => Ok(ic),
        Err(Error::DegenerateInput(why)) => {
            trace!(reason = why, n = x.len(), "degenerate pair scored 0");
            Ok(0.0)
        }
        Err(e) => Err(e),
    }
}

/// Orders the pair lexicographically so both argument orders run the same
/// floating-point operations.
fn canonical_pair<'a>(x: &'a [f64], y: &'a [f64]) -> (&'a [f64], &'a [f64]) {
    let order = x
        .iter()
        .zip(y)
        .map(|(a, b)| a.total_cmp(b))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal);
    if order == Ordering::Greater {
        (y, x)
    } else {
        (x, y)
    }
}

fn information_coefficient_inner(x: &[f64], y: &[f64], config: &InformationConfig) -> Result<f64> {
    if x.len() < 3 {
        return Err(Error::DegenerateInput("fewer than 3 observations"));
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return Err(Error::DegenerateInput("non-finite value"));
    }
    config.kde.validate()?;
    if !(0.0..1.0).contains(&config.correlation_shrink) {
        return Err(Error::InvalidParameter {
            name: "correlation_shrink",
            message: "must be in [0, 1)",
        });
    }
    let rho = pearson_correlation(x, y)?.ok_or(Error::DegenerateInput("zero variance"))?;

    let shrink = (1.0 - config.correlation_shrink * rho.abs()) * config.kde.bandwidth_multiplier;
    let hx = bandwidth::silverman_bandwidth(x, 2, shrink)?;
    let hy = bandwidth::silverman_bandwidth(y, 2, shrink)?;
    let joint = density::estimate_bivariate_with_bandwidths(x, y, (hx, hy), &config.kde)?;

    let mi = discrete_mutual_information(joint.cell_probabilities().view());
    let magnitude = (1.0 - (-2.0 * mi).exp()).max(0.0).sqrt();
    Ok(if rho < 0.0 { -magnitude } else { magnitude })
}

/// Information distance `(1 − IC) / 2`, in [0, 1].
pub fn information_distance(x: &[f64], y: &[f64], config: &InformationConfig) -> Result<f64> {
    Ok((1.0 - compute_information_coefficient(x, y, config)?) / 2.0)
}

/// Symmetric matrix of pairwise information coefficients between rows.
pub fn information_coefficient_matrix(
    rows: ArrayView2<'_, f64>,
    config: &InformationConfig,
) -> Result<Array2<f64>> {
    let n = rows.nrows();
    let owned: Vec<Vec<f64>> = rows.outer_iter().map(|r| r.to_vec()).collect();
    let pairs: Vec<(usize, usize)> = (0..n).flat_map(|i| (i..n).map(move |j| (i, j))).collect();

    let score = |&(i, j): &(usize, usize)| -> Result<((usize, usize), f64)> {
        Ok(((i, j), compute_information_coefficient(&owned[i], &owned[j], config)?))
    };

    #[cfg(feature = "parallel")]
    let scored: Result<Vec<_>> = {
        use rayon::prelude::*;
        pairs.par_iter().map(score).collect()
    };
    #[cfg(not(feature = "parallel"))]
    let scored: Result<Vec<_>> = pairs.iter().map(score).collect();

    let mut out = Array2::zeros((n, n));
    for ((i, j), ic) in scored? {
        out[[i, j]] = ic;
        out[[j, i]] = ic;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rand_distr::Normal;

    fn normal_sample(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let dist = Normal::new(0.0, 1.0).unwrap();
        (0..n).map(|_| rng.sample(dist)).collect()
    }

    #[test]
    fn test_self_association_is_near_one() {
        let x = normal_sample(100, 1);
        let ic = compute_information_coefficient(&x, &x, &InformationConfig::default()).unwrap();
        assert!(ic > 0.95, "ic = {ic}");
        assert!(ic <= 1.0);
    }

    #[test]
    fn test_negative_linear_is_near_minus_one() {
        let x = normal_sample(100, 2);
        let y: Vec<f64> = x.iter().map(|v| 3.0 - 2.0 * v).collect();
        let ic = compute_information_coefficient(&x, &y, &InformationConfig::default()).unwrap();
        assert!(ic < -0.95, "ic = {ic}");
    }

    #[test]
    fn test_independent_noise_is_near_zero() {
        let x = normal_sample(1000, 3);
        let y = normal_sample(1000, 4);
        let ic = compute_information_coefficient(&x, &y, &InformationConfig::default()).unwrap();
        assert!(ic.abs() < 0.25, "ic = {ic}");
    }

    #[test]
    fn test_self_association_survives_heavy_tail() {
        let x: Vec<f64> = (0..21).map(|i| (i as f64).exp()).collect();
        let ic = compute_information_coefficient(&x, &x, &InformationConfig::default()).unwrap();
        assert!(ic > 0.9, "ic = {ic}");
    }

    #[test]
    fn test_argument_order_is_exact() {
        let x = normal_sample(80, 8);
        let y: Vec<f64> = x.iter().map(|v| v.exp() + 0.1 * v.sin()).collect();
        let cfg = InformationConfig::default();
        assert_eq!(
            compute_information_coefficient(&x, &y, &cfg).unwrap(),
            compute_information_coefficient(&y, &x, &cfg).unwrap()
        );
    }

    #[test]
    fn test_short_monotone_decreasing_pair() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [25.0, 16.0, 9.0, 4.0, 1.0];
        let ic = compute_information_coefficient(&x, &y, &InformationConfig::default()).unwrap();
        assert!(ic.abs() > 0.3, "ic = {ic}");
        assert!(ic < 0.0);
    }

    #[test]
    fn test_parabola_beats_pearson() {
        let x: Vec<f64> = (0..=100).map(|i| -1.0 + 0.02 * i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| v * v).collect();
        let rho = pearson_correlation(&x, &y).unwrap().unwrap();
        assert!(rho.abs() < 1e-9);
        let ic = compute_information_coefficient(&x, &y, &InformationConfig::default()).unwrap();
        assert!(ic.abs() > 0.3, "ic = {ic}");
    }

    #[test]
    fn test_degenerate_inputs_score_zero() {
        let cfg = InformationConfig::default();
        assert_eq!(
            compute_information_coefficient(&[1.0, 2.0], &[2.0, 1.0], &cfg).unwrap(),
            0.0
        );
        assert_eq!(
            compute_information_coefficient(&[1.0, 2.0, 3.0, 4.0], &[7.0; 4], &cfg).unwrap(),
            0.0
        );
        assert_eq!(
            compute_information_coefficient(&[1.0, f64::NAN, 3.0], &[1.0, 2.0, 3.0], &cfg)
                .unwrap(),
            0.0
        );
    }

    #[test]
    fn test_length_mismatch_is_error() {
        let err = compute_information_coefficient(&[1.0, 2.0, 3.0], &[1.0, 2.0], &Default::default())
            .unwrap_err();
        assert_eq!(
            err,
            Error::DimensionMismatch {
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn test_information_distance_range() {
        let x = normal_sample(60, 5);
        let d = information_distance(&x, &x, &InformationConfig::default()).unwrap();
        assert!((0.0..0.05).contains(&d));
    }

    #[test]
    fn test_matrix_is_symmetric() {
        let a = normal_sample(40, 6);
        let b: Vec<f64> = a.iter().map(|v| v.exp()).collect();
        let c = normal_sample(40, 7);
        let rows = Array2::from_shape_vec((3, 40), [a, b, c].concat()).unwrap();
        let m = information_coefficient_matrix(rows.view(), &InformationConfig::default()).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(m[[i, j]], m[[j, i]]);
            }
        }
        assert!(m[[0, 1]] > 0.8);
    }

    proptest! {
        #[test]
        fn ic_is_bounded_and_symmetric(
            pairs in proptest::collection::vec((-100.0f64..100.0, -100.0f64..100.0), 3..60),
        ) {
            let (x, y): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
            let cfg = InformationConfig::default();
            let xy = compute_information_coefficient(&x, &y, &cfg).unwrap();
            let yx = compute_information_coefficient(&y, &x, &cfg).unwrap();
            prop_assert!((-1.0..=1.0).contains(&xy));
            prop_assert_eq!(xy, yx);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn self_association_holds_for_skewed_data(
            z in proptest::collection::vec(-3.0f64..3.0, 20..120),
            sigma in 0.25f64..2.0,
        ) {
            let x: Vec<f64> = z.iter().map(|v| (sigma * v).exp()).collect();
            let ic = compute_information_coefficient(&x, &x, &InformationConfig::default()).unwrap();
            prop_assert!(ic > 0.9, "ic = {}", ic);
        }
    }
}
