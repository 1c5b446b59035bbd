//! Rank every feature of a matrix against one target vector.
//!
//! Each row is scored with the information coefficient against the target
//! (typically a phenotype or a selected cluster indicator). Significance
//! comes from a pooled permutation null: the target is shuffled
//! `n_permutations` times, every row is rescored against each shuffle, and
//! all permuted scores form one null distribution:
//!
//! ```text
//! p = (1 + #{null : |null| ≥ |score|}) / (1 + |null|)
//! ```
//!
//! False discovery rates are Benjamini–Hochberg adjusted p-values.
//!
//! Rows with zero variance score 0 and are logged, not rejected.

use crate::error::{Error, Result};
use crate::information::{compute_information_coefficient, InformationConfig};
use ndarray::ArrayView2;
use rand::prelude::*;
use tracing::{debug, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Settings for [`score_rows_against_target`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoringConfig {
    /// Association measure settings.
    pub information: InformationConfig,
    /// Number of target shuffles; 0 skips significance estimation.
    pub n_permutations: usize,
    /// Seed for the shuffles.
    pub seed: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            information: InformationConfig::default(),
            n_permutations: 10,
            seed: 20121020,
        }
    }
}

impl ScoringConfig {
    /// Set the number of permutations.
    pub fn with_permutations(mut self, n: usize) -> Self {
        self.n_permutations = n;
        self
    }

    /// Set the permutation seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Score of one feature row against the target.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RowScore {
    /// Row index in the input matrix.
    pub row: usize,
    /// Information coefficient.
    pub score: f64,
    /// Empirical p-value (None without permutations).
    pub p_value: Option<f64>,
    /// Benjamini–Hochberg FDR (None without permutations).
    pub fdr: Option<f64>,
}

fn score_all(target: &[f64], rows: &[Vec<f64>], config: &InformationConfig) -> Result<Vec<f64>> {
    let score = |row: &Vec<f64>| compute_information_coefficient(target, row, config);

    #[cfg(feature = "parallel")]
    {
        rows.par_iter().map(score).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        rows.iter().map(score).collect()
    }
}

/// Score each row of `matrix` against `target`, in row order.
pub fn score_rows_against_target(
    target: &[f64],
    matrix: ArrayView2<'_, f64>,
    config: &ScoringConfig,
) -> Result<Vec<RowScore>> {
    if matrix.nrows() == 0 {
        return Err(Error::EmptyInput);
    }
    if matrix.ncols() != target.len() {
        return Err(Error::DimensionMismatch {
            expected: target.len(),
            found: matrix.ncols(),
        });
    }

    let rows: Vec<Vec<f64>> = matrix.outer_iter().map(|r| r.to_vec()).collect();
    let scores = score_all(target, &rows, &config.information)?;

    let n_flat = scores.iter().filter(|s| **s == 0.0).count();
    if n_flat > 0 {
        warn!(n_flat, n_rows = rows.len(), "rows scored exactly 0 (degenerate or independent)");
    }

    if config.n_permutations == 0 {
        return Ok(scores
            .into_iter()
            .enumerate()
            .map(|(row, score)| RowScore {
                row,
                score,
                p_value: None,
                fdr: None,
            })
            .collect());
    }

    let mut null = Vec::with_capacity(config.n_permutations * rows.len());
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut shuffled = target.to_vec();
    for _ in 0..config.n_permutations {
        shuffled.shuffle(&mut rng);
        null.extend(score_all(&shuffled, &rows, &config.information)?);
    }
    let mut null_abs: Vec<f64> = null.iter().map(|s| s.abs()).collect();
    null_abs.sort_by(|a, b| a.total_cmp(b));

    let p_values: Vec<f64> = scores
        .iter()
        .map(|s| {
            let below = null_abs.partition_point(|v| *v < s.abs());
            let at_least = null_abs.len() - below;
            (1 + at_least) as f64 / (1 + null_abs.len()) as f64
        })
        .collect();
    let fdrs = benjamini_hochberg(&p_values);

    debug!(
        n_rows = rows.len(),
        n_null = null_abs.len(),
        "scored rows against target"
    );

    Ok(scores
        .into_iter()
        .zip(p_values.into_iter().zip(fdrs))
        .enumerate()
        .map(|(row, (score, (p, q)))| RowScore {
            row,
            score,
            p_value: Some(p),
            fdr: Some(q),
        })
        .collect())
}

/// Benjamini–Hochberg adjusted p-values, in input order.
pub fn benjamini_hochberg(p_values: &[f64]) -> Vec<f64> {
    let m = p_values.len();
    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&a, &b| p_values[a].total_cmp(&p_values[b]));

    let mut adjusted = vec![0.0; m];
    let mut running_min = 1.0f64;
    for (rank, &idx) in order.iter().enumerate().rev() {
        let q = p_values[idx] * m as f64 / (rank + 1) as f64;
        running_min = running_min.min(q);
        adjusted[idx] = running_min.min(1.0);
    }
    adjusted
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_benjamini_hochberg_known_values() {
        let p = [0.01, 0.04, 0.03, 0.20];
        let q = benjamini_hochberg(&p);
        // sorted: 0.01 (×4/1), 0.03 (×4/2), 0.04 (×4/3), 0.20 (×4/4)
        assert!((q[0] - 0.04).abs() < 1e-12);
        assert!((q[2] - 0.0533333333).abs() < 1e-9);
        assert!((q[1] - 0.0533333333).abs() < 1e-9);
        assert!((q[3] - 0.20).abs() < 1e-12);
    }

    #[test]
    fn test_informative_row_ranks_first() {
        let n = 60;
        let target: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let mut flat = Vec::new();
        // Row 0: tracks the target. Row 1: scrambled. Row 2: constant.
        flat.extend(target.iter().map(|v| 2.0 * v + 1.0));
        flat.extend((0..n).map(|i| ((i * 37) % n) as f64));
        flat.extend(std::iter::repeat(3.0).take(n));
        let m = Array2::from_shape_vec((3, n), flat).unwrap();

        let cfg = ScoringConfig::default().with_permutations(20);
        let scores = score_rows_against_target(&target, m.view(), &cfg).unwrap();
        assert_eq!(scores.len(), 3);
        assert!(scores[0].score > 0.9);
        assert!(scores[0].score.abs() > scores[1].score.abs());
        assert_eq!(scores[2].score, 0.0);
        assert!(scores[0].p_value.unwrap() < scores[1].p_value.unwrap());
        assert!(scores.iter().all(|s| s.fdr.unwrap() <= 1.0));
    }

    #[test]
    fn test_without_permutations() {
        let target = [1.0, 2.0, 3.0, 4.0];
        let m = Array2::from_shape_vec((1, 4), vec![4.0, 3.0, 2.0, 1.0]).unwrap();
        let cfg = ScoringConfig::default().with_permutations(0);
        let scores = score_rows_against_target(&target, m.view(), &cfg).unwrap();
        assert!(scores[0].score < 0.0);
        assert_eq!(scores[0].p_value, None);
    }

    #[test]
    fn test_shape_mismatch() {
        let m = Array2::<f64>::zeros((2, 3));
        assert!(matches!(
            score_rows_against_target(&[1.0, 2.0], m.view(), &ScoringConfig::default()),
            Err(Error::DimensionMismatch { .. })
        ));
    }
}
