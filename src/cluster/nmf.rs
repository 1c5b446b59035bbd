//! Non-negative matrix factorization by multiplicative updates.
//!
//! Approximates a non-negative features × samples matrix V by the product
//! of two non-negative factors:
//!
//! ```text
//! V (m × n) ≈ W (m × k) · H (k × n)
//! ```
//!
//! W holds k metagenes (basis columns); H holds each sample's weight on each
//! metagene. A sample's hard cluster is the row of H with the largest weight
//! in its column.
//!
//! # Lee–Seung Updates
//!
//! Minimizing ‖V − WH‖²_F under non-negativity, the multiplicative updates
//!
//! ```text
//! H ← H ⊙ (WᵀV) ⊘ (WᵀWH)
//! W ← W ⊙ (VHᵀ) ⊘ (WHHᵀ)
//! ```
//!
//! never increase the objective and keep every entry non-negative without a
//! projection step.
//!
//! # Failure Modes
//!
//! - **Zero lock**: an entry that reaches exactly 0 stays 0 forever under
//!   multiplicative updates. Entries are clamped to `epsilon` after every
//!   update, and `epsilon` is added to each denominator.
//! - **Slow convergence**: the iteration cap is hard. Hitting it is not an
//!   error; the factors at the cap are returned with `converged = false`.
//! - **Local optima**: different random initializations reach different
//!   factorizations. Consensus clustering relies on that diversity.

use super::traits::{SampleClustering, TrialPartition};
use crate::error::{Error, Result};
use ndarray::{Array2, ArrayView2, Zip};
use rand::prelude::*;
use tracing::trace;

/// Iteration and numerical settings for the factorizer.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NmfConfig {
    /// Hard cap on update iterations.
    pub max_iter: usize,
    /// Stop once the relative error improvement between checks falls below this.
    pub tol: f64,
    /// Iterations between reconstruction-error checks.
    pub check_interval: usize,
    /// Floor for factor entries and update denominators.
    pub epsilon: f64,
}

impl Default for NmfConfig {
    fn default() -> Self {
        Self {
            max_iter: 500,
            tol: 1e-6,
            check_interval: 10,
            epsilon: 1e-16,
        }
    }
}

impl NmfConfig {
    /// Set the iteration cap.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the convergence tolerance.
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set the epsilon floor.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.max_iter == 0 {
            return Err(Error::InvalidParameter {
                name: "max_iter",
                message: "must be at least 1",
            });
        }
        if self.check_interval == 0 {
            return Err(Error::InvalidParameter {
                name: "check_interval",
                message: "must be at least 1",
            });
        }
        if !(self.tol.is_finite() && self.tol >= 0.0) {
            return Err(Error::InvalidParameter {
                name: "tol",
                message: "must be non-negative and finite",
            });
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(Error::InvalidParameter {
                name: "epsilon",
                message: "must be positive and finite",
            });
        }
        Ok(())
    }
}

/// Output of one factorization.
#[derive(Debug, Clone)]
pub struct Factorization {
    /// Basis factor, features × k.
    pub w: Array2<f64>,
    /// Coefficient factor, k × samples.
    pub h: Array2<f64>,
    /// Update iterations performed.
    pub iterations: usize,
    /// Whether the tolerance was reached before the cap.
    pub converged: bool,
    /// Frobenius norm ‖V − WH‖ of the returned factors.
    pub reconstruction_error: f64,
}

impl Factorization {
    /// Hard label per sample: the row of H with maximal weight.
    ///
    /// Ties go to the lowest row index.
    pub fn labels(&self) -> Vec<usize> {
        self.h
            .columns()
            .into_iter()
            .map(|col| {
                let mut best = 0;
                for (r, &v) in col.iter().enumerate() {
                    if v > col[best] {
                        best = r;
                    }
                }
                best
            })
            .collect()
    }
}

/// Randomly initialized multiplicative-update NMF.
#[derive(Debug, Clone)]
pub struct Nmf {
    /// Target rank.
    k: usize,
    /// Iteration settings.
    config: NmfConfig,
    /// Random seed.
    seed: Option<u64>,
}

impl Nmf {
    /// Create a factorizer of rank `k` with default settings.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            config: NmfConfig::default(),
            seed: None,
        }
    }

    /// Replace the iteration settings.
    pub fn with_config(mut self, config: NmfConfig) -> Self {
        self.config = config;
        self
    }

    /// Set random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Target rank.
    pub fn rank(&self) -> usize {
        self.k
    }

    /// Uniform non-negative draws scaled so that WH starts near the data's mean.
    fn init_factors(&self, v: &ArrayView2<'_, f64>, rng: &mut impl Rng) -> (Array2<f64>, Array2<f64>) {
        let (m, n) = v.dim();
        let mean = v.mean().unwrap_or(0.0);
        let scale = if mean > 0.0 {
            2.0 * (mean / self.k as f64).sqrt()
        } else {
            1.0
        };
        let eps = self.config.epsilon;
        let w = Array2::from_shape_simple_fn((m, self.k), || (rng.random::<f64>() * scale).max(eps));
        let h = Array2::from_shape_simple_fn((self.k, n), || (rng.random::<f64>() * scale).max(eps));
        (w, h)
    }

    fn reconstruction_error(v: &ArrayView2<'_, f64>, w: &Array2<f64>, h: &Array2<f64>) -> f64 {
        let wh = w.dot(h);
        Zip::from(v)
            .and(&wh)
            .fold(0.0, |acc, &a, &b| acc + (a - b) * (a - b))
            .sqrt()
    }

    /// Factorize `v` (features × samples).
    pub fn factorize(&self, v: ArrayView2<'_, f64>) -> Result<Factorization> {
        self.config.validate()?;
        let (m, n) = v.dim();
        if m == 0 || n == 0 {
            return Err(Error::EmptyInput);
        }
        if self.k < 2 || self.k > n {
            return Err(Error::InvalidClusterCount {
                requested: self.k,
                n_items: n,
            });
        }
        if v.iter().any(|x| !(x.is_finite() && *x >= 0.0)) {
            return Err(Error::invalid_matrix("entries must be finite and non-negative"));
        }

        let mut rng: Box<dyn RngCore> = match self.seed {
            Some(s) => Box::new(StdRng::seed_from_u64(s)),
            None => Box::new(rand::rng()),
        };
        let (mut w, mut h) = self.init_factors(&v, &mut rng);

        let eps = self.config.epsilon;
        let mut previous: Option<f64> = None;
        let mut converged = false;
        let mut iterations = 0;

        while iterations < self.config.max_iter {
            iterations += 1;

            let numer = w.t().dot(&v);
            let denom = w.t().dot(&w).dot(&h);
            Zip::from(&mut h)
                .and(&numer)
                .and(&denom)
                .for_each(|x, &a, &b| *x = (*x * a / (b + eps)).max(eps));

            let numer = v.dot(&h.t());
            let denom = w.dot(&h.dot(&h.t()));
            Zip::from(&mut w)
                .and(&numer)
                .and(&denom)
                .for_each(|x, &a, &b| *x = (*x * a / (b + eps)).max(eps));

            if iterations % self.config.check_interval == 0 {
                let err = Self::reconstruction_error(&v, &w, &h);
                if let Some(prev) = previous {
                    if prev <= 0.0 || (prev - err) / prev < self.config.tol {
                        converged = true;
                        break;
                    }
                }
                previous = Some(err);
            }
        }

        let reconstruction_error = Self::reconstruction_error(&v, &w, &h);
        trace!(
            k = self.k,
            iterations,
            converged,
            reconstruction_error,
            "nmf finished"
        );

        Ok(Factorization {
            w,
            h,
            iterations,
            converged,
            reconstruction_error,
        })
    }
}

/// NMF as a per-trial sample clusterer.
#[derive(Debug, Clone, Default)]
pub struct NmfClusterer {
    /// Factorizer settings shared by all trials.
    pub config: NmfConfig,
}

impl SampleClustering for NmfClusterer {
    fn cluster_samples(&self, data: ArrayView2<'_, f64>, k: usize, seed: u64) -> Result<TrialPartition> {
        let fit = Nmf::new(k)
            .with_config(self.config)
            .with_seed(seed)
            .factorize(data)?;
        Ok(TrialPartition {
            labels: fit.labels(),
            converged: fit.converged,
        })
    }
}
