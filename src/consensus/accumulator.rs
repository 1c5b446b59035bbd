//! Co-clustering counts across trials.
//!
//! For a fixed k, every trial contributes, for each pair of samples it
//! contains, one co-occurrence and (if both got the same label) one
//! co-clustering. Counts are integers, so partial accumulators from
//! different workers merge exactly and in any order.

use crate::error::{Error, Result};
use crate::hierarchy::condensed_index;
use ndarray::Array2;

/// Mutable per-k counts. Pairs are stored as a condensed upper triangle.
#[derive(Debug, Clone)]
pub struct ConsensusAccumulator {
    n_samples: usize,
    k: usize,
    together: Vec<u32>,
    co_occurrence: Vec<u32>,
    trials: usize,
    non_converged: usize,
}

impl ConsensusAccumulator {
    /// Empty accumulator for `n_samples` samples at rank `k`.
    pub fn new(n_samples: usize, k: usize) -> Self {
        let pairs = n_samples * n_samples.saturating_sub(1) / 2;
        Self {
            n_samples,
            k,
            together: vec![0; pairs],
            co_occurrence: vec![0; pairs],
            trials: 0,
            non_converged: 0,
        }
    }

    /// Trials recorded so far.
    pub fn trials(&self) -> usize {
        self.trials
    }

    /// Record one trial: `indices[i]` is the original sample behind label
    /// `labels[i]`. A sample drawn more than once keeps its first label.
    pub fn record(&mut self, indices: &[usize], labels: &[usize], converged: bool) -> Result<()> {
        if indices.len() != labels.len() {
            return Err(Error::DimensionMismatch {
                expected: indices.len(),
                found: labels.len(),
            });
        }
        let mut label_of: Vec<Option<usize>> = vec![None; self.n_samples];
        for (&sample, &label) in indices.iter().zip(labels) {
            let slot = label_of.get_mut(sample).ok_or(Error::DimensionMismatch {
                expected: self.n_samples,
                found: sample + 1,
            })?;
            slot.get_or_insert(label);
        }
        let present: Vec<(usize, usize)> = label_of
            .iter()
            .enumerate()
            .filter_map(|(s, l)| l.map(|l| (s, l)))
            .collect();

        for (a, &(i, li)) in present.iter().enumerate() {
            for &(j, lj) in &present[a + 1..] {
                let idx = condensed_index(self.n_samples, i, j);
                self.co_occurrence[idx] += 1;
                if li == lj {
                    self.together[idx] += 1;
                }
            }
        }
        self.trials += 1;
        if !converged {
            self.non_converged += 1;
        }
        Ok(())
    }

    /// Combine two partial accumulators for the same samples and k.
    pub fn merge(mut self, other: Self) -> Result<Self> {
        if self.n_samples != other.n_samples || self.k != other.k {
            return Err(Error::ShapeMismatch {
                expected: format!("n={}, k={}", self.n_samples, self.k),
                actual: format!("n={}, k={}", other.n_samples, other.k),
            });
        }
        for (a, b) in self.together.iter_mut().zip(&other.together) {
            *a += b;
        }
        for (a, b) in self.co_occurrence.iter_mut().zip(&other.co_occurrence) {
            *a += b;
        }
        self.trials += other.trials;
        self.non_converged += other.non_converged;
        Ok(self)
    }

    /// Freeze into a consensus matrix.
    ///
    /// Pairs that never co-occurred get 0. The diagonal is 1.
    pub fn finalize(self) -> ConsensusMatrix {
        let n = self.n_samples;
        let mut values = Array2::<f64>::eye(n);
        for i in 0..n {
            for j in (i + 1)..n {
                let idx = condensed_index(n, i, j);
                let co = self.co_occurrence[idx];
                let v = if co == 0 {
                    0.0
                } else {
                    f64::from(self.together[idx]) / f64::from(co)
                };
                values[[i, j]] = v;
                values[[j, i]] = v;
            }
        }
        ConsensusMatrix {
            k: self.k,
            values,
            trials: self.trials,
            non_converged_trials: self.non_converged,
        }
    }
}

/// Finalized samples × samples co-clustering frequencies for one k.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConsensusMatrix {
    k: usize,
    values: Array2<f64>,
    trials: usize,
    non_converged_trials: usize,
}

impl ConsensusMatrix {
    /// Rank the trials were run at.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of samples.
    pub fn n_samples(&self) -> usize {
        self.values.nrows()
    }

    /// Trials aggregated.
    pub fn trials(&self) -> usize {
        self.trials
    }

    /// Trials that stopped at the iteration cap.
    pub fn non_converged_trials(&self) -> usize {
        self.non_converged_trials
    }

    /// Fraction of co-occurring trials in which `i` and `j` shared a cluster.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[[i, j]]
    }

    /// Borrow the full symmetric matrix.
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// `1 − consensus` as a condensed upper triangle.
    pub fn condensed_dissimilarity(&self) -> Vec<f64> {
        let n = self.n_samples();
        let mut out = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                out.push(1.0 - self.values[[i, j]]);
            }
        }
        out
    }
}
