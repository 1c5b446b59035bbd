//! Resampled consensus clustering with model-order selection.
//!
//! # Pipeline
//!
//! ```text
//! DataMatrix ─► Resampler ─► trial clusterer (NMF, many seeds, each k)
//!            ─► ConsensusAccumulator (per k) ─► ConsensusMatrix (per k)
//!            ─► cophenetic correlation ─► selected k + consensus labels
//! ```
//!
//! A **trial** is one column subset plus one random initialization. Trials
//! are independent, so they run on a worker pool; each worker folds its
//! finished trials into a private accumulator and the partial accumulators
//! are merged at the end. Counts are integers, so the result does not depend
//! on scheduling.
//!
//! Candidate k's also run concurrently. Model-order selection starts only
//! once every candidate's consensus matrix is final.
//!
//! # Why consensus?
//!
//! NMF labels are arbitrary up to a permutation of factor columns, and a
//! single run lands in one local optimum. Counting how often two samples are
//! co-clustered sidesteps label alignment entirely, and how crisp those
//! frequencies are tells us how stable a given k is (Brunet et al., 2004).
//!
//! # Reproducibility
//!
//! Every trial's column subset is seeded from `(seed, trial)` and its
//! initialization from `(seed, k, trial)`. Re-running with the same seed and
//! configuration reproduces the result exactly, regardless of thread count.

pub mod accumulator;
pub mod resample;
pub mod selection;

pub use accumulator::{ConsensusAccumulator, ConsensusMatrix};
pub use resample::{derive_seed, Resampler, Subset};
pub use selection::{consensus_labels, cophenetic_correlation, select_model_order};

use crate::cluster::{HierarchicalClustering, Linkage, NmfClusterer, NmfConfig, SampleClustering};
use crate::control::CancelToken;
use crate::error::{Error, Result};
use crate::matrix::DataMatrix;
use std::ops::RangeInclusive;
use std::time::Instant;
use tracing::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

const INIT_STREAM: u64 = 0x494E_4954;

/// Which clusterer runs inside each trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConsensusMethod {
    /// Randomly initialized NMF; labels are argmax of the coefficient factor.
    #[default]
    Nmf,
    /// Deterministic agglomerative clustering of sample columns by Euclidean
    /// distance; diversity comes from resampling alone.
    Hierarchical(Linkage),
}

/// Settings for [`cluster_consensus`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConsensusConfig {
    /// Smallest candidate k (at least 2).
    pub k_min: usize,
    /// Largest candidate k.
    pub k_max: usize,
    /// Trials per candidate k.
    pub trials_per_k: usize,
    /// Fraction of samples drawn per trial, in (0, 1].
    pub resample_fraction: f64,
    /// Draw samples with replacement.
    pub replacement: bool,
    /// Base seed for all trials.
    pub seed: u64,
    /// Trial clusterer.
    pub method: ConsensusMethod,
    /// Linkage used on the consensus matrix (cophenetic correlation and final labels).
    pub consensus_linkage: Linkage,
    /// Factorizer settings (used by [`ConsensusMethod::Nmf`]).
    pub nmf: NmfConfig,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            k_min: 2,
            k_max: 5,
            trials_per_k: 50,
            resample_fraction: 0.8,
            replacement: false,
            seed: 20121020,
            method: ConsensusMethod::Nmf,
            consensus_linkage: Linkage::Average,
            nmf: NmfConfig::default(),
        }
    }
}

impl ConsensusConfig {
    /// Set the candidate k range.
    pub fn with_k_range(mut self, ks: RangeInclusive<usize>) -> Self {
        self.k_min = *ks.start();
        self.k_max = *ks.end();
        self
    }

    /// Set trials per k.
    pub fn with_trials_per_k(mut self, trials: usize) -> Self {
        self.trials_per_k = trials;
        self
    }

    /// Set the resampling fraction.
    pub fn with_resample_fraction(mut self, fraction: f64) -> Self {
        self.resample_fraction = fraction;
        self
    }

    /// Draw samples with replacement.
    pub fn with_replacement(mut self, replacement: bool) -> Self {
        self.replacement = replacement;
        self
    }

    /// Set the base seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the trial clusterer.
    pub fn with_method(mut self, method: ConsensusMethod) -> Self {
        self.method = method;
        self
    }

    /// Set the linkage used to cut the consensus matrix and score its
    /// cophenetic correlation.
    pub fn with_consensus_linkage(mut self, linkage: Linkage) -> Self {
        self.consensus_linkage = linkage;
        self
    }

    /// Set the factorizer settings.
    pub fn with_nmf(mut self, nmf: NmfConfig) -> Self {
        self.nmf = nmf;
        self
    }

    /// Candidate k's, ascending.
    pub fn k_range(&self) -> RangeInclusive<usize> {
        self.k_min..=self.k_max
    }

    fn validate(&self) -> Result<()> {
        if self.k_min < 2 || self.k_min > self.k_max {
            return Err(Error::InvalidParameter {
                name: "k_range",
                message: "must be a non-empty range starting at 2 or more",
            });
        }
        if self.trials_per_k == 0 {
            return Err(Error::InvalidParameter {
                name: "trials_per_k",
                message: "must be at least 1",
            });
        }
        self.nmf.validate()
    }
}

/// One candidate k and its evidence.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CandidateOrder {
    /// Candidate rank.
    pub k: usize,
    /// Cophenetic correlation of this k's consensus matrix.
    pub cophenetic: f64,
    /// Consensus matrix for this k.
    pub consensus: ConsensusMatrix,
}

/// Output of [`cluster_consensus`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConsensusResult {
    /// k with maximal cophenetic correlation (smaller k on ties).
    pub selected_k: usize,
    /// Final label per sample, from clustering the selected consensus matrix.
    pub labels: Vec<usize>,
    /// Consensus matrix of the selected k.
    pub consensus_matrix: ConsensusMatrix,
    /// Every candidate, ascending by k.
    pub candidates: Vec<CandidateOrder>,
}

impl ConsensusResult {
    /// Trials across all k that stopped at the iteration cap.
    pub fn non_converged_trials(&self) -> usize {
        self.candidates
            .iter()
            .map(|c| c.consensus.non_converged_trials())
            .sum()
    }
}

/// Consensus clustering of the samples (columns) of `matrix`.
///
/// Fails with [`Error::InvalidMatrix`] when NMF is the trial clusterer and
/// the matrix has negative entries or constant rows, and with
/// [`Error::InvalidClusterCount`] when `k_max` exceeds the per-trial sample
/// count.
pub fn cluster_consensus(matrix: &DataMatrix, config: &ConsensusConfig) -> Result<ConsensusResult> {
    cluster_consensus_with_cancel(matrix, config, &CancelToken::new())
}

/// [`cluster_consensus`] with cooperative cancellation at trial boundaries.
pub fn cluster_consensus_with_cancel(
    matrix: &DataMatrix,
    config: &ConsensusConfig,
    cancel: &CancelToken,
) -> Result<ConsensusResult> {
    config.validate()?;
    let resampler = Resampler::new(
        matrix.n_samples(),
        config.resample_fraction,
        config.replacement,
        config.seed,
    )?;
    if config.k_max > resampler.subset_size() {
        return Err(Error::InvalidClusterCount {
            requested: config.k_max,
            n_items: resampler.subset_size(),
        });
    }

    let clusterer: Box<dyn SampleClustering> = match config.method {
        ConsensusMethod::Nmf => {
            matrix.validate_non_negative()?;
            Box::new(NmfClusterer { config: config.nmf })
        }
        ConsensusMethod::Hierarchical(linkage) => {
            Box::new(HierarchicalClustering::new().with_linkage(linkage))
        }
    };

    let ks: Vec<usize> = config.k_range().collect();
    let run = |&k: &usize| run_candidate(matrix, k, config, clusterer.as_ref(), &resampler, cancel);

    // Barrier: every candidate is finalized before selection begins.
    #[cfg(feature = "parallel")]
    let matrices: Vec<ConsensusMatrix> = ks.par_iter().map(run).collect::<Result<_>>()?;
    #[cfg(not(feature = "parallel"))]
    let matrices: Vec<ConsensusMatrix> = ks.iter().map(run).collect::<Result<_>>()?;

    let mut candidates = Vec::with_capacity(matrices.len());
    for consensus in matrices {
        let cophenetic = cophenetic_correlation(&consensus, config.consensus_linkage)?;
        debug!(k = consensus.k(), cophenetic, "scored candidate");
        candidates.push(CandidateOrder {
            k: consensus.k(),
            cophenetic,
            consensus,
        });
    }

    let scores: Vec<(usize, f64)> = candidates.iter().map(|c| (c.k, c.cophenetic)).collect();
    let selected_k = select_model_order(&scores).ok_or(Error::EmptyInput)?;
    let selected = candidates
        .iter()
        .find(|c| c.k == selected_k)
        .ok_or(Error::EmptyInput)?;
    let labels = consensus_labels(&selected.consensus, selected_k, config.consensus_linkage)?;

    info!(
        selected_k,
        cophenetic = selected.cophenetic,
        n_samples = matrix.n_samples(),
        "selected model order"
    );

    Ok(ConsensusResult {
        selected_k,
        labels,
        consensus_matrix: selected.consensus.clone(),
        candidates,
    })
}

/// Result of one trial, folded into an accumulator as soon as it finishes.
struct TrialOutcome {
    subset: Subset,
    labels: Vec<usize>,
    converged: bool,
}

fn run_trial(
    matrix: &DataMatrix,
    k: usize,
    trial: usize,
    seed: u64,
    clusterer: &dyn SampleClustering,
    resampler: &Resampler,
    cancel: &CancelToken,
) -> Result<TrialOutcome> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    let subset = resampler.subset(trial);
    let data = subset.select(matrix);
    let init_seed = derive_seed(seed, &[INIT_STREAM, k as u64, trial as u64]);
    let partition = clusterer.cluster_samples(data.view(), k, init_seed)?;
    Ok(TrialOutcome {
        subset,
        labels: partition.labels,
        converged: partition.converged,
    })
}

fn run_candidate(
    matrix: &DataMatrix,
    k: usize,
    config: &ConsensusConfig,
    clusterer: &dyn SampleClustering,
    resampler: &Resampler,
    cancel: &CancelToken,
) -> Result<ConsensusMatrix> {
    let started = Instant::now();
    let n = matrix.n_samples();
    let trial = |t: usize| run_trial(matrix, k, t, config.seed, clusterer, resampler, cancel);
    let fold = |mut acc: ConsensusAccumulator, outcome: Result<TrialOutcome>| -> Result<ConsensusAccumulator> {
        let outcome = outcome?;
        acc.record(&outcome.subset.indices, &outcome.labels, outcome.converged)?;
        Ok(acc)
    };

    #[cfg(feature = "parallel")]
    let accumulator = (0..config.trials_per_k)
        .into_par_iter()
        .map(trial)
        .try_fold(|| ConsensusAccumulator::new(n, k), fold)
        .try_reduce(|| ConsensusAccumulator::new(n, k), ConsensusAccumulator::merge)?;
    #[cfg(not(feature = "parallel"))]
    let accumulator = (0..config.trials_per_k)
        .map(trial)
        .try_fold(ConsensusAccumulator::new(n, k), fold)?;

    let consensus = accumulator.finalize();
    if consensus.non_converged_trials() > 0 {
        warn!(
            k,
            non_converged = consensus.non_converged_trials(),
            trials = consensus.trials(),
            "trials stopped at the iteration cap"
        );
    }
    debug!(
        k,
        trials = consensus.trials(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "consensus matrix finalized"
    );
    Ok(consensus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn two_groups() -> DataMatrix {
        // 6 features × 12 samples; samples 0-5 load on features 0-2.
        let values = Array2::from_shape_fn((6, 12), |(f, s)| {
            let on = (f < 3) == (s < 6);
            let jitter = ((f * 7 + s * 13) % 5) as f64 * 0.1;
            if on {
                4.0 + jitter
            } else {
                0.5 + jitter
            }
        });
        DataMatrix::new(values).unwrap()
    }

    #[test]
    fn test_two_groups_selects_two() {
        let cfg = ConsensusConfig::default()
            .with_k_range(2..=4)
            .with_trials_per_k(20)
            .with_seed(3);
        let result = cluster_consensus(&two_groups(), &cfg).unwrap();
        assert_eq!(result.selected_k, 2);
        assert_eq!(result.labels[..6], [0; 6]);
        assert_eq!(result.labels[6..], [1; 6]);
        assert_eq!(result.candidates.len(), 3);
        assert_eq!(result.consensus_matrix.trials(), 20);
    }

    #[test]
    fn test_hierarchical_method() {
        let cfg = ConsensusConfig::default()
            .with_k_range(2..=3)
            .with_trials_per_k(10)
            .with_method(ConsensusMethod::Hierarchical(Linkage::Average));
        let result = cluster_consensus(&two_groups(), &cfg).unwrap();
        assert_eq!(result.selected_k, 2);
        assert_eq!(result.non_converged_trials(), 0);
    }

    #[test]
    fn test_consensus_linkage_is_configurable() {
        let cfg = ConsensusConfig::default()
            .with_k_range(2..=3)
            .with_trials_per_k(10)
            .with_method(ConsensusMethod::Hierarchical(Linkage::Average))
            .with_consensus_linkage(Linkage::Complete);
        assert_eq!(cfg.consensus_linkage, Linkage::Complete);
        let result = cluster_consensus(&two_groups(), &cfg).unwrap();
        assert_eq!(result.selected_k, 2);
        assert_eq!(result.labels[..6], [0; 6]);
        assert_eq!(result.labels[6..], [1; 6]);
    }

    #[test]
    fn test_rejects_negative_matrix_for_nmf() {
        let m = DataMatrix::new(Array2::from_shape_fn((3, 6), |(f, s)| f as f64 - s as f64)).unwrap();
        let cfg = ConsensusConfig::default().with_k_range(2..=2).with_trials_per_k(2);
        assert!(matches!(cluster_consensus(&m, &cfg), Err(Error::InvalidMatrix { .. })));
    }

    #[test]
    fn test_rejects_k_above_subset_size() {
        let cfg = ConsensusConfig::default().with_k_range(2..=10).with_resample_fraction(0.5);
        assert_eq!(
            cluster_consensus(&two_groups(), &cfg).unwrap_err(),
            Error::InvalidClusterCount {
                requested: 10,
                n_items: 6
            }
        );
    }

    #[test]
    fn test_rejects_bad_config() {
        let cfg = ConsensusConfig::default().with_k_range(1..=3);
        assert!(matches!(
            cluster_consensus(&two_groups(), &cfg),
            Err(Error::InvalidParameter { name: "k_range", .. })
        ));
    }

    #[test]
    fn test_cancelled_before_start() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let cfg = ConsensusConfig::default().with_k_range(2..=3).with_trials_per_k(5);
        assert_eq!(
            cluster_consensus_with_cancel(&two_groups(), &cfg, &cancel).unwrap_err(),
            Error::Cancelled
        );
    }

    #[test]
    fn test_iteration_cap_is_reported() {
        let cfg = ConsensusConfig::default()
            .with_k_range(2..=2)
            .with_trials_per_k(4)
            .with_nmf(NmfConfig::default().with_max_iter(3));
        let result = cluster_consensus(&two_groups(), &cfg).unwrap();
        assert_eq!(result.non_converged_trials(), 4);
    }
}
