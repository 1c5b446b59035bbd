//! Clustering traits.

use crate::error::Result;
use ndarray::ArrayView2;

/// Hard partition of the samples seen by one trial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialPartition {
    /// One label per column of the trial's data, in column order.
    pub labels: Vec<usize>,
    /// False when an iterative clusterer stopped at its iteration cap.
    pub converged: bool,
}

/// A clusterer that can serve as one consensus trial.
///
/// Implementations are stateless between calls: everything random is
/// derived from `seed`, so a trial can be replayed on any worker.
pub trait SampleClustering: Send + Sync {
    /// Partition the columns (samples) of a features × samples matrix into
    /// at most `k` groups.
    fn cluster_samples(&self, data: ArrayView2<'_, f64>, k: usize, seed: u64) -> Result<TrialPartition>;
}
