//! Model-order selection by cophenetic correlation.
//!
//! A consensus matrix from a well-chosen k is nearly block diagonal with
//! entries close to 0 or 1. Hierarchical clustering of `1 − consensus` then
//! reproduces those dissimilarities almost exactly, so the correlation
//! between the input dissimilarities and the tree's cophenetic distances is
//! close to 1. Ambiguous k's spread consensus values over (0, 1) and the
//! tree distorts them.

use crate::cluster::{HierarchicalClustering, Linkage};
use crate::consensus::accumulator::ConsensusMatrix;
use crate::error::{Error, Result};
use crate::information::pearson_correlation;

/// Cophenetic correlation coefficient of one consensus matrix.
///
/// Zero when either the dissimilarities or the cophenetic distances have no
/// variance (nothing to preserve).
pub fn cophenetic_correlation(consensus: &ConsensusMatrix, linkage: Linkage) -> Result<f64> {
    let n = consensus.n_samples();
    if n < 3 {
        return Ok(0.0);
    }
    let dissimilarity = consensus.condensed_dissimilarity();
    let dendro = HierarchicalClustering::new()
        .with_linkage(linkage)
        .fit_condensed(&dissimilarity, n)?;
    let cophenetic = dendro.cophenetic_distances()?;
    Ok(pearson_correlation(&dissimilarity, &cophenetic)?.unwrap_or(0.0))
}

/// Pick the k with the largest coefficient; ties keep the smaller k.
///
/// `scores` holds `(k, coefficient)` pairs in any order.
pub fn select_model_order(scores: &[(usize, f64)]) -> Option<usize> {
    let mut sorted: Vec<(usize, f64)> = scores.to_vec();
    sorted.sort_by_key(|&(k, _)| k);
    let mut best: Option<(usize, f64)> = None;
    for (k, coef) in sorted {
        match best {
            Some((_, b)) if coef <= b => {}
            _ => best = Some((k, coef)),
        }
    }
    best.map(|(k, _)| k)
}

/// Final labels: hierarchical clustering of `1 − consensus`, cut into `k` groups.
pub fn consensus_labels(consensus: &ConsensusMatrix, k: usize, linkage: Linkage) -> Result<Vec<usize>> {
    let n = consensus.n_samples();
    if k == 0 || k > n {
        return Err(Error::InvalidClusterCount {
            requested: k,
            n_items: n,
        });
    }
    HierarchicalClustering::new()
        .with_linkage(linkage)
        .fit_condensed(&consensus.condensed_dissimilarity(), n)?
        .cut_to_k(k)
}
