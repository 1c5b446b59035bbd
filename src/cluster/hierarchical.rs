//! Hierarchical (agglomerative) clustering.
//!
//! Bottom-up clustering that builds a **dendrogram** by iteratively
//! merging the closest clusters. Cut the tree at k groups afterwards.
//!
//! # Linkage Methods
//!
//! The key choice: how do we define "distance between clusters"?
//!
//! | Linkage | Formula | Effect |
//! |---------|---------|--------|
//! | Single | min(d(a,b)) for a∈A, b∈B | Chaining; elongated clusters |
//! | Complete | max(d(a,b)) | Compact, spherical clusters |
//! | Average | mean(d(a,b)) | Balanced compromise |
//! | Ward | Δ variance | Minimizes within-cluster variance |
//!
//! Average linkage is the default: it is the linkage under which the
//! cophenetic correlation of a consensus matrix is conventionally reported.
//!
//! # Inputs
//!
//! Either a precomputed condensed dissimilarity (for consensus matrices,
//! `1 − consensus`) or a features × samples matrix, in which case samples
//! are compared by Euclidean distance between their columns.

use super::traits::{SampleClustering, TrialPartition};
use crate::error::{Error, Result};
use crate::hierarchy::Dendrogram;
use kodama::{linkage as kodama_linkage, Method as KodamaMethod};
use ndarray::ArrayView2;

/// Linkage method for hierarchical clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Linkage {
    /// Single linkage: minimum distance between clusters.
    Single,
    /// Complete linkage: maximum distance between clusters.
    Complete,
    /// Average linkage: mean distance between clusters.
    #[default]
    Average,
    /// Ward's method: minimize within-cluster variance.
    Ward,
}

impl Linkage {
    fn kodama_method(self) -> KodamaMethod {
        match self {
            Linkage::Single => KodamaMethod::Single,
            Linkage::Complete => KodamaMethod::Complete,
            Linkage::Average => KodamaMethod::Average,
            Linkage::Ward => KodamaMethod::Ward,
        }
    }
}

/// Hierarchical (agglomerative) clustering.
#[derive(Debug, Clone, Default)]
pub struct HierarchicalClustering {
    /// Linkage method.
    linkage: Linkage,
}

impl HierarchicalClustering {
    /// Create a new hierarchical clusterer with average linkage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set linkage method.
    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    /// Linkage in use.
    pub fn linkage(&self) -> Linkage {
        self.linkage
    }

    /// Build the dendrogram of a condensed dissimilarity over `n` items.
    ///
    /// `condensed` is the row-major upper triangle, length n·(n−1)/2.
    pub fn fit_condensed(&self, condensed: &[f64], n: usize) -> Result<Dendrogram> {
        if n == 0 {
            return Err(Error::EmptyInput);
        }
        let expected = n * (n - 1) / 2;
        if condensed.len() != expected {
            return Err(Error::DimensionMismatch {
                expected,
                found: condensed.len(),
            });
        }
        if condensed.iter().any(|d| !d.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "condensed",
                message: "dissimilarities must be finite",
            });
        }

        // kodama reorders its input in place.
        let mut scratch = condensed.to_vec();
        let dend = kodama_linkage(&mut scratch, n, self.linkage.kodama_method());

        let mut dendro = Dendrogram::new(n);
        for step in dend.steps() {
            dendro.add_merge(step.cluster1, step.cluster2, step.dissimilarity, step.size);
        }
        Ok(dendro)
    }

    /// Build the dendrogram of the samples (columns) of a features × samples matrix.
    pub fn fit_columns(&self, data: ArrayView2<'_, f64>) -> Result<Dendrogram> {
        let n = data.ncols();
        if n == 0 || data.nrows() == 0 {
            return Err(Error::EmptyInput);
        }
        let mut condensed = Vec::with_capacity(n * (n - 1) / 2);
        for a in 0..n.saturating_sub(1) {
            for b in (a + 1)..n {
                condensed.push(Self::euclidean_distance(data, a, b));
            }
        }
        self.fit_condensed(&condensed, n)
    }

    /// Euclidean distance between two columns.
    #[inline]
    fn euclidean_distance(data: ArrayView2<'_, f64>, a: usize, b: usize) -> f64 {
        data.column(a)
            .iter()
            .zip(data.column(b).iter())
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f64>()
            .sqrt()
    }
}

impl SampleClustering for HierarchicalClustering {
    fn cluster_samples(&self, data: ArrayView2<'_, f64>, k: usize, _seed: u64) -> Result<TrialPartition> {
        let dendro = self.fit_columns(data)?;
        Ok(TrialPartition {
            labels: dendro.cut_to_k(k)?,
            converged: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_hierarchical_basic() {
        // Samples are columns: {0,1} near the origin, {2,3} near (10, 10).
        let data = array![[0.0, 0.1, 10.0, 10.1], [0.0, 0.1, 10.0, 10.1]];

        let hc = HierarchicalClustering::new();
        let labels = hc.cluster_samples(data.view(), 2, 0).unwrap().labels;

        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[2], labels[3]);
        assert_ne!(labels[0], labels[2]);
    }

    #[test]
    fn test_dendrogram() {
        let data = array![[0.0, 1.0, 10.0], [0.0, 0.0, 0.0]];

        let dendro = HierarchicalClustering::new().fit_columns(data.view()).unwrap();

        assert_eq!(dendro.n_items(), 3);
        assert_eq!(dendro.n_merges(), 2);
        assert!((dendro.distances()[0] - 1.0).abs() < 1e-12);

        let merges: Vec<_> = dendro.merges().collect();
        let m = merges[0];
        assert_eq!((m.cluster_a.min(m.cluster_b), m.cluster_a.max(m.cluster_b)), (0, 1));
        assert_eq!(merges[0].size, 2);
        assert_eq!(merges[1].size, 3);
        assert!(merges[0].distance <= merges[1].distance);
    }

    #[test]
    fn test_condensed_length_checked() {
        let hc = HierarchicalClustering::new().with_linkage(Linkage::Complete);
        assert_eq!(
            hc.fit_condensed(&[0.1, 0.2], 3).unwrap_err(),
            Error::DimensionMismatch {
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn test_every_linkage_builds_full_tree() {
        let condensed = [0.1, 0.9, 0.8, 0.85, 0.95, 0.2];
        for linkage in [Linkage::Single, Linkage::Complete, Linkage::Average, Linkage::Ward] {
            let dendro = HierarchicalClustering::new()
                .with_linkage(linkage)
                .fit_condensed(&condensed, 4)
                .unwrap();
            assert_eq!(dendro.cut_to_k(2).unwrap(), vec![0, 0, 1, 1]);
        }
    }
}
