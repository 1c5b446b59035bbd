//! Dendrogram produced by agglomerative clustering.
//!
//! Cluster ids follow the SciPy/MATLAB convention: leaves are `0..n`, and
//! merge `i` creates cluster `n + i`.

use crate::error::{Error, Result};

/// A dendrogram representing hierarchical cluster merges.
///
/// Each merge combines two clusters into one, recording:
/// - Which clusters were merged
/// - The dissimilarity at which they merged
/// - The size of the resulting cluster
#[derive(Debug, Clone)]
pub struct Dendrogram {
    merges: Vec<Merge>,
    n_items: usize,
}

/// A single merge operation in the dendrogram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merge {
    /// First cluster being merged (index).
    pub cluster_a: usize,
    /// Second cluster being merged (index).
    pub cluster_b: usize,
    /// Dissimilarity at which the merge occurred.
    pub distance: f64,
    /// Size of resulting cluster.
    pub size: usize,
}

/// Position of pair `(i, j)`, `i < j`, in a row-major condensed upper triangle.
pub fn condensed_index(n: usize, i: usize, j: usize) -> usize {
    debug_assert!(i < j && j < n);
    n * i - i * (i + 1) / 2 + (j - i - 1)
}

fn find_root(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

impl Dendrogram {
    /// Create a new dendrogram for n items.
    pub fn new(n_items: usize) -> Self {
        Self {
            merges: Vec::with_capacity(n_items.saturating_sub(1)),
            n_items,
        }
    }

    /// Record a merge operation.
    pub fn add_merge(&mut self, cluster_a: usize, cluster_b: usize, distance: f64, size: usize) {
        self.merges.push(Merge {
            cluster_a,
            cluster_b,
            distance,
            size,
        });
    }

    /// Cluster assignments after applying exactly `n - k` merges.
    ///
    /// Labels are renumbered `0..k` in order of first appearance, so the
    /// output is deterministic for a given merge history.
    pub fn cut_to_k(&self, k: usize) -> Result<Vec<usize>> {
        if k == 0 || k > self.n_items {
            return Err(Error::InvalidClusterCount {
                requested: k,
                n_items: self.n_items,
            });
        }
        let n_merges = self.n_items - k;
        if n_merges > self.merges.len() {
            return Err(Error::InvalidClusterCount {
                requested: k,
                n_items: self.n_items,
            });
        }

        let total = self.n_items + self.merges.len();
        let mut parent: Vec<usize> = (0..total).collect();
        for (i, merge) in self.merges.iter().take(n_merges).enumerate() {
            let new_id = self.n_items + i;
            let a = find_root(&mut parent, merge.cluster_a);
            let b = find_root(&mut parent, merge.cluster_b);
            parent[a] = new_id;
            parent[b] = new_id;
        }

        let mut relabel: Vec<Option<usize>> = vec![None; total];
        let mut next = 0;
        let mut labels = Vec::with_capacity(self.n_items);
        for item in 0..self.n_items {
            let root = find_root(&mut parent, item);
            let label = *relabel[root].get_or_insert_with(|| {
                next += 1;
                next - 1
            });
            labels.push(label);
        }
        Ok(labels)
    }

    /// Cophenetic distances in condensed (upper triangle, row-major) form.
    ///
    /// The cophenetic distance between two items is the dissimilarity of the
    /// merge that first placed them in the same cluster.
    pub fn cophenetic_distances(&self) -> Result<Vec<f64>> {
        let n = self.n_items;
        if self.merges.len() + 1 != n {
            return Err(Error::ShapeMismatch {
                expected: format!("{} merges", n.saturating_sub(1)),
                actual: format!("{} merges", self.merges.len()),
            });
        }
        let mut members: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();
        members.resize_with(2 * n - 1, Vec::new);
        let mut out = vec![0.0; n * (n - 1) / 2];

        for (i, merge) in self.merges.iter().enumerate() {
            let a = std::mem::take(&mut members[merge.cluster_a]);
            let b = std::mem::take(&mut members[merge.cluster_b]);
            for &p in &a {
                for &q in &b {
                    let (lo, hi) = if p < q { (p, q) } else { (q, p) };
                    out[condensed_index(n, lo, hi)] = merge.distance;
                }
            }
            let mut joined = a;
            joined.extend(b);
            members[n + i] = joined;
        }
        Ok(out)
    }

    /// Number of original items.
    pub fn n_items(&self) -> usize {
        self.n_items
    }

    /// Number of merges recorded.
    pub fn n_merges(&self) -> usize {
        self.merges.len()
    }

    /// Iterate over merges.
    pub fn merges(&self) -> impl Iterator<Item = &Merge> {
        self.merges.iter()
    }

    /// Merge heights, in merge order.
    pub fn distances(&self) -> Vec<f64> {
        self.merges.iter().map(|m| m.distance).collect()
    }
}
