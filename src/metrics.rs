//! Partition agreement metrics.
//!
//! Compare predicted cluster labels to known groups, or two clusterings to
//! each other. Label values are arbitrary; only the grouping matters.
//!
//! | Metric | Range | Best | Properties |
//! |--------|-------|------|------------|
//! | [`purity`] | [0, 1] | 1 | Simple, biased toward many clusters |
//! | [`ari`] | [-1, 1] | 1 | Adjusted for chance |
//! | [`nmi`] | [0, 1] | 1 | Normalized mutual information |
//!
//! # Example
//!
//! ```rust
//! use ccal::metrics::{ari, nmi, purity};
//!
//! let pred = [0, 0, 1, 1, 2, 2];
//! let truth = [0, 0, 0, 1, 1, 1];
//!
//! assert!(purity(&pred, &truth) > 0.6);
//! assert!(ari(&pred, &truth) < 1.0);
//! assert!(nmi(&pred, &truth) < 1.0);
//! ```
//!
//! # References
//!
//! - Hubert & Arabie (1985). "Comparing partitions" (ARI)
//! - Strehl & Ghosh (2002). "Cluster ensembles" (NMI)

use std::collections::HashMap;

fn contingency(pred: &[usize], truth: &[usize]) -> HashMap<(usize, usize), usize> {
    let mut table = HashMap::new();
    for (&p, &t) in pred.iter().zip(truth) {
        *table.entry((p, t)).or_insert(0) += 1;
    }
    table
}

fn counts(labels: &[usize]) -> HashMap<usize, usize> {
    let mut out = HashMap::new();
    for &l in labels {
        *out.entry(l).or_insert(0) += 1;
    }
    out
}

fn entropy(counts: &HashMap<usize, usize>, n: f64) -> f64 {
    counts
        .values()
        .map(|&c| {
            let p = c as f64 / n;
            if p > 0.0 {
                -p * p.ln()
            } else {
                0.0
            }
        })
        .sum()
}

fn comb2(n: usize) -> f64 {
    if n < 2 {
        0.0
    } else {
        (n * (n - 1) / 2) as f64
    }
}

/// Purity of `pred` with respect to `truth`.
///
/// For each predicted cluster, count its most common true label; purity is
/// the fraction of samples so covered. Returns 0 on length mismatch or
/// empty input.
pub fn purity(pred: &[usize], truth: &[usize]) -> f64 {
    if pred.len() != truth.len() || pred.is_empty() {
        return 0.0;
    }
    let mut best: HashMap<usize, usize> = HashMap::new();
    for (&(p, _), &count) in &contingency(pred, truth) {
        let slot = best.entry(p).or_insert(0);
        *slot = (*slot).max(count);
    }
    best.values().sum::<usize>() as f64 / pred.len() as f64
}

/// Adjusted Rand Index between two clusterings.
///
/// 0 for chance-level agreement, 1 for identical partitions.
pub fn ari(pred: &[usize], truth: &[usize]) -> f64 {
    if pred.len() != truth.len() || pred.is_empty() {
        return 0.0;
    }
    let sum_ij: f64 = contingency(pred, truth).values().map(|&c| comb2(c)).sum();
    let sum_a: f64 = counts(pred).values().map(|&c| comb2(c)).sum();
    let sum_b: f64 = counts(truth).values().map(|&c| comb2(c)).sum();

    let expected = sum_a * sum_b / comb2(pred.len()).max(1.0);
    let max_index = (sum_a + sum_b) / 2.0;
    let denom = max_index - expected;
    if denom.abs() < 1e-10 {
        return 1.0;
    }
    (sum_ij - expected) / denom
}

/// Normalized mutual information, `2 I(U; V) / (H(U) + H(V))`.
pub fn nmi(pred: &[usize], truth: &[usize]) -> f64 {
    if pred.len() != truth.len() || pred.is_empty() {
        return 0.0;
    }
    let n = pred.len() as f64;
    let p_pred = counts(pred);
    let p_truth = counts(truth);

    let mut mi = 0.0;
    for (&(p, t), &count) in &contingency(pred, truth) {
        let p_joint = count as f64 / n;
        let p_p = p_pred[&p] as f64 / n;
        let p_t = p_truth[&t] as f64 / n;
        mi += p_joint * (p_joint / (p_p * p_t)).ln();
    }

    let denom = entropy(&p_pred, n) + entropy(&p_truth, n);
    if denom > 0.0 {
        2.0 * mi / denom
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nmi_permuted() {
        let pred = [1, 1, 0, 0, 2, 2];
        let truth = [0, 0, 1, 1, 2, 2];
        assert!((nmi(&pred, &truth) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_ari_perfect_and_random() {
        assert!((ari(&[0, 0, 1, 1], &[5, 5, 3, 3]) - 1.0).abs() < 1e-9);
        assert!(ari(&[0, 1, 0, 1], &[0, 0, 1, 1]) < 0.1);
    }

    #[test]
    fn test_purity_overclustering() {
        // Each point is its own cluster: trivially pure.
        assert!((purity(&[0, 1, 2, 3], &[0, 0, 1, 1]) - 1.0).abs() < 1e-9);
        assert!((purity(&[0, 0, 0, 0], &[0, 0, 1, 1]) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_mismatched_lengths() {
        assert_eq!(purity(&[0], &[0, 1]), 0.0);
        assert_eq!(ari(&[], &[]), 0.0);
    }
}
