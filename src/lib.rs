//! # ccal
//!
//! Association scoring and sample subgroup discovery for features × samples
//! matrices (expression-style data).
//!
//! Two independent primitives:
//!
//! - **Information coefficient** ([`information`]): a signed, bounded,
//!   non-linear association score between two variables, from kernel density
//!   estimates of their mutual information. [`scoring`] applies it to every
//!   row of a matrix against a target, with permutation significance.
//! - **Consensus clustering** ([`consensus`]): many NMF factorizations over
//!   resampled columns and random initializations are aggregated into a
//!   co-clustering matrix per candidate k; the k whose consensus is best
//!   preserved by hierarchical clustering (cophenetic correlation) wins.
//!
//! Data ingestion, plotting, and command-line handling live outside this
//! crate.
//!
//! ```rust
//! use ccal::{compute_information_coefficient, InformationConfig};
//!
//! let x: Vec<f64> = (0..50).map(|i| i as f64).collect();
//! let y: Vec<f64> = x.iter().map(|v| v.sqrt()).collect();
//! let ic = compute_information_coefficient(&x, &y, &InformationConfig::default()).unwrap();
//! assert!(ic > 0.5);
//! ```

pub mod cluster;
pub mod consensus;
pub mod control;
pub mod density;
/// Error types used across `ccal`.
pub mod error;
pub mod hierarchy;
pub mod information;
pub mod matrix;
pub mod metrics;
pub mod scoring;

pub use crate::cluster::{Factorization, HierarchicalClustering, Linkage, Nmf, NmfConfig};
pub use crate::consensus::{
    cluster_consensus, cluster_consensus_with_cancel, ConsensusConfig, ConsensusMatrix,
    ConsensusMethod, ConsensusResult,
};
pub use crate::density::KdeConfig;
pub use crate::information::{
    compute_information_coefficient, information_coefficient_matrix, information_distance,
    InformationConfig,
};
pub use crate::scoring::{score_rows_against_target, RowScore, ScoringConfig};

pub use control::CancelToken;
pub use error::{Error, Result};
pub use hierarchy::Dendrogram;
pub use matrix::DataMatrix;
pub use metrics::{ari, nmi, purity};
