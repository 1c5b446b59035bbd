//! Per-trial sample clusterers.
//!
//! Consensus clustering runs one clusterer many times on resampled columns
//! and only keeps who was grouped with whom. Anything implementing
//! [`SampleClustering`] can serve as that clusterer.
//!
//! ## Algorithms
//!
//! ### Non-negative Matrix Factorization (NMF)
//!
//! Factor the features × samples matrix as V ≈ WH with k non-negative
//! metagenes; each sample joins the metagene it loads on most:
//!
//! ```text
//! label(j) = argmaxₐ H[a, j]
//! ```
//!
//! **When to use**: expression-style data where samples are additive
//! mixtures of programs. Random initialization gives each trial a different
//! local optimum, which is what consensus needs.
//!
//! ### Hierarchical (Agglomerative) Clustering
//!
//! Bottom-up: start with each sample as its own cluster, repeatedly merge
//! the two closest clusters until one remains. The merge history forms a
//! **dendrogram** that is cut into k groups.
//!
//! **When to use**: as a deterministic trial clusterer (diversity then comes
//! only from resampling), and always for the final cut of the consensus
//! matrix.
//!
//! ## Usage
//!
//! ```rust
//! use ccal::cluster::{Nmf, NmfConfig};
//! use ndarray::array;
//!
//! let v = array![
//!     [5.0, 5.1, 0.1, 0.2],
//!     [4.9, 5.2, 0.2, 0.1],
//!     [0.1, 0.2, 6.0, 5.8],
//! ];
//! let fit = Nmf::new(2)
//!     .with_config(NmfConfig::default().with_max_iter(300))
//!     .with_seed(42)
//!     .factorize(v.view())
//!     .unwrap();
//! let labels = fit.labels();
//! assert_eq!(labels[0], labels[1]);
//! assert_ne!(labels[0], labels[2]);
//! ```

mod hierarchical;
mod nmf;
mod traits;

pub use hierarchical::{HierarchicalClustering, Linkage};
pub use nmf::{Factorization, Nmf, NmfClusterer, NmfConfig};
pub use traits::{SampleClustering, TrialPartition};
