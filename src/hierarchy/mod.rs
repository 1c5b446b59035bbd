//! Agglomerative merge trees.
//!
//! A [`Dendrogram`] records the merge history of hierarchical clustering. It
//! is used twice in consensus clustering: cutting it into k groups yields the
//! final sample labels, and its cophenetic distances measure how faithfully
//! the tree preserves the consensus dissimilarities.

pub mod dendrogram;

pub use dendrogram::{condensed_index, Dendrogram, Merge};
