//! Clustering of normalized observations.

pub mod kmeans;

pub use kmeans::*;
