//! Clustering traits and option types.

pub mod clusterer;
pub mod kmeans;
pub mod mean_shift;
pub mod metrics;
pub mod optimal_k;
