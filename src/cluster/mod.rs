//! Clustering algorithms.
//!
//! K-Means (k-means++ seeding, Lloyd iteration), flat-kernel Mean Shift with
//! grid-accelerated neighbor search, and cluster-count selection by the
//! elbow or silhouette rule.
//!
//! Each algorithm is a `*Algorithms<R>` trait over numr tensors, implemented
//! for [`CpuClient`](numr::runtime::cpu::CpuClient), with a [`Clusterer`]
//! engine on top that works on a [`Dataset`](crate::Dataset).

mod cpu;
pub mod impl_generic;
pub mod traits;
mod validation;

pub use cpu::{KMeans, MeanShift, OptimalK};
pub use traits::clusterer::{labels_to_host, labels_to_tensor, Clusterer, ClusteringResult};
pub use traits::kmeans::{
    ConvergenceMode, KMeansAlgorithms, KMeansInit, KMeansOptions, KMeansResult,
};
pub use traits::mean_shift::{
    MeanShiftAlgorithms, MeanShiftOptions, MeanShiftResult, DEFAULT_BANDWIDTH_PERCENTILE,
    FALLBACK_BANDWIDTH,
};
pub use traits::metrics::ClusterMetricsAlgorithms;
pub use traits::optimal_k::{KSearch, KSelection, OptimalKOptions, OptimalKReport};
pub use validation::*;
