//! CPU clustering engines.
//!
//! Implements the `*Algorithms<CpuRuntime>` traits for
//! [`CpuClient`](numr::runtime::cpu::CpuClient) and wraps them in
//! [`Clusterer`](crate::cluster::Clusterer) engines over a [`Dataset`](crate::Dataset).

pub mod kmeans;
pub mod mean_shift;
pub mod metrics;
pub mod optimal_k;

pub use kmeans::KMeans;
pub use mean_shift::MeanShift;
pub use optimal_k::OptimalK;
