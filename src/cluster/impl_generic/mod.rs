//! Generic clustering algorithm implementations.
//!
//! Every function here is generic over the numr runtime `R` and a client `C`
//! providing the tensor ops it needs; the CPU backend wires them to
//! [`CpuClient`](numr::runtime::cpu::CpuClient).

pub mod grid;
pub mod kmeans;
pub mod mean_shift;
pub mod metrics;
pub mod optimal_k;

pub use grid::GridIndex;
pub use kmeans::{kmeans_impl, kmeans_predict_impl};
pub use mean_shift::{estimate_bandwidth_impl, mean_shift_impl};
pub use metrics::{inertia_impl, silhouette_score_impl};
pub use optimal_k::{elbow_curvatures, optimal_k_impl, select_elbow};
