//! Mean Shift clustering trait.

use numr::runtime::Runtime;
use numr::tensor::Tensor;

use crate::cancel::CancelToken;
use crate::error::ClusterResult;

/// Percentile of sampled pairwise distances used as the automatic bandwidth.
///
/// A tunable policy value rather than a derived optimum.
pub const DEFAULT_BANDWIDTH_PERCENTILE: f64 = 0.10;

/// Bandwidth used when the estimate collapses to zero (all sampled points
/// coincide, or there is only one point).
pub const FALLBACK_BANDWIDTH: f64 = 1.0;

/// Options for Mean Shift.
#[derive(Debug, Clone)]
pub struct MeanShiftOptions {
    /// Flat kernel radius. None = estimate from a pair subsample.
    pub bandwidth: Option<f64>,
    /// An ascent stops once an update moves the estimate at most this far.
    pub shift_epsilon: f64,
    /// Percentile of sampled pair distances used when estimating bandwidth.
    pub bandwidth_percentile: f64,
    /// Maximum number of random pairs sampled for bandwidth estimation.
    pub neighbor_subsample_limit: usize,
    /// Maximum update steps per ascent.
    pub max_iter: usize,
    /// Ascend from grid-bin means instead of from every point.
    pub bin_seeding: bool,
    /// Bins with fewer points are not used as seeds.
    pub min_bin_freq: usize,
    /// Seed for the pair subsample.
    pub seed: u64,
}

impl Default for MeanShiftOptions {
    fn default() -> Self {
        Self {
            bandwidth: None,
            shift_epsilon: 0.1,
            bandwidth_percentile: DEFAULT_BANDWIDTH_PERCENTILE,
            neighbor_subsample_limit: 5000,
            max_iter: 300,
            bin_seeding: false,
            min_bin_freq: 1,
            seed: 0,
        }
    }
}

impl MeanShiftOptions {
    /// Defaults with a fixed bandwidth.
    pub fn with_bandwidth(bandwidth: f64) -> Self {
        Self {
            bandwidth: Some(bandwidth),
            ..Default::default()
        }
    }
}

/// Result of Mean Shift clustering.
#[derive(Debug, Clone)]
pub struct MeanShiftResult<R: Runtime> {
    /// Cluster label for each point [n] I64.
    pub labels: Tensor<R>,
    /// Modes in registration order [n_clusters, d].
    pub cluster_centers: Tensor<R>,
    /// Sum of squared distances from each point to its mode.
    pub inertia: f64,
    /// Longest single ascent.
    pub n_iter: usize,
    /// False when any ascent hit `max_iter`.
    pub converged: bool,
    /// Kernel radius used (given or estimated).
    pub bandwidth: f64,
}

/// Mean Shift clustering algorithms.
pub trait MeanShiftAlgorithms<R: Runtime> {
    /// Mean Shift clustering of data [n, d].
    fn mean_shift(
        &self,
        data: &Tensor<R>,
        options: &MeanShiftOptions,
        cancel: &CancelToken,
    ) -> ClusterResult<MeanShiftResult<R>>;

    /// Bandwidth estimate for data [n, d] from a seeded pair subsample.
    fn estimate_bandwidth(
        &self,
        data: &Tensor<R>,
        percentile: f64,
        max_pairs: usize,
        seed: u64,
    ) -> ClusterResult<f64>;
}
