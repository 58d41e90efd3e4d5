//! K-Means clustering trait.

use numr::runtime::Runtime;
use numr::tensor::Tensor;

use crate::cancel::CancelToken;
use crate::dataset::Dataset;
use crate::error::ClusterResult;

/// Initialization method for K-Means.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum KMeansInit {
    /// K-Means++ initialization (default).
    #[default]
    KMeansPlusPlus,
    /// Random selection of distinct data points.
    Random,
    /// User-provided initial centroids [k, d].
    Points(Dataset),
}

/// Stopping rule for Lloyd iteration.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ConvergenceMode {
    /// Stop once no point changes cluster between iterations (default).
    #[default]
    AssignmentStable,
    /// Stop once the change in inertia drops below `tol`.
    InertiaDelta { tol: f64 },
}

/// Options for K-Means clustering.
#[derive(Debug, Clone)]
pub struct KMeansOptions {
    /// Number of clusters.
    pub n_clusters: usize,
    /// Maximum iterations per run.
    pub max_iter: usize,
    /// Stopping rule.
    pub convergence: ConvergenceMode,
    /// Initialization method.
    pub init: KMeansInit,
    /// Number of seeded restarts (lowest inertia kept).
    pub n_init: usize,
    /// Seed for the random stream driving initialization.
    pub seed: u64,
}

impl Default for KMeansOptions {
    fn default() -> Self {
        Self {
            n_clusters: 8,
            max_iter: 100,
            convergence: ConvergenceMode::AssignmentStable,
            init: KMeansInit::KMeansPlusPlus,
            n_init: 1,
            seed: 0,
        }
    }
}

impl KMeansOptions {
    /// Defaults with the given cluster count.
    pub fn with_clusters(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            ..Default::default()
        }
    }
}

/// Result of K-Means clustering.
#[derive(Debug, Clone)]
pub struct KMeansResult<R: Runtime> {
    /// Cluster centroids [k, d].
    pub centroids: Tensor<R>,
    /// Cluster assignment for each point [n] I64.
    pub labels: Tensor<R>,
    /// Sum of squared distances from each point to its centroid.
    pub inertia: f64,
    /// Number of iterations run.
    pub n_iter: usize,
    /// False when `max_iter` was hit before the stopping rule held.
    pub converged: bool,
}

/// K-Means clustering algorithms.
pub trait KMeansAlgorithms<R: Runtime> {
    /// Fit K-Means clustering to data [n, d].
    fn kmeans(
        &self,
        data: &Tensor<R>,
        options: &KMeansOptions,
        cancel: &CancelToken,
    ) -> ClusterResult<KMeansResult<R>>;

    /// Predict cluster assignments [n] I64 for new data given centroids.
    fn kmeans_predict(&self, centroids: &Tensor<R>, data: &Tensor<R>) -> ClusterResult<Tensor<R>>;
}
