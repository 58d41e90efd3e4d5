//! Cluster evaluation metrics trait.

use numr::runtime::Runtime;
use numr::tensor::Tensor;

use crate::error::ClusterResult;

/// Cluster evaluation metrics.
pub trait ClusterMetricsAlgorithms<R: Runtime> {
    /// Sum of squared distances from each point of `data` [n, d] to
    /// `centroids[labels[i]]`.
    fn inertia(
        &self,
        data: &Tensor<R>,
        labels: &Tensor<R>,
        centroids: &Tensor<R>,
    ) -> ClusterResult<f64>;

    /// Mean silhouette coefficient over at most `sample_limit` points, drawn
    /// with a generator seeded from `seed`.
    fn silhouette_score(
        &self,
        data: &Tensor<R>,
        labels: &Tensor<R>,
        sample_limit: usize,
        seed: u64,
    ) -> ClusterResult<f64>;
}
