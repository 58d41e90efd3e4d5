//! CPU implementation of cluster evaluation metrics.

use numr::runtime::cpu::{CpuClient, CpuRuntime};
use numr::tensor::Tensor;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::cluster::impl_generic::{inertia_impl, silhouette_score_impl};
use crate::cluster::traits::metrics::ClusterMetricsAlgorithms;
use crate::error::ClusterResult;

impl ClusterMetricsAlgorithms<CpuRuntime> for CpuClient {
    fn inertia(
        &self,
        data: &Tensor<CpuRuntime>,
        labels: &Tensor<CpuRuntime>,
        centroids: &Tensor<CpuRuntime>,
    ) -> ClusterResult<f64> {
        inertia_impl(self, data, labels, centroids)
    }

    fn silhouette_score(
        &self,
        data: &Tensor<CpuRuntime>,
        labels: &Tensor<CpuRuntime>,
        sample_limit: usize,
        seed: u64,
    ) -> ClusterResult<f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        silhouette_score_impl(self, data, labels, sample_limit, &mut rng)
    }
}
