//! CPU implementation of K-Means clustering.

use numr::runtime::cpu::{CpuClient, CpuDevice, CpuRuntime};
use numr::tensor::Tensor;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::cancel::CancelToken;
use crate::cluster::impl_generic::{kmeans_impl, kmeans_predict_impl};
use crate::cluster::traits::clusterer::{labels_to_host, Clusterer, ClusteringResult};
use crate::cluster::traits::kmeans::{KMeansAlgorithms, KMeansOptions, KMeansResult};
use crate::dataset::Dataset;
use crate::error::ClusterResult;

impl KMeansAlgorithms<CpuRuntime> for CpuClient {
    fn kmeans(
        &self,
        data: &Tensor<CpuRuntime>,
        options: &KMeansOptions,
        cancel: &CancelToken,
    ) -> ClusterResult<KMeansResult<CpuRuntime>> {
        let mut rng = ChaCha8Rng::seed_from_u64(options.seed);
        kmeans_impl(self, data, options, &mut rng, cancel)
    }

    fn kmeans_predict(
        &self,
        centroids: &Tensor<CpuRuntime>,
        data: &Tensor<CpuRuntime>,
    ) -> ClusterResult<Tensor<CpuRuntime>> {
        kmeans_predict_impl(self, centroids, data)
    }
}

/// K-Means engine: k-means++ seeding plus Lloyd iteration.
#[derive(Debug, Clone)]
pub struct KMeans {
    options: KMeansOptions,
    cancel: CancelToken,
    client: CpuClient,
}

impl Default for KMeans {
    fn default() -> Self {
        Self::new(KMeansOptions::default())
    }
}

impl KMeans {
    pub fn new(options: KMeansOptions) -> Self {
        Self {
            options,
            cancel: CancelToken::default(),
            client: CpuClient::new(CpuDevice::new()),
        }
    }

    /// Abort the fit when `cancel` fires or its deadline passes.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn options(&self) -> &KMeansOptions {
        &self.options
    }

    /// Label `data` by nearest centroid.
    pub fn predict(&self, centroids: &Dataset, data: &Dataset) -> ClusterResult<Vec<usize>> {
        let labels = self
            .client
            .kmeans_predict(centroids.tensor(), data.tensor())?;
        labels_to_host(&labels)
    }
}

impl Clusterer for KMeans {
    fn fit(&self, data: &Dataset) -> ClusterResult<ClusteringResult> {
        let r = self.client.kmeans(data.tensor(), &self.options, &self.cancel)?;
        ClusteringResult::from_tensors(&r.labels, &r.centroids, r.inertia, r.n_iter, r.converged)
    }
}
