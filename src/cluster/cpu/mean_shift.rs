//! CPU implementation of Mean Shift clustering.

use numr::runtime::cpu::{CpuClient, CpuDevice, CpuRuntime};
use numr::tensor::Tensor;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::cancel::CancelToken;
use crate::cluster::impl_generic::{estimate_bandwidth_impl, mean_shift_impl};
use crate::cluster::traits::clusterer::{Clusterer, ClusteringResult};
use crate::cluster::traits::mean_shift::{MeanShiftAlgorithms, MeanShiftOptions, MeanShiftResult};
use crate::dataset::Dataset;
use crate::error::ClusterResult;

impl MeanShiftAlgorithms<CpuRuntime> for CpuClient {
    fn mean_shift(
        &self,
        data: &Tensor<CpuRuntime>,
        options: &MeanShiftOptions,
        cancel: &CancelToken,
    ) -> ClusterResult<MeanShiftResult<CpuRuntime>> {
        let mut rng = ChaCha8Rng::seed_from_u64(options.seed);
        mean_shift_impl(self, data, options, &mut rng, cancel)
    }

    fn estimate_bandwidth(
        &self,
        data: &Tensor<CpuRuntime>,
        percentile: f64,
        max_pairs: usize,
        seed: u64,
    ) -> ClusterResult<f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        estimate_bandwidth_impl(self, data, percentile, max_pairs, &mut rng)
    }
}

/// Mean Shift engine with a flat kernel and grid-accelerated neighbor search.
#[derive(Debug, Clone)]
pub struct MeanShift {
    options: MeanShiftOptions,
    cancel: CancelToken,
    client: CpuClient,
}

impl Default for MeanShift {
    fn default() -> Self {
        Self::new(MeanShiftOptions::default())
    }
}

impl MeanShift {
    pub fn new(options: MeanShiftOptions) -> Self {
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

    pub fn options(&self) -> &MeanShiftOptions {
        &self.options
    }
}

impl Clusterer for MeanShift {
    fn fit(&self, data: &Dataset) -> ClusterResult<ClusteringResult> {
        let r = self
            .client
            .mean_shift(data.tensor(), &self.options, &self.cancel)?;
        ClusteringResult::from_tensors(
            &r.labels,
            &r.cluster_centers,
            r.inertia,
            r.n_iter,
            r.converged,
        )
    }
}
