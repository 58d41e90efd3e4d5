//! CPU implementation of cluster-count selection.

use numr::runtime::cpu::{CpuClient, CpuDevice};

use crate::cancel::CancelToken;
use crate::cluster::impl_generic::optimal_k_impl;
use crate::cluster::traits::clusterer::ClusteringResult;
use crate::cluster::traits::kmeans::{KMeansAlgorithms, KMeansOptions};
use crate::cluster::traits::optimal_k::{OptimalKOptions, OptimalKReport};
use crate::dataset::Dataset;
use crate::error::ClusterResult;

/// Picks k by running K-Means over a candidate range and scoring each fit.
#[derive(Debug, Clone)]
pub struct OptimalK {
    options: OptimalKOptions,
    cancel: CancelToken,
    client: CpuClient,
}

impl Default for OptimalK {
    fn default() -> Self {
        Self::new(OptimalKOptions::default())
    }
}

impl OptimalK {
    pub fn new(options: OptimalKOptions) -> Self {
        Self {
            options,
            cancel: CancelToken::default(),
            client: CpuClient::new(CpuDevice::new()),
        }
    }

    /// Shared by every candidate fit.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn options(&self) -> &OptimalKOptions {
        &self.options
    }

    /// Run the candidate fits and select k.
    pub fn select_k(&self, data: &Dataset) -> ClusterResult<OptimalKReport> {
        let search = optimal_k_impl(&self.client, data.tensor(), &self.options, |k| {
            let options = KMeansOptions {
                n_clusters: k,
                ..self.options.kmeans.clone()
            };
            self.client.kmeans(data.tensor(), &options, &self.cancel)
        })?;

        let r = &search.result;
        let result =
            ClusteringResult::from_tensors(&r.labels, &r.centroids, r.inertia, r.n_iter, r.converged)?;
        Ok(OptimalKReport {
            k: search.k,
            scores: search.scores,
            curvatures: search.curvatures,
            result,
        })
    }
}
