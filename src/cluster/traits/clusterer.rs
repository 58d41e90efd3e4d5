//! Common clustering capability shared by every engine.

use numr::dtype::DType;
use numr::runtime::cpu::CpuRuntime;
use numr::runtime::Runtime;
use numr::tensor::Tensor;

use crate::dataset::Dataset;
use crate::error::{ClusterError, ClusterResult};

/// Labels and centroids produced by a fit.
///
/// `labels[i]` indexes a row of `centroids` for every input point `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusteringResult {
    /// Cluster index for each input point, in input order.
    pub labels: Vec<usize>,
    /// Cluster representatives (means for K-Means, modes for Mean Shift).
    pub centroids: Dataset,
    /// Sum of squared distances from each point to its centroid.
    pub inertia: f64,
    /// Number of iterations run. For Mean Shift, the longest single ascent.
    pub n_iter: usize,
    /// False when an iteration cap was hit before the convergence criterion.
    pub converged: bool,
}

impl ClusteringResult {
    /// Host copy of a fit produced on the CPU runtime.
    pub(crate) fn from_tensors(
        labels: &Tensor<CpuRuntime>,
        centroids: &Tensor<CpuRuntime>,
        inertia: f64,
        n_iter: usize,
        converged: bool,
    ) -> ClusterResult<Self> {
        Ok(Self {
            labels: labels_to_host(labels)?,
            centroids: Dataset::from_tensor(centroids)?,
            inertia,
            n_iter,
            converged,
        })
    }

    pub fn n_clusters(&self) -> usize {
        self.centroids.len()
    }

    /// Representative vector of `label`.
    pub fn centroid(&self, label: usize) -> &[f64] {
        self.centroids.point(label)
    }

    /// Number of points assigned to each cluster.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_clusters()];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        sizes
    }
}

/// A clustering algorithm: a pure function of `(data, options)`.
pub trait Clusterer {
    /// Cluster `data` [n, d].
    fn fit(&self, data: &Dataset) -> ClusterResult<ClusteringResult>;
}

/// Copy I64 labels [n] back to the host.
pub fn labels_to_host<R: Runtime>(labels: &Tensor<R>) -> ClusterResult<Vec<usize>> {
    labels
        .contiguous()?
        .try_to_vec::<i64>()?
        .into_iter()
        .map(|l| {
            usize::try_from(l).map_err(|_| {
                ClusterError::invalid_parameter("labels", format!("negative label {l}"))
            })
        })
        .collect()
}

/// Upload host labels as an I64 tensor [n].
pub fn labels_to_tensor<R>(labels: &[usize], device: &R::Device) -> ClusterResult<Tensor<R>>
where
    R: Runtime<DType = DType>,
{
    let labels: Vec<i64> = labels.iter().map(|&l| l as i64).collect();
    Ok(Tensor::<R>::from_slice(&labels, &[labels.len()], device)?)
}
