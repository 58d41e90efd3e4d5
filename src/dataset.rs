//! Fixed-dimension feature vectors backed by a numr tensor.
//!
//! A [`Dataset`] owns an `[n, d]` F64 [`Tensor`] on the CPU runtime, which is
//! what the clustering kernels consume, plus a row-major host copy so point
//! `i` is available as the slice `values[i * dim..(i + 1) * dim]` for the
//! scalar neighbor-search code. Pixel data is stored in scan order; the order
//! only matters when labels are mapped back to pixels.

use numr::dtype::DType;
use numr::runtime::cpu::{CpuDevice, CpuRuntime};
use numr::tensor::Tensor;

use crate::error::{ClusterError, ClusterResult};

/// `len()` vectors, each `dim()` values long.
#[derive(Debug, Clone)]
pub struct Dataset {
    values: Vec<f64>,
    dim: usize,
    tensor: Tensor<CpuRuntime>,
}

impl Dataset {
    /// Build a dataset from a flat row-major buffer.
    pub fn from_flat(values: Vec<f64>, dim: usize) -> ClusterResult<Self> {
        if dim == 0 {
            return Err(ClusterError::invalid_parameter(
                "dim",
                "vector dimension must be > 0",
            ));
        }
        if values.len() % dim != 0 {
            return Err(ClusterError::DimensionMismatch {
                expected: dim,
                got: values.len() % dim,
                context: "Dataset::from_flat (trailing values)".to_string(),
            });
        }
        let n = values.len() / dim;
        let tensor = Tensor::<CpuRuntime>::from_slice(&values, &[n, dim], &CpuDevice::new())?;
        Ok(Self {
            values,
            dim,
            tensor,
        })
    }

    /// Build a dataset from equally sized rows.
    pub fn from_rows<T: AsRef<[f64]>>(rows: &[T]) -> ClusterResult<Self> {
        let first = rows.first().ok_or_else(|| ClusterError::EmptyDataset {
            context: "Dataset::from_rows".to_string(),
        })?;
        let dim = first.as_ref().len();
        let mut values = Vec::with_capacity(rows.len() * dim);
        for row in rows {
            let row = row.as_ref();
            if row.len() != dim {
                return Err(ClusterError::DimensionMismatch {
                    expected: dim,
                    got: row.len(),
                    context: "Dataset::from_rows".to_string(),
                });
            }
            values.extend_from_slice(row);
        }
        Self::from_flat(values, dim)
    }

    /// Build a 3-channel dataset from packed RGB bytes.
    pub fn from_rgb(bytes: &[u8]) -> ClusterResult<Self> {
        Self::from_pixels(bytes, 3)
    }

    /// Build a 3-channel dataset from packed RGBA bytes, dropping alpha.
    pub fn from_rgba(bytes: &[u8]) -> ClusterResult<Self> {
        Self::from_pixels(bytes, 4)
    }

    fn from_pixels(bytes: &[u8], stride: usize) -> ClusterResult<Self> {
        if bytes.len() % stride != 0 {
            return Err(ClusterError::DimensionMismatch {
                expected: stride,
                got: bytes.len() % stride,
                context: "Dataset::from_pixels (partial pixel)".to_string(),
            });
        }
        let values = bytes
            .chunks_exact(stride)
            .flat_map(|px| px[..3].iter().map(|&c| f64::from(c)))
            .collect();
        Self::from_flat(values, 3)
    }

    /// Copy a 2-D F64 tensor `[n, d]` into a dataset.
    pub fn from_tensor(tensor: &Tensor<CpuRuntime>) -> ClusterResult<Self> {
        let shape = tensor.shape();
        if shape.len() != 2 {
            return Err(ClusterError::DimensionMismatch {
                expected: 2,
                got: shape.len(),
                context: "Dataset::from_tensor (rank)".to_string(),
            });
        }
        if tensor.dtype() != DType::F64 {
            return Err(ClusterError::invalid_parameter(
                "tensor",
                format!("Dataset::from_tensor requires F64, got {:?}", tensor.dtype()),
            ));
        }
        let values = tensor.contiguous()?.try_to_vec::<f64>()?;
        Self::from_flat(values, shape[1])
    }

    /// Number of vectors.
    pub fn len(&self) -> usize {
        self.values.len() / self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Dimension of every vector.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The `[len, dim]` F64 tensor the clustering kernels run on.
    pub fn tensor(&self) -> &Tensor<CpuRuntime> {
        &self.tensor
    }

    /// The `i`-th vector.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.len()`.
    pub fn point(&self, i: usize) -> &[f64] {
        &self.values[i * self.dim..(i + 1) * self.dim]
    }

    /// Iterate over vectors in storage order.
    pub fn iter(&self) -> std::slice::ChunksExact<'_, f64> {
        self.values.chunks_exact(self.dim)
    }

    /// The underlying row-major host buffer.
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Borrowed host view of the rows.
    pub fn rows(&self) -> Rows<'_> {
        Rows::new(&self.values, self.dim)
    }
}

impl PartialEq for Dataset {
    fn eq(&self, other: &Self) -> bool {
        self.dim == other.dim && self.values == other.values
    }
}

/// Row-major host rows of fixed dimension, borrowed from a dataset or from a
/// tensor copied back to the host.
#[derive(Debug, Clone, Copy)]
pub struct Rows<'a> {
    values: &'a [f64],
    dim: usize,
}

impl<'a> Rows<'a> {
    /// `values.len()` must be a multiple of `dim` (> 0).
    pub fn new(values: &'a [f64], dim: usize) -> Self {
        debug_assert!(dim > 0 && values.len() % dim == 0);
        Self { values, dim }
    }

    pub fn len(&self) -> usize {
        self.values.len() / self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn point(&self, i: usize) -> &'a [f64] {
        &self.values[i * self.dim..(i + 1) * self.dim]
    }

    pub fn iter(&self) -> std::slice::ChunksExact<'a, f64> {
        self.values.chunks_exact(self.dim)
    }
}
