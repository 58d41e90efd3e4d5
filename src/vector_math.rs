//! Distance and mean computations over fixed-dimension vectors.
//!
//! Everything is computed in `f64` so integer color channels do not pick up
//! truncation bias across iterations. The slice kernels serve the scalar
//! neighbor search; whole-dataset assignment goes through numr.

use numr::ops::{DistanceMetric, DistanceOps, IndexingOps, ReduceOps};
use numr::runtime::{Runtime, RuntimeClient};
use numr::tensor::Tensor;

use crate::dataset::Rows;
use crate::error::{ClusterError, ClusterResult};

/// Squared Euclidean distance. Slices must have equal length.
#[inline]
pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Euclidean distance. Slices must have equal length.
#[inline]
pub fn distance(a: &[f64], b: &[f64]) -> f64 {
    squared_distance(a, b).sqrt()
}

/// Component-wise arithmetic mean of a non-empty set of vectors.
pub fn mean<'a, I>(points: I) -> ClusterResult<Vec<f64>>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let mut points = points.into_iter();
    let first = points.next().ok_or_else(|| ClusterError::EmptySet {
        context: "mean".to_string(),
    })?;
    let mut acc = first.to_vec();
    let mut count = 1usize;
    for p in points {
        if p.len() != acc.len() {
            return Err(ClusterError::DimensionMismatch {
                expected: acc.len(),
                got: p.len(),
                context: "mean".to_string(),
            });
        }
        for (a, &v) in acc.iter_mut().zip(p) {
            *a += v;
        }
        count += 1;
    }
    let inv = 1.0 / count as f64;
    acc.iter_mut().for_each(|a| *a *= inv);
    Ok(acc)
}

/// Mean of the rows named by `indices`, written into `out`.
pub fn mean_of_into(data: Rows<'_>, indices: &[usize], out: &mut [f64]) -> ClusterResult<()> {
    if indices.is_empty() {
        return Err(ClusterError::EmptySet {
            context: "mean_of".to_string(),
        });
    }
    out.iter_mut().for_each(|o| *o = 0.0);
    for &i in indices {
        for (o, &v) in out.iter_mut().zip(data.point(i)) {
            *o += v;
        }
    }
    let inv = 1.0 / indices.len() as f64;
    out.iter_mut().for_each(|o| *o *= inv);
    Ok(())
}

/// Nearest centroid for every row of `data` [n, d].
///
/// Returns the I64 labels [n] and the squared distances to the chosen
/// centroids [n]. Ties go to the lowest centroid index.
pub fn nearest_centroids<R, C>(
    client: &C,
    data: &Tensor<R>,
    centroids: &Tensor<R>,
) -> ClusterResult<(Tensor<R>, Tensor<R>)>
where
    R: Runtime,
    C: DistanceOps<R> + IndexingOps<R> + ReduceOps<R> + RuntimeClient<R>,
{
    let dists = client.cdist(data, centroids, DistanceMetric::SquaredEuclidean)?; // [n, k]
    let labels = client.argmin(&dists, 1, false)?;
    let min_dists = client.min(&dists, &[1], false)?;
    Ok((labels, min_dists))
}
