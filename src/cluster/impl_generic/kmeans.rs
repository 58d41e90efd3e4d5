//! Generic K-Means clustering implementation.
//!
//! K-Means++ (or random / user) seeding followed by Lloyd iteration on numr
//! tensors. All randomness comes from the caller's generator, so a seeded
//! generator makes the whole run reproducible.

use log::{debug, trace};
use numr::dtype::DType;
use numr::ops::{
    BinaryOps, CompareOps, ConditionalOps, CumulativeOps, DistanceMetric, DistanceOps,
    IndexingOps, ReduceOps, ScatterReduceOp, ShapeOps, TypeConversionOps,
};
use numr::runtime::{Runtime, RuntimeClient};
use numr::tensor::Tensor;
use rand::Rng;

use crate::cancel::CancelToken;
use crate::cluster::traits::kmeans::{ConvergenceMode, KMeansInit, KMeansOptions, KMeansResult};
use crate::cluster::validation::{
    validate_cluster_dtype, validate_count, validate_data_2d, validate_n_clusters,
    validate_same_dim, validate_tolerance,
};
use crate::error::{ClusterError, ClusterResult};
use crate::vector_math::nearest_centroids;

/// K-Means++ initialization: pick centroids with probability proportional to D^2.
fn kmeans_plusplus_init<R, C, G>(
    client: &C,
    data: &Tensor<R>,
    k: usize,
    rng: &mut G,
) -> ClusterResult<Tensor<R>>
where
    R: Runtime<DType = DType>,
    C: DistanceOps<R>
        + IndexingOps<R>
        + ReduceOps<R>
        + CumulativeOps<R>
        + CompareOps<R>
        + ShapeOps<R>
        + RuntimeClient<R>,
    G: Rng + ?Sized,
{
    let n = data.shape()[0];
    let device = data.device();

    let first = rng.gen_range(0..n);
    let idx = Tensor::<R>::from_slice(&[first as i64], &[1], device)?;
    let mut centroids = client.index_select(data, 0, &idx)?;

    for _ in 1..k {
        // Squared distance from each point to its nearest chosen centroid
        let dists = client.cdist(data, &centroids, DistanceMetric::SquaredEuclidean)?;
        let min_dists = client.min(&dists, &[1], false)?;
        let cum_weights = client.cumsum(&min_dists, 0)?;
        let total: f64 = cum_weights.narrow(0, n - 1, 1)?.item()?;

        let next = if total > 0.0 && total.is_finite() {
            let threshold = rng.gen::<f64>() * total;
            sample_cumulative(client, &cum_weights, threshold)?
        } else {
            // Every point already coincides with a centroid
            rng.gen_range(0..n)
        };

        let idx = Tensor::<R>::from_slice(&[next as i64], &[1], device)?;
        let next_centroid = client.index_select(data, 0, &idx)?;
        centroids = client.cat(&[&centroids, &next_centroid], 0)?;
    }

    Ok(centroids)
}

/// Inverse-CDF sampling over running weight sums [n]: first index whose sum
/// exceeds `threshold`. The sum does not move across zero-weight entries, so
/// they are never returned unless all weights are zero.
fn sample_cumulative<R, C>(
    client: &C,
    cum_weights: &Tensor<R>,
    threshold: f64,
) -> ClusterResult<usize>
where
    R: Runtime<DType = DType>,
    C: IndexingOps<R> + ReduceOps<R> + CompareOps<R> + RuntimeClient<R>,
{
    let threshold =
        Tensor::<R>::full_scalar(&[1], cum_weights.dtype(), threshold, cum_weights.device())?;
    let above = client.gt(cum_weights, &threshold)?;
    let any_above: f64 = client.max(&above, &[0], false)?.item()?;

    let idx = if any_above > 0.0 {
        // argmax on a 0/1 mask gives the first 1
        client.argmax(&above, 0, false)?
    } else {
        // Rounding left the threshold at the total: the first index reaching
        // the total is the last one with positive weight
        client.argmax(cum_weights, 0, false)?
    };
    let idx: i64 = idx.item()?;
    Ok(idx as usize)
}

/// Random initialization: pick k distinct data points.
fn random_init<R, C, G>(
    client: &C,
    data: &Tensor<R>,
    k: usize,
    rng: &mut G,
) -> ClusterResult<Tensor<R>>
where
    R: Runtime<DType = DType>,
    C: IndexingOps<R> + RuntimeClient<R>,
    G: Rng + ?Sized,
{
    let indices: Vec<i64> = rand::seq::index::sample(rng, data.shape()[0], k)
        .into_iter()
        .map(|i| i as i64)
        .collect();
    let indices = Tensor::<R>::from_slice(&indices, &[k], data.device())?;
    Ok(client.index_select(data, 0, &indices)?)
}

/// Number of positions where two I64 label vectors differ.
fn count_changed<R, C>(client: &C, labels: &Tensor<R>, prev: &Tensor<R>) -> ClusterResult<usize>
where
    R: Runtime<DType = DType>,
    C: CompareOps<R> + TypeConversionOps<R> + ReduceOps<R> + RuntimeClient<R>,
{
    let changed = client.ne(labels, prev)?;
    let changed = client.cast(&changed, DType::F64)?;
    let changed: f64 = client.sum(&changed, &[0], false)?.item()?;
    Ok(changed as usize)
}

/// Recompute each centroid as the mean of its points. Clusters with no
/// points keep their previous centroid. Returns the new centroids and the
/// number of empty clusters.
fn update_centroids<R, C>(
    client: &C,
    data: &Tensor<R>,
    labels: &Tensor<R>,
    centroids: &Tensor<R>,
) -> ClusterResult<(Tensor<R>, usize)>
where
    R: Runtime<DType = DType>,
    C: IndexingOps<R>
        + ReduceOps<R>
        + BinaryOps<R>
        + TypeConversionOps<R>
        + ConditionalOps<R>
        + CompareOps<R>
        + RuntimeClient<R>,
{
    let n = data.shape()[0];
    let k = centroids.shape()[0];
    let d = data.shape()[1];
    let dtype = data.dtype();
    let device = data.device();

    // Per-cluster coordinate sums via scatter_reduce
    let labels_expanded = labels.unsqueeze(1)?.broadcast_to(&[n, d])?;
    let dst = Tensor::<R>::zeros(&[k, d], dtype, device)?;
    let sums = client.scatter_reduce(
        &dst,
        0,
        &labels_expanded,
        data,
        ScatterReduceOp::Sum,
        false,
    )?;

    // Count points per cluster; avoid division by zero
    let counts = client.bincount(labels, None, k)?; // [k] I64
    let counts = client.cast(&counts, dtype)?;
    let zeros = Tensor::<R>::zeros(&[k], dtype, device)?;
    let ones = Tensor::<R>::ones(&[k], dtype, device)?;
    let is_zero = client.eq(&counts, &zeros)?;
    let safe_counts = client.where_cond(&is_zero, &ones, &counts)?;
    let safe_counts = safe_counts.unsqueeze(1)?.broadcast_to(&[k, d])?;
    let means = client.div(&sums, &safe_counts)?;

    let is_zero_expanded = is_zero.unsqueeze(1)?.broadcast_to(&[k, d])?;
    let updated = client.where_cond(&is_zero_expanded, centroids, &means)?;

    let empty: f64 = client.sum(&is_zero, &[0], false)?.item()?;
    Ok((updated, empty as usize))
}

/// Run a single K-Means trial (one initialization).
fn kmeans_single<R, C>(
    client: &C,
    data: &Tensor<R>,
    initial_centroids: Tensor<R>,
    max_iter: usize,
    convergence: ConvergenceMode,
    cancel: &CancelToken,
) -> ClusterResult<KMeansResult<R>>
where
    R: Runtime<DType = DType>,
    C: DistanceOps<R>
        + IndexingOps<R>
        + ReduceOps<R>
        + BinaryOps<R>
        + TypeConversionOps<R>
        + ConditionalOps<R>
        + CompareOps<R>
        + RuntimeClient<R>,
{
    let n = data.shape()[0];
    let mut centroids = initial_centroids;
    // No point starts in a cluster, so the first pass always counts as a change
    let mut labels = Tensor::<R>::full_scalar(&[n], DType::I64, -1.0, data.device())?;
    let mut inertia = f64::INFINITY;
    let mut prev_inertia = f64::INFINITY;
    let mut n_iter = 0;
    let mut converged = false;

    for i in 0..max_iter {
        cancel.check("kmeans")?;

        let (new_labels, min_dists) = nearest_centroids(client, data, &centroids)?;
        let changed = count_changed(client, &new_labels, &labels)?;
        labels = new_labels;
        inertia = client.sum(&min_dists, &[0], false)?.item()?;
        n_iter = i + 1;
        trace!("kmeans iter {n_iter}: {changed} labels changed, inertia {inertia}");

        let stable = match convergence {
            ConvergenceMode::AssignmentStable => changed == 0,
            ConvergenceMode::InertiaDelta { tol } => (prev_inertia - inertia).abs() < tol,
        };
        if stable {
            converged = true;
            break;
        }

        let (updated, empty) = update_centroids(client, data, &labels, &centroids)?;
        if empty > 0 {
            trace!("kmeans iter {n_iter}: {empty} empty clusters kept in place");
        }
        centroids = updated;
        prev_inertia = inertia;
    }

    if !converged {
        // The cap fell right after an update; relabel against the final centroids
        let (final_labels, min_dists) = nearest_centroids(client, data, &centroids)?;
        labels = final_labels;
        inertia = client.sum(&min_dists, &[0], false)?.item()?;
    }

    Ok(KMeansResult {
        centroids,
        labels,
        inertia,
        n_iter,
        converged,
    })
}

/// Generic K-Means implementation.
pub fn kmeans_impl<R, C, G>(
    client: &C,
    data: &Tensor<R>,
    options: &KMeansOptions,
    rng: &mut G,
    cancel: &CancelToken,
) -> ClusterResult<KMeansResult<R>>
where
    R: Runtime<DType = DType>,
    C: DistanceOps<R>
        + IndexingOps<R>
        + ReduceOps<R>
        + BinaryOps<R>
        + TypeConversionOps<R>
        + CumulativeOps<R>
        + ConditionalOps<R>
        + CompareOps<R>
        + ShapeOps<R>
        + RuntimeClient<R>,
    G: Rng + ?Sized,
{
    validate_cluster_dtype(data.dtype(), "kmeans")?;
    validate_data_2d(data.shape(), "kmeans")?;
    let n = data.shape()[0];
    let d = data.shape()[1];
    validate_n_clusters(options.n_clusters, n)?;
    validate_count(options.max_iter, "max_iter")?;
    validate_count(options.n_init, "n_init")?;
    if let ConvergenceMode::InertiaDelta { tol } = options.convergence {
        validate_tolerance(tol, "tol")?;
    }

    let k = options.n_clusters;

    let n_init = match &options.init {
        KMeansInit::Points(pts) => {
            validate_same_dim(d, pts.dim(), "kmeans init points")?;
            if pts.len() != k {
                return Err(ClusterError::DimensionMismatch {
                    expected: k,
                    got: pts.len(),
                    context: "kmeans init points (rows)".to_string(),
                });
            }
            1 // User-provided init, only run once
        }
        _ => options.n_init,
    };

    let mut best_result: Option<KMeansResult<R>> = None;

    for _ in 0..n_init {
        let initial_centroids = match &options.init {
            KMeansInit::KMeansPlusPlus => kmeans_plusplus_init(client, data, k, rng)?,
            KMeansInit::Random => random_init(client, data, k, rng)?,
            KMeansInit::Points(pts) => {
                Tensor::<R>::from_slice(pts.as_slice(), &[k, d], data.device())?
            }
        };

        let result = kmeans_single(
            client,
            data,
            initial_centroids,
            options.max_iter,
            options.convergence,
            cancel,
        )?;

        let better = best_result
            .as_ref()
            .map_or(true, |best| result.inertia < best.inertia);
        if better {
            best_result = Some(result);
        }
    }

    let result = best_result.ok_or_else(|| {
        ClusterError::invalid_parameter("n_init", "kmeans: n_init must be > 0")
    })?;
    debug!(
        "kmeans: k={} n={} inertia={:.3} iterations={} converged={}",
        k, n, result.inertia, result.n_iter, result.converged
    );
    Ok(result)
}

/// Predict cluster assignments for new data given centroids.
pub fn kmeans_predict_impl<R, C>(
    client: &C,
    centroids: &Tensor<R>,
    data: &Tensor<R>,
) -> ClusterResult<Tensor<R>>
where
    R: Runtime<DType = DType>,
    C: DistanceOps<R> + IndexingOps<R> + ReduceOps<R> + RuntimeClient<R>,
{
    validate_cluster_dtype(centroids.dtype(), "kmeans_predict")?;
    validate_cluster_dtype(data.dtype(), "kmeans_predict")?;
    validate_data_2d(centroids.shape(), "kmeans_predict")?;
    if data.shape().len() != 2 {
        return Err(ClusterError::DimensionMismatch {
            expected: 2,
            got: data.shape().len(),
            context: "kmeans_predict (data rank)".to_string(),
        });
    }
    validate_same_dim(centroids.shape()[1], data.shape()[1], "kmeans_predict")?;

    if data.shape()[0] == 0 {
        return Ok(Tensor::<R>::zeros(&[0], DType::I64, data.device())?);
    }
    let (labels, _) = nearest_centroids(client, data, centroids)?;
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use numr::runtime::cpu::{CpuClient, CpuDevice, CpuRuntime};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn setup() -> (CpuClient, CpuDevice) {
        let device = CpuDevice::new();
        let client = CpuClient::new(device.clone());
        (client, device)
    }

    fn host(t: &Tensor<CpuRuntime>) -> Vec<f64> {
        t.contiguous().unwrap().try_to_vec().unwrap()
    }

    #[test]
    fn test_sample_cumulative() {
        let (client, device) = setup();
        let weights =
            Tensor::<CpuRuntime>::from_slice(&[0.0, 1.0, 0.0, 3.0], &[4], &device).unwrap();
        let cum = client.cumsum(&weights, 0).unwrap();
        assert_eq!(sample_cumulative(&client, &cum, 0.0).unwrap(), 1);
        assert_eq!(sample_cumulative(&client, &cum, 0.99).unwrap(), 1);
        assert_eq!(sample_cumulative(&client, &cum, 1.0).unwrap(), 3);
        assert_eq!(sample_cumulative(&client, &cum, 3.99).unwrap(), 3);
        // Threshold at the total never selects a zero-weight index
        assert_eq!(sample_cumulative(&client, &cum, 4.0).unwrap(), 3);
    }

    #[test]
    fn test_plusplus_picks_distinct_points() {
        let (client, _) = setup();
        let data = Dataset::from_rows(&[[0.0], [0.0], [10.0], [20.0]]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let centroids = kmeans_plusplus_init(&client, data.tensor(), 3, &mut rng).unwrap();
        assert_eq!(centroids.shape(), &[3, 1]);
        let mut picked = host(&centroids);
        picked.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(picked, vec![0.0, 10.0, 20.0]);
    }

    #[test]
    fn test_plusplus_all_identical() {
        let (client, _) = setup();
        let data = Dataset::from_rows(&[[5.0, 5.0]; 4]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let centroids = kmeans_plusplus_init(&client, data.tensor(), 3, &mut rng).unwrap();
        assert_eq!(centroids.shape(), &[3, 2]);
        assert!(host(&centroids).iter().all(|&v| v == 5.0));
    }

    #[test]
    fn test_random_init_distinct_rows() {
        let (client, _) = setup();
        let data = Dataset::from_rows(&[[0.0], [1.0], [2.0], [3.0], [4.0]]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let centroids = random_init(&client, data.tensor(), 5, &mut rng).unwrap();
        let mut picked = host(&centroids);
        picked.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(picked, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_update_keeps_empty_cluster() {
        let (client, device) = setup();
        let data = Dataset::from_rows(&[[0.0], [2.0]]).unwrap();
        let centroids = Tensor::<CpuRuntime>::from_slice(&[1.0, 99.0], &[2, 1], &device).unwrap();
        let labels = Tensor::<CpuRuntime>::from_slice(&[0i64, 0], &[2], &device).unwrap();
        let (updated, empty) =
            update_centroids(&client, data.tensor(), &labels, &centroids).unwrap();
        assert_eq!(empty, 1);
        assert_eq!(host(&updated), vec![1.0, 99.0]);
    }

    #[test]
    fn test_update_moves_to_mean() {
        let (client, device) = setup();
        let data = Dataset::from_rows(&[[0.0, 0.0], [2.0, 4.0], [10.0, 10.0]]).unwrap();
        let centroids =
            Tensor::<CpuRuntime>::from_slice(&[0.0, 0.0, 0.0, 0.0], &[2, 2], &device).unwrap();
        let labels = Tensor::<CpuRuntime>::from_slice(&[0i64, 0, 1], &[3], &device).unwrap();
        let (updated, empty) =
            update_centroids(&client, data.tensor(), &labels, &centroids).unwrap();
        assert_eq!(empty, 0);
        assert_eq!(host(&updated), vec![1.0, 2.0, 10.0, 10.0]);
    }

    #[test]
    fn test_count_changed() {
        let (client, device) = setup();
        let prev = Tensor::<CpuRuntime>::full_scalar(&[3], DType::I64, -1.0, &device).unwrap();
        let labels = Tensor::<CpuRuntime>::from_slice(&[0i64, 1, 1], &[3], &device).unwrap();
        assert_eq!(count_changed(&client, &labels, &prev).unwrap(), 3);
        let next = Tensor::<CpuRuntime>::from_slice(&[0i64, 0, 1], &[3], &device).unwrap();
        assert_eq!(count_changed(&client, &next, &labels).unwrap(), 1);
        assert_eq!(count_changed(&client, &labels, &labels).unwrap(), 0);
    }
}
