//! Generic cluster quality metrics: distortion and silhouette.

use numr::dtype::DType;
use numr::ops::{
    BinaryOps, CompareOps, ConditionalOps, DistanceMetric, DistanceOps, IndexingOps, ReduceOps,
    ScalarOps, TensorOps, TypeConversionOps,
};
use numr::runtime::{Runtime, RuntimeClient};
use numr::tensor::Tensor;
use rand::Rng;

use crate::cluster::traits::clusterer::{labels_to_host, labels_to_tensor};
use crate::cluster::validation::{validate_cluster_dtype, validate_count, validate_data_2d};
use crate::error::{ClusterError, ClusterResult};

fn validate_labels<R: Runtime<DType = DType>>(
    labels: &Tensor<R>,
    n: usize,
    op: &str,
) -> ClusterResult<()> {
    if labels.dtype() != DType::I64 {
        return Err(ClusterError::invalid_parameter(
            "labels",
            format!("{op} requires I64 labels, got {:?}", labels.dtype()),
        ));
    }
    if labels.shape() != [n] {
        return Err(ClusterError::DimensionMismatch {
            expected: n,
            got: labels.shape().first().copied().unwrap_or(0),
            context: format!("{op} (labels)"),
        });
    }
    Ok(())
}

/// Distortion: sum of squared distances from each point to its centroid.
pub fn inertia_impl<R, C>(
    client: &C,
    data: &Tensor<R>,
    labels: &Tensor<R>,
    centroids: &Tensor<R>,
) -> ClusterResult<f64>
where
    R: Runtime<DType = DType>,
    C: TensorOps<R> + RuntimeClient<R>,
{
    validate_cluster_dtype(data.dtype(), "inertia")?;
    validate_data_2d(data.shape(), "inertia")?;
    validate_labels(labels, data.shape()[0], "inertia")?;

    let assigned = client.index_select(centroids, 0, labels)?; // [n, d]
    let diff = client.sub(data, &assigned)?;
    let sq = client.mul(&diff, &diff)?;
    Ok(client.sum(&sq, &[0, 1], false)?.item()?)
}

/// Mean silhouette coefficient over at most `sample_limit` points.
///
/// When the dataset is larger than `sample_limit`, a subsample is drawn with
/// `rng` and distances are taken within the subsample only. Points alone in
/// their (sampled) cluster score 0, and a sample covering a single cluster
/// scores 0.
pub fn silhouette_score_impl<R, C, G>(
    client: &C,
    data: &Tensor<R>,
    labels: &Tensor<R>,
    sample_limit: usize,
    rng: &mut G,
) -> ClusterResult<f64>
where
    R: Runtime<DType = DType>,
    C: TensorOps<R> + ScalarOps<R> + CompareOps<R> + RuntimeClient<R>,
    G: Rng + ?Sized,
{
    validate_cluster_dtype(data.dtype(), "silhouette_score")?;
    validate_data_2d(data.shape(), "silhouette_score")?;
    validate_labels(labels, data.shape()[0], "silhouette_score")?;
    validate_count(sample_limit, "sample_limit")?;

    let n = data.shape()[0];
    let dtype = data.dtype();
    let device = data.device();

    let host_labels = labels_to_host(labels)?;
    let sample: Vec<usize> = if n > sample_limit {
        rand::seq::index::sample(rng, n, sample_limit).into_vec()
    } else {
        (0..n).collect()
    };
    let m = sample.len();
    if m < 2 {
        return Ok(0.0);
    }

    let n_clusters = host_labels.iter().max().map_or(0, |&l| l + 1);
    let mut present = vec![false; n_clusters];
    for &i in &sample {
        present[host_labels[i]] = true;
    }
    if present.iter().filter(|&&p| p).count() < 2 {
        return Ok(0.0);
    }

    let sample_idx = labels_to_tensor::<R>(&sample, device)?;
    let points = client.index_select(data, 0, &sample_idx)?; // [m, d]
    let labels_f = client.cast(&client.index_select(labels, 0, &sample_idx)?, dtype)?; // [m]

    let dists = client.cdist(&points, &points, DistanceMetric::Euclidean)?; // [m, m]

    // a: mean distance to the rest of the own cluster
    let labels_row = labels_f.unsqueeze(1)?; // [m, 1]
    let labels_col = labels_f.unsqueeze(0)?; // [1, m]
    let same = client.eq(&labels_row, &labels_col)?; // [m, m] 0/1
    let sum_same = client.sum(&client.mul(&dists, &same)?, &[1], false)?;
    let others = client.sub_scalar(&client.sum(&same, &[1], false)?, 1.0)?; // [m]
    let ones = Tensor::<R>::ones(&[m], dtype, device)?;
    let a = client.div(&sum_same, &client.maximum(&others, &ones)?)?;

    // b: smallest mean distance to another cluster present in the sample
    let inf = Tensor::<R>::full_scalar(&[m], dtype, f64::INFINITY, device)?;
    let mut b = inf.clone();
    for k in (0..n_clusters).filter(|&k| present[k]) {
        let k_tensor = Tensor::<R>::full_scalar(&[1], dtype, k as f64, device)?;
        let in_k_col = client.eq(&labels_col, &k_tensor)?; // [1, m]
        let sum_to_k = client.sum(&client.mul(&dists, &in_k_col)?, &[1], false)?;
        let count_k = client.sum(&in_k_col, &[1], false)?;
        let mean_to_k = client.div(&sum_to_k, &count_k)?; // [m]

        let in_k = client.eq(&labels_f, &k_tensor)?;
        let mean_to_k = client.where_cond(&in_k, &inf, &mean_to_k)?;
        b = client.minimum(&b, &mean_to_k)?;
    }

    let num = client.sub(&b, &a)?;
    let floor = Tensor::<R>::full_scalar(&[m], dtype, 1e-10, device)?;
    let den = client.maximum(&client.maximum(&a, &b)?, &floor)?;
    let s = client.div(&num, &den)?;

    // Singletons score 0
    let zeros = Tensor::<R>::zeros(&[m], dtype, device)?;
    let singleton = client.eq(&others, &zeros)?;
    let s = client.where_cond(&singleton, &zeros, &s)?;

    Ok(client.mean(&s, &[0], false)?.item()?)
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

    fn labels(values: &[usize], device: &CpuDevice) -> Tensor<CpuRuntime> {
        labels_to_tensor::<CpuRuntime>(values, device).unwrap()
    }

    fn two_blobs() -> Dataset {
        Dataset::from_rows(&[
            [0.0, 0.0],
            [0.0, 1.0],
            [1.0, 0.0],
            [50.0, 50.0],
            [50.0, 51.0],
            [51.0, 50.0],
        ])
        .unwrap()
    }

    fn score(data: &Dataset, assignment: &[usize]) -> f64 {
        let (client, device) = setup();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let labels = labels(assignment, &device);
        silhouette_score_impl(&client, data.tensor(), &labels, 1000, &mut rng).unwrap()
    }

    #[test]
    fn test_inertia() {
        let (client, device) = setup();
        let data = Dataset::from_rows(&[[0.0], [2.0], [10.0]]).unwrap();
        let centroids = Dataset::from_rows(&[[1.0], [10.0]]).unwrap();
        let labels = labels(&[0, 0, 1], &device);
        let value = inertia_impl(&client, data.tensor(), &labels, centroids.tensor()).unwrap();
        assert_eq!(value, 2.0);
    }

    #[test]
    fn test_inertia_rejects_label_count() {
        let (client, device) = setup();
        let data = Dataset::from_rows(&[[0.0], [2.0]]).unwrap();
        let labels = labels(&[0], &device);
        let err = inertia_impl(&client, data.tensor(), &labels, data.tensor()).unwrap_err();
        assert!(matches!(err, ClusterError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_silhouette_well_separated() {
        let s = score(&two_blobs(), &[0, 0, 0, 1, 1, 1]);
        assert!(s > 0.9, "score = {s}");
    }

    #[test]
    fn test_silhouette_bad_split_scores_lower() {
        let data = two_blobs();
        let good = score(&data, &[0, 0, 0, 1, 1, 1]);
        let bad = score(&data, &[0, 1, 0, 1, 0, 1]);
        assert!(bad < good);
    }

    #[test]
    fn test_silhouette_single_cluster() {
        assert_eq!(score(&two_blobs(), &[0; 6]), 0.0);
    }

    #[test]
    fn test_silhouette_singleton_scores_zero() {
        // Points 0..3 score ~1 each, the lone far point scores 0
        let data = Dataset::from_rows(&[[0.0], [0.0], [0.0], [100.0]]).unwrap();
        let s = score(&data, &[0, 0, 0, 1]);
        assert!((s - 0.75).abs() < 1e-9, "score = {s}");
    }

    #[test]
    fn test_silhouette_subsample_is_seeded() {
        let (client, device) = setup();
        let rows: Vec<[f64; 1]> = (0..40).map(|i| [(i % 2) as f64 * 100.0 + i as f64]).collect();
        let data = Dataset::from_rows(&rows).unwrap();
        let assignment: Vec<usize> = (0..40).map(|i| i % 2).collect();
        let labels = labels(&assignment, &device);
        let run = |seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            silhouette_score_impl(&client, data.tensor(), &labels, 10, &mut rng).unwrap()
        };
        assert_eq!(run(5), run(5));
    }
}
