//! Generic cluster-count selection.
//!
//! Candidate fits are produced by a caller-supplied closure and run in
//! parallel; scoring is a pure function of the fitted results.

use log::debug;
use numr::dtype::DType;
use numr::ops::{CompareOps, ScalarOps, TensorOps};
use numr::runtime::{Runtime, RuntimeClient};
use numr::tensor::Tensor;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::cluster::impl_generic::metrics::silhouette_score_impl;
use crate::cluster::traits::kmeans::KMeansResult;
use crate::cluster::traits::optimal_k::{KSearch, KSelection, OptimalKOptions};
use crate::cluster::validation::{validate_cluster_dtype, validate_count, validate_data_2d};
use crate::error::{ClusterError, ClusterResult};

/// Curvature of the distortion curve at each interior candidate.
///
/// For candidate `i`, the drop into it divided by the drop out of it:
/// `|(d[i-1] - d[i]) / (d[i] - d[i+1])|`. A zero denominator (flat tail) is
/// replaced by 1.
pub fn elbow_curvatures(distortions: &[f64]) -> Vec<f64> {
    distortions
        .windows(3)
        .map(|w| {
            let before = w[0] - w[1];
            let mut after = w[1] - w[2];
            if after == 0.0 {
                after = 1.0;
            }
            (before / after).abs()
        })
        .collect()
}

/// Candidate with maximal curvature. Falls back to the first candidate when
/// there are fewer than three candidates or no curvature is positive.
pub fn select_elbow(candidates: &[usize], distortions: &[f64]) -> (usize, Vec<(usize, f64)>) {
    let mut best_k = candidates[0];
    let mut best = 0.0;
    let mut curvatures = Vec::with_capacity(candidates.len().saturating_sub(2));
    for (i, c) in elbow_curvatures(distortions).into_iter().enumerate() {
        let k = candidates[i + 1];
        curvatures.push((k, c));
        if c > best {
            best = c;
            best_k = k;
        }
    }
    (best_k, curvatures)
}

/// Candidate with the highest score; ties go to the smaller k.
fn select_max(scores: &[(usize, f64)]) -> usize {
    let mut best = scores[0];
    for &(k, s) in &scores[1..] {
        if s > best.1 {
            best = (k, s);
        }
    }
    best.0
}

/// Generic cluster-count selection.
///
/// `fit(k)` must return the K-Means fit for `k` clusters; it is called once
/// per candidate, possibly from several threads. Candidates run from
/// `min_clusters` to `max_clusters`, both clamped to the number of points.
pub fn optimal_k_impl<R, C, F>(
    client: &C,
    data: &Tensor<R>,
    options: &OptimalKOptions,
    fit: F,
) -> ClusterResult<KSearch<R>>
where
    R: Runtime<DType = DType>,
    C: TensorOps<R> + ScalarOps<R> + CompareOps<R> + RuntimeClient<R>,
    F: Fn(usize) -> ClusterResult<KMeansResult<R>> + Sync,
    KMeansResult<R>: Send,
{
    validate_cluster_dtype(data.dtype(), "optimal_k")?;
    validate_data_2d(data.shape(), "optimal_k")?;
    let n = data.shape()[0];
    if options.min_clusters == 0 || options.max_clusters < options.min_clusters {
        return Err(ClusterError::InvalidClusterCount {
            k: options.min_clusters,
            n,
        });
    }
    if let KSelection::Silhouette { sample_limit } = options.method {
        validate_count(sample_limit, "sample_limit")?;
    }
    // Fewer points than min_clusters leaves k = n as the only candidate
    let min_k = options.min_clusters.min(n);
    let max_k = options.max_clusters.min(n);

    let candidates: Vec<usize> = (min_k..=max_k).collect();
    let mut fits = candidates
        .par_iter()
        .map(|&k| fit(k))
        .collect::<ClusterResult<Vec<_>>>()?;

    let (k, scores, curvatures) = match options.method {
        KSelection::Elbow => {
            let distortions: Vec<f64> = fits.iter().map(|r| r.inertia).collect();
            let (k, curvatures) = select_elbow(&candidates, &distortions);
            let scores = candidates.iter().copied().zip(distortions).collect();
            (k, scores, curvatures)
        }
        KSelection::Silhouette { sample_limit } => {
            let mut scores = Vec::with_capacity(candidates.len());
            for (&k, r) in candidates.iter().zip(&fits) {
                // Same subsample for every candidate
                let mut rng = ChaCha8Rng::seed_from_u64(options.kmeans.seed);
                let s = silhouette_score_impl(client, data, &r.labels, sample_limit, &mut rng)?;
                scores.push((k, s));
            }
            (select_max(&scores), scores, Vec::new())
        }
    };

    debug!("optimal_k: candidates {min_k}..={max_k}, selected k={k}");

    let result = fits.swap_remove(k - min_k);
    Ok(KSearch {
        k,
        scores,
        curvatures,
        result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elbow_curvatures() {
        let c = elbow_curvatures(&[100.0, 10.0, 8.0, 7.0]);
        assert_eq!(c, vec![45.0, 2.0]);
    }

    #[test]
    fn test_elbow_zero_denominator() {
        // Flat tail: denominator replaced by 1
        let c = elbow_curvatures(&[10.0, 4.0, 4.0]);
        assert_eq!(c, vec![6.0]);
    }

    #[test]
    fn test_select_elbow() {
        let (k, curvatures) = select_elbow(&[2, 3, 4, 5], &[100.0, 10.0, 8.0, 7.0]);
        assert_eq!(k, 3);
        assert_eq!(curvatures, vec![(3, 45.0), (4, 2.0)]);
    }

    #[test]
    fn test_select_elbow_defaults_to_first_candidate() {
        assert_eq!(select_elbow(&[2, 3], &[10.0, 5.0]).0, 2);
        assert_eq!(select_elbow(&[2, 3, 4], &[5.0, 5.0, 5.0]).0, 2);
    }

    #[test]
    fn test_select_max_prefers_smaller_k_on_tie() {
        assert_eq!(select_max(&[(2, 0.5), (3, 0.7), (4, 0.7)]), 3);
    }
}
