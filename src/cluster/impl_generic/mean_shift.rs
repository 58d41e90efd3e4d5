//! Generic Mean Shift clustering implementation.
//!
//! Flat kernel. Each seed climbs to a local density mode by repeatedly
//! replacing its estimate with the mean of the data points within
//! `bandwidth`. A converged estimate joins the first registered mode within
//! `bandwidth` of it, or registers a new mode. Registration order decides
//! mode positions: later arrivals merge into an existing mode without moving
//! it.
//!
//! Bandwidth estimation, bin-seeded labelling and inertia run on numr
//! tensors; the ascents walk host rows through a [`GridIndex`].

use std::cmp::Ordering;

use log::{debug, trace, warn};
use numr::dtype::DType;
use numr::ops::{BinaryOps, IndexingOps, ReduceOps, StatisticalOps, TensorOps, UnaryOps};
use numr::runtime::{Runtime, RuntimeClient};
use numr::tensor::Tensor;
use rand::Rng;

use crate::cancel::CancelToken;
use crate::cluster::impl_generic::grid::GridIndex;
use crate::cluster::impl_generic::metrics::inertia_impl;
use crate::cluster::traits::clusterer::labels_to_tensor;
use crate::cluster::traits::mean_shift::{MeanShiftOptions, MeanShiftResult, FALLBACK_BANDWIDTH};
use crate::cluster::validation::{
    validate_cluster_dtype, validate_count, validate_data_2d, validate_fraction,
    validate_positive, validate_tolerance,
};
use crate::dataset::Rows;
use crate::error::ClusterResult;
use crate::vector_math::{distance, mean_of_into, nearest_centroids};

/// Estimate a bandwidth from a bounded sample of point pairs.
///
/// When the dataset has at most `max_pairs` distinct pairs, every pair is
/// used; otherwise `max_pairs` random pairs of distinct indices are drawn.
/// The pair distances are read at `percentile` (lower interpolation). A
/// non-positive result is replaced by [`FALLBACK_BANDWIDTH`].
pub fn estimate_bandwidth_impl<R, C, G>(
    client: &C,
    data: &Tensor<R>,
    percentile: f64,
    max_pairs: usize,
    rng: &mut G,
) -> ClusterResult<f64>
where
    R: Runtime<DType = DType>,
    C: IndexingOps<R>
        + BinaryOps<R>
        + ReduceOps<R>
        + UnaryOps<R>
        + StatisticalOps<R>
        + RuntimeClient<R>,
    G: Rng + ?Sized,
{
    validate_cluster_dtype(data.dtype(), "estimate_bandwidth")?;
    validate_data_2d(data.shape(), "estimate_bandwidth")?;
    validate_fraction(percentile, "bandwidth_percentile")?;

    let n = data.shape()[0];
    if n < 2 || max_pairs == 0 {
        return Ok(FALLBACK_BANDWIDTH);
    }

    let all_pairs = n.saturating_mul(n - 1) / 2;
    let (left, right): (Vec<i64>, Vec<i64>) = if all_pairs <= max_pairs {
        (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i as i64, j as i64)))
            .unzip()
    } else {
        (0..max_pairs)
            .map(|_| {
                let i = rng.gen_range(0..n);
                let mut j = rng.gen_range(0..n - 1);
                if j >= i {
                    j += 1;
                }
                (i as i64, j as i64)
            })
            .unzip()
    };

    let device = data.device();
    let n_pairs = left.len();
    let left = Tensor::<R>::from_slice(&left, &[n_pairs], device)?;
    let right = Tensor::<R>::from_slice(&right, &[n_pairs], device)?;
    let a = client.index_select(data, 0, &left)?;
    let b = client.index_select(data, 0, &right)?;
    let diff = client.sub(&a, &b)?;
    let sq = client.mul(&diff, &diff)?;
    let dists = client.sqrt(&client.sum(&sq, &[1], false)?)?; // [n_pairs]

    let bandwidth: f64 = client
        .quantile(&dists, percentile, Some(0), false, "lower")?
        .item()?;
    if bandwidth > 0.0 && bandwidth.is_finite() {
        Ok(bandwidth)
    } else {
        debug!("mean_shift: degenerate bandwidth estimate {bandwidth}, using {FALLBACK_BANDWIDTH}");
        Ok(FALLBACK_BANDWIDTH)
    }
}

/// Mode ascents over host rows, with the modes registered so far.
struct ModeSearch<'a> {
    index: GridIndex<'a>,
    data: Rows<'a>,
    bandwidth: f64,
    options: &'a MeanShiftOptions,
    cancel: &'a CancelToken,
    neighbors: Vec<usize>,
    /// Row-major modes in registration order.
    modes: Vec<f64>,
    /// Longest single ascent.
    n_iter: usize,
    converged: bool,
}

impl<'a> ModeSearch<'a> {
    fn new(
        data: Rows<'a>,
        bandwidth: f64,
        options: &'a MeanShiftOptions,
        cancel: &'a CancelToken,
    ) -> Self {
        let index = GridIndex::build(data, bandwidth);
        trace!(
            "mean_shift: bandwidth {bandwidth}, {} cells, linear scan: {}",
            index.cells().count(),
            index.is_linear()
        );
        Self {
            index,
            data,
            bandwidth,
            options,
            cancel,
            neighbors: Vec::new(),
            modes: Vec::with_capacity(16 * data.dim()),
            n_iter: 0,
            converged: true,
        }
    }

    fn n_modes(&self) -> usize {
        self.modes.len() / self.data.dim()
    }

    /// Climb from `start` until an update moves the estimate at most
    /// `shift_epsilon`, or `max_iter` updates have run.
    fn ascend(&mut self, start: &[f64]) -> ClusterResult<Vec<f64>> {
        let mut estimate = start.to_vec();
        let mut next = vec![0.0; start.len()];

        for step in 1..=self.options.max_iter {
            self.cancel.check("mean_shift")?;

            self.index
                .radius_query(&estimate, self.bandwidth, &mut self.neighbors);
            if self.neighbors.is_empty() {
                // Nothing in range to pull the estimate anywhere
                self.n_iter = self.n_iter.max(step);
                return Ok(estimate);
            }
            mean_of_into(self.data, &self.neighbors, &mut next)?;
            let shift = distance(&estimate, &next);
            std::mem::swap(&mut estimate, &mut next);

            if shift <= self.options.shift_epsilon {
                self.n_iter = self.n_iter.max(step);
                return Ok(estimate);
            }
        }

        self.n_iter = self.n_iter.max(self.options.max_iter);
        self.converged = false;
        Ok(estimate)
    }

    /// First registered mode within `bandwidth` of `estimate`, else a new one.
    fn claim_mode(&mut self, estimate: &[f64]) -> usize {
        let dim = self.data.dim();
        if let Some(label) = self
            .modes
            .chunks_exact(dim)
            .position(|m| distance(m, estimate) <= self.bandwidth)
        {
            return label;
        }
        self.modes.extend_from_slice(estimate);
        self.n_modes() - 1
    }

    /// Ascend from every point in input order and label it by its mode.
    fn seed_from_points(&mut self) -> ClusterResult<Vec<usize>> {
        // Identical colors ascend identically, so each distinct value climbs once
        let first = first_occurrence(self.data);
        let mut labels = Vec::with_capacity(self.data.len());
        for (i, &f) in first.iter().enumerate() {
            if f != i {
                labels.push(labels[f]);
                continue;
            }
            let mode = self.ascend(self.data.point(i))?;
            labels.push(self.claim_mode(&mode));
        }
        Ok(labels)
    }

    /// Ascend from the mean of every grid bin holding at least
    /// `min_bin_freq` points. Returns false when no bin qualifies.
    fn seed_from_bins(&mut self) -> ClusterResult<bool> {
        let dim = self.data.dim();
        let mut seeds = Vec::new();
        let mut seed = vec![0.0; dim];
        for bucket in self.index.cells() {
            if bucket.len() < self.options.min_bin_freq {
                continue;
            }
            mean_of_into(self.data, bucket, &mut seed)?;
            seeds.extend_from_slice(&seed);
        }

        if seeds.is_empty() {
            warn!(
                "mean_shift: no bin holds min_bin_freq={} points, seeding from every point",
                self.options.min_bin_freq
            );
            return Ok(false);
        }

        for start in seeds.chunks_exact(dim) {
            let mode = self.ascend(start)?;
            self.claim_mode(&mode);
        }
        trace!(
            "mean_shift: {} bin seeds -> {} modes",
            seeds.len() / dim,
            self.n_modes()
        );
        Ok(true)
    }
}

fn bit_order(a: &[f64], b: &[f64]) -> Ordering {
    a.iter().map(|v| v.to_bits()).cmp(b.iter().map(|v| v.to_bits()))
}

/// For every row, the lowest index holding a bit-identical row.
fn first_occurrence(data: Rows<'_>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..data.len()).collect();
    // Stable, so equal rows stay in index order
    order.sort_by(|&a, &b| bit_order(data.point(a), data.point(b)));

    let mut first: Vec<usize> = (0..data.len()).collect();
    for pair in order.windows(2) {
        if bit_order(data.point(pair[0]), data.point(pair[1])).is_eq() {
            first[pair[1]] = first[pair[0]];
        }
    }
    first
}

/// Generic Mean Shift clustering implementation.
pub fn mean_shift_impl<R, C, G>(
    client: &C,
    data: &Tensor<R>,
    options: &MeanShiftOptions,
    rng: &mut G,
    cancel: &CancelToken,
) -> ClusterResult<MeanShiftResult<R>>
where
    R: Runtime<DType = DType>,
    C: TensorOps<R> + RuntimeClient<R>,
    G: Rng + ?Sized,
{
    validate_cluster_dtype(data.dtype(), "mean_shift")?;
    validate_data_2d(data.shape(), "mean_shift")?;
    validate_tolerance(options.shift_epsilon, "shift_epsilon")?;
    validate_fraction(options.bandwidth_percentile, "bandwidth_percentile")?;
    validate_count(options.max_iter, "max_iter")?;
    if let Some(b) = options.bandwidth {
        validate_positive(b, "bandwidth")?;
    } else {
        validate_count(options.neighbor_subsample_limit, "neighbor_subsample_limit")?;
    }

    let n = data.shape()[0];
    let d = data.shape()[1];
    let device = data.device();

    let bandwidth = match options.bandwidth {
        Some(b) => b,
        None => estimate_bandwidth_impl(
            client,
            data,
            options.bandwidth_percentile,
            options.neighbor_subsample_limit,
            rng,
        )?,
    };

    let host = data.contiguous()?.try_to_vec::<f64>()?;
    let mut search = ModeSearch::new(Rows::new(&host, d), bandwidth, options, cancel);

    let bin_seeded = options.bin_seeding && search.seed_from_bins()?;
    let point_labels = if bin_seeded {
        None
    } else {
        Some(search.seed_from_points()?)
    };

    if !search.converged {
        warn!(
            "mean_shift: some ascents hit max_iter={} before moving <= {}",
            options.max_iter, options.shift_epsilon
        );
    }

    let n_modes = search.n_modes();
    let cluster_centers = Tensor::<R>::from_slice(&search.modes, &[n_modes, d], device)?;
    let labels = match point_labels {
        Some(labels) => labels_to_tensor::<R>(&labels, device)?,
        // Every point takes the label of its nearest mode
        None => nearest_centroids(client, data, &cluster_centers)?.0,
    };

    let inertia = inertia_impl(client, data, &labels, &cluster_centers)?;
    debug!(
        "mean_shift: n={} bandwidth={:.3} modes={} inertia={:.3} longest ascent={}",
        n, bandwidth, n_modes, inertia, search.n_iter
    );

    Ok(MeanShiftResult {
        labels,
        cluster_centers,
        inertia,
        n_iter: search.n_iter,
        converged: search.converged,
        bandwidth,
    })
}
