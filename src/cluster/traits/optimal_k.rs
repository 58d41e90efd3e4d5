//! Automatic cluster-count selection options.

use numr::runtime::Runtime;

use super::clusterer::ClusteringResult;
use super::kmeans::{KMeansOptions, KMeansResult};

/// Scoring rule used to rank candidate cluster counts.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum KSelection {
    /// Maximal curvature of the distortion curve (default).
    #[default]
    Elbow,
    /// Highest mean silhouette coefficient over a seeded subsample.
    Silhouette { sample_limit: usize },
}

/// Options for cluster-count selection.
#[derive(Debug, Clone)]
pub struct OptimalKOptions {
    /// Smallest candidate k.
    pub min_clusters: usize,
    /// Largest candidate k. Both bounds are clamped to the number of points.
    pub max_clusters: usize,
    /// Scoring rule.
    pub method: KSelection,
    /// K-Means settings for each candidate; `n_clusters` is overridden.
    pub kmeans: KMeansOptions,
}

impl Default for OptimalKOptions {
    fn default() -> Self {
        Self {
            min_clusters: 2,
            max_clusters: 10,
            method: KSelection::Elbow,
            kmeans: KMeansOptions::default(),
        }
    }
}

/// Outcome of a cluster-count search.
#[derive(Debug, Clone)]
pub struct OptimalKReport {
    /// Selected cluster count.
    pub k: usize,
    /// Per-candidate score: distortion for the elbow rule, mean silhouette
    /// otherwise.
    pub scores: Vec<(usize, f64)>,
    /// Per-candidate curvature (elbow rule only; empty otherwise).
    pub curvatures: Vec<(usize, f64)>,
    /// The K-Means fit for the selected k.
    pub result: ClusteringResult,
}

/// Device-side outcome of a cluster-count search.
#[derive(Debug, Clone)]
pub struct KSearch<R: Runtime> {
    pub k: usize,
    pub scores: Vec<(usize, f64)>,
    pub curvatures: Vec<(usize, f64)>,
    pub result: KMeansResult<R>,
}
