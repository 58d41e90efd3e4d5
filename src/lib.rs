//! chromr - color clustering for posterization and segmentation previews
//!
//! chromr clusters pixel colors with K-Means or Mean Shift and maps the result
//! back onto an RGBA buffer. Image decoding and on-screen drawing stay with the
//! caller: the core consumes a flat sequence of color vectors and returns
//! labels plus centroids.
//!
//! # Architecture
//!
//! ```text
//! pixels ──► Dataset ──► [OptimalK] ──► KMeans / MeanShift ──► ClusteringResult
//!                                                                   │
//!                          PixelSink ◄── PixelBuffer ◄── ClusterResultMapper
//! ```
//!
//! # Modules
//!
//! - [`dataset`] - fixed-dimension vectors on a numr `[n, d]` tensor
//! - [`vector_math`] - distances, means, nearest-centroid assignment
//! - [`cluster`] - K-Means, Mean Shift, cluster-count selection; each also
//!   available as a `*Algorithms` trait on numr's `CpuClient`
//! - [`render`] - labels and centroids to RGBA pixels
//! - [`cancel`] - cooperative cancellation and deadlines
//!
//! Every engine is a pure function of its input and options. Randomness comes
//! from a seeded ChaCha stream, so a fixed `seed` reproduces a run exactly.
//!
//! # Example
//!
//! ```
//! use chromr::cluster::{Clusterer, KMeans, KMeansOptions};
//! use chromr::dataset::Dataset;
//! use chromr::render::ClusterResultMapper;
//!
//! let rgb = [0u8, 0, 0, 1, 1, 1, 100, 100, 100, 101, 101, 101];
//! let data = Dataset::from_rgb(&rgb).unwrap();
//!
//! let result = KMeans::new(KMeansOptions::with_clusters(2)).fit(&data).unwrap();
//! assert_eq!(result.labels[0], result.labels[1]);
//!
//! let pixels = ClusterResultMapper::to_pixels(&result, 2, 2).unwrap();
//! assert_eq!(pixels.data.len(), 16);
//! ```

pub mod cancel;
pub mod cluster;
pub mod dataset;
pub mod error;
pub mod render;
pub mod vector_math;

pub use cancel::CancelToken;
pub use dataset::Dataset;
pub use error::{ClusterError, ClusterResult};
