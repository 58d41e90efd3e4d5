//! Mapping clustering output back onto pixels.
//!
//! This is the only place that knows about image layout. Painting the
//! buffer on screen is left to a [`PixelSink`] supplied by the caller.

use crate::cluster::traits::clusterer::ClusteringResult;
use crate::error::{ClusterError, ClusterResult};

/// Alpha written for every output pixel.
pub const OPAQUE: u8 = 255;

/// Packed RGBA pixels in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: usize,
    pub height: usize,
    /// `width * height * 4` bytes.
    pub data: Vec<u8>,
}

impl PixelBuffer {
    /// RGBA bytes of the pixel at `(x, y)`.
    pub fn pixel(&self, x: usize, y: usize) -> &[u8] {
        let i = (y * self.width + x) * 4;
        &self.data[i..i + 4]
    }
}

/// External renderer that receives finished pixel buffers.
pub trait PixelSink {
    fn present(&mut self, buffer: &PixelBuffer) -> ClusterResult<()>;
}

/// Turns labels and centroids into a pixel buffer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterResultMapper;

impl ClusterResultMapper {
    /// Paint pixel `i` with the color of `centroids[labels[i]]`, fully opaque.
    ///
    /// Channels are rounded and clamped to `0..=255`. Centroids with fewer
    /// than three components repeat their last one; extra components are
    /// ignored.
    pub fn to_pixels(
        result: &ClusteringResult,
        width: usize,
        height: usize,
    ) -> ClusterResult<PixelBuffer> {
        let expected = width.checked_mul(height).ok_or_else(|| {
            ClusterError::invalid_parameter("width", "width * height overflows usize")
        })?;
        if expected != result.labels.len() {
            return Err(ClusterError::DimensionMismatch {
                expected,
                got: result.labels.len(),
                context: "to_pixels (width * height vs label count)".to_string(),
            });
        }

        let palette = Self::palette(result);
        let mut data = Vec::with_capacity(expected * 4);
        for &label in &result.labels {
            let rgb = palette.get(label).ok_or_else(|| {
                ClusterError::invalid_parameter(
                    "labels",
                    format!("label {label} has no centroid ({} clusters)", palette.len()),
                )
            })?;
            data.extend_from_slice(rgb);
            data.push(OPAQUE);
        }

        Ok(PixelBuffer {
            width,
            height,
            data,
        })
    }

    /// Map the result and hand it to `sink`.
    pub fn render<S: PixelSink + ?Sized>(
        result: &ClusteringResult,
        width: usize,
        height: usize,
        sink: &mut S,
    ) -> ClusterResult<()> {
        let buffer = Self::to_pixels(result, width, height)?;
        sink.present(&buffer)
    }

    /// Centroid colors as 8-bit RGB.
    pub fn palette(result: &ClusteringResult) -> Vec<[u8; 3]> {
        result
            .centroids
            .iter()
            .map(|c| {
                let mut rgb = [0u8; 3];
                let mut last = 0.0;
                for (ch, out) in rgb.iter_mut().enumerate() {
                    if let Some(&v) = c.get(ch) {
                        last = v;
                    }
                    *out = to_channel(last);
                }
                rgb
            })
            .collect()
    }
}

fn to_channel(v: f64) -> u8 {
    if v.is_nan() {
        return 0;
    }
    v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;

    fn result(labels: Vec<usize>, centroids: &[[f64; 3]]) -> ClusteringResult {
        ClusteringResult {
            labels,
            centroids: Dataset::from_rows(centroids).unwrap(),
            inertia: 0.0,
            n_iter: 1,
            converged: true,
        }
    }

    #[test]
    fn test_to_pixels() {
        let r = result(vec![0, 1, 1, 0], &[[0.5, 0.5, 0.5], [100.5, 300.0, -4.0]]);
        let buffer = ClusterResultMapper::to_pixels(&r, 2, 2).unwrap();
        assert_eq!(buffer.data.len(), 16);
        assert_eq!(buffer.pixel(0, 0), &[1, 1, 1, 255]);
        assert_eq!(buffer.pixel(1, 0), &[101, 255, 0, 255]);
        assert_eq!(buffer.pixel(0, 1), &[101, 255, 0, 255]);
        assert_eq!(buffer.pixel(1, 1), &[1, 1, 1, 255]);
    }

    #[test]
    fn test_to_pixels_dimension_mismatch() {
        let r = result(vec![0, 0, 0], &[[1.0, 2.0, 3.0]]);
        let err = ClusterResultMapper::to_pixels(&r, 2, 2).unwrap_err();
        assert!(matches!(
            err,
            ClusterError::DimensionMismatch {
                expected: 4,
                got: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_palette_grayscale_centroids() {
        let r = ClusteringResult {
            labels: vec![0],
            centroids: Dataset::from_rows(&[[42.4]]).unwrap(),
            inertia: 0.0,
            n_iter: 1,
            converged: true,
        };
        assert_eq!(ClusterResultMapper::palette(&r), vec![[42, 42, 42]]);
    }

    #[test]
    fn test_render_hands_buffer_to_sink() {
        struct Capture(Vec<PixelBuffer>);
        impl PixelSink for Capture {
            fn present(&mut self, buffer: &PixelBuffer) -> ClusterResult<()> {
                self.0.push(buffer.clone());
                Ok(())
            }
        }

        let r = result(vec![0, 0], &[[9.0, 8.0, 7.0]]);
        let mut sink = Capture(Vec::new());
        ClusterResultMapper::render(&r, 2, 1, &mut sink).unwrap();
        assert_eq!(sink.0.len(), 1);
        assert_eq!(sink.0[0].data, vec![9, 8, 7, 255, 9, 8, 7, 255]);
    }
}
