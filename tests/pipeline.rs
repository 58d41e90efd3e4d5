use std::thread;

use chromr::cluster::{
    Clusterer, KMeans, KMeansOptions, MeanShift, MeanShiftOptions, OptimalK, OptimalKOptions,
};
use chromr::render::{ClusterResultMapper, PixelBuffer, PixelSink};
use chromr::{CancelToken, ClusterError, ClusterResult, Dataset};

const WIDTH: usize = 12;
const HEIGHT: usize = 8;

/// Three vertical color bands with a little per-pixel noise, as RGBA.
fn banded_image() -> Vec<u8> {
    let bands = [[20u8, 30, 200], [220, 40, 40], [30, 200, 60]];
    let mut rgba = Vec::with_capacity(WIDTH * HEIGHT * 4);
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            let band = bands[x * 3 / WIDTH];
            let noise = ((x * 7 + y * 13) % 5) as u8;
            rgba.extend_from_slice(&[band[0] + noise, band[1] + noise, band[2] - noise, 255]);
        }
    }
    rgba
}

struct Recorder(Option<PixelBuffer>);

impl PixelSink for Recorder {
    fn present(&mut self, buffer: &PixelBuffer) -> ClusterResult<()> {
        self.0 = Some(buffer.clone());
        Ok(())
    }
}

#[test]
fn posterize_with_selected_k() {
    let data = Dataset::from_rgba(&banded_image()).unwrap();
    assert_eq!(data.len(), WIDTH * HEIGHT);

    let options = OptimalKOptions {
        max_clusters: 6,
        ..Default::default()
    };
    let report = OptimalK::new(options).select_k(&data).unwrap();
    assert_eq!(report.k, 3);

    let mut sink = Recorder(None);
    ClusterResultMapper::render(&report.result, WIDTH, HEIGHT, &mut sink).unwrap();
    let buffer = sink.0.unwrap();

    // Every pixel in a band gets the same posterized color
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            let band_start = (x * 3 / WIDTH) * WIDTH / 3;
            assert_eq!(buffer.pixel(x, y), buffer.pixel(band_start, 0));
            assert_eq!(buffer.pixel(x, y)[3], 255);
        }
    }
    assert_ne!(buffer.pixel(0, 0), buffer.pixel(WIDTH - 1, 0));
}

#[test]
fn kmeans_and_mean_shift_agree_on_bands() {
    let data = Dataset::from_rgba(&banded_image()).unwrap();
    let kmeans = KMeans::new(KMeansOptions::with_clusters(3)).fit(&data).unwrap();
    let mean_shift = MeanShift::new(MeanShiftOptions::with_bandwidth(30.0))
        .fit(&data)
        .unwrap();

    assert_eq!(mean_shift.n_clusters(), 3);
    for i in 0..data.len() {
        for j in 0..data.len() {
            assert_eq!(
                kmeans.labels[i] == kmeans.labels[j],
                mean_shift.labels[i] == mean_shift.labels[j]
            );
        }
    }
}

#[test]
fn engines_run_in_parallel_threads() {
    let data = Dataset::from_rgba(&banded_image()).unwrap();
    let handles: Vec<_> = (1..=4)
        .map(|k| {
            let data = data.clone();
            thread::spawn(move || KMeans::new(KMeansOptions::with_clusters(k)).fit(&data))
        })
        .collect();
    for (k, handle) in (1..=4).zip(handles) {
        let result = handle.join().unwrap().unwrap();
        assert_eq!(result.n_clusters(), k);
    }
}

#[test]
fn mean_shift_cancelled_from_another_thread() {
    let data = Dataset::from_rgba(&banded_image()).unwrap();
    let token = CancelToken::new();
    let remote = token.clone();
    thread::spawn(move || remote.cancel()).join().unwrap();

    let err = MeanShift::new(MeanShiftOptions::with_bandwidth(30.0))
        .with_cancel(token)
        .fit(&data)
        .unwrap_err();
    assert!(matches!(err, ClusterError::Cancelled { .. }));
}

#[test]
fn mapper_rejects_wrong_dimensions() {
    let data = Dataset::from_rgba(&banded_image()).unwrap();
    let result = KMeans::new(KMeansOptions::with_clusters(2)).fit(&data).unwrap();
    let err = ClusterResultMapper::to_pixels(&result, WIDTH + 1, HEIGHT).unwrap_err();
    assert!(matches!(err, ClusterError::DimensionMismatch { .. }));
}
