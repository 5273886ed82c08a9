mod common;

use std::sync::Mutex;

use caviz_core::border::BorderConfig;
use caviz_core::colorize::{Background, Colorizer, Colormap};
use caviz_core::consts::DEFAULT_BORDER_SIZE;
use caviz_core::exclude::{CropMode, Exclusion};
use caviz_core::frame::{Movie, Stimulus};
use caviz_core::io::{ImageKind, OutputFormat};
use caviz_core::measurement::Measurement;
use caviz_core::overview::{reduce_movie, WindowDifference};
use caviz_core::pipeline::{
    export_movie, export_still, render_movie, render_still, still_measurement,
    ProgressReporter, RenderConfig, RenderStage,
};
use caviz_core::roi::{RoiMarker, RoiOverlay, RoiSet, RoiSource};
use caviz_core::rotate::Transform;
use caviz_core::scale::{BoundEstimator, LimitDecider, LimitStrategy, ScaleMode};
use caviz_core::signal::delta_f_over_f;
use caviz_core::threshold::{ThresholdReference, ThresholdValue, Thresholder};
use ndarray::{Array2, Array3};

use common::*;

const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
const GREEN: [f32; 4] = [0.0, 1.0, 0.0, 1.0];

#[derive(Default)]
struct RecordingReporter {
    stages: Mutex<Vec<RenderStage>>,
    last_advance: Mutex<usize>,
}

impl ProgressReporter for RecordingReporter {
    fn begin_stage(&self, stage: RenderStage, _total_items: Option<usize>) {
        self.stages.lock().unwrap().push(stage);
    }

    fn advance(&self, items_done: usize) {
        *self.last_advance.lock().unwrap() = items_done;
    }
}

// ---------------------------------------------------------------------------
// Movies
// ---------------------------------------------------------------------------

#[test]
fn test_stages_run_in_order() {
    let reporter = RecordingReporter::default();
    let m = measurement(ramp_movie(4, 4, 3));
    let out = render_movie(&RenderConfig::default(), &m, &RoiSet::new(), &reporter).unwrap();
    assert_eq!(out.frames.len(), 3);
    assert_eq!(
        *reporter.stages.lock().unwrap(),
        vec![
            RenderStage::Cropping,
            RenderStage::Filtering,
            RenderStage::Scaling,
            RenderStage::Thresholding,
            RenderStage::Preparing,
            RenderStage::Rendering,
        ]
    );
    assert_eq!(*reporter.last_advance.lock().unwrap(), 3);
}

#[test]
fn test_frame_range_limits_output() {
    let m = measurement(ramp_movie(3, 3, 8));
    let config = RenderConfig {
        exclusion: Exclusion {
            first_frame: 2,
            last_frame: 4,
            ..Default::default()
        },
        ..Default::default()
    };
    let out = render_movie(&config, &m, &RoiSet::new(), &REPORTER).unwrap();
    assert_eq!(out.frames.len(), 3);
    assert_eq!(out.report.frames, 3);
    // Limits come from the retained frames only: 200 ..= 422.
    assert_eq!((out.report.range.vmin, out.report.range.vmax), (200.0, 422.0));
    let window = out.report.window.unwrap();
    assert_eq!((window.t0, window.t1), (2, 4));
}

#[test]
fn test_exclude_only_keeps_size_but_ignores_border_for_limits() {
    let mut data = Array3::from_elem((6, 6, 1), 1.0_f32);
    data[[0, 0, 0]] = 1000.0;
    data[[3, 3, 0]] = 5.0;
    let m = measurement(Movie::new(data));
    let config = RenderConfig {
        exclusion: Exclusion {
            mode: CropMode::ExcludeOnly,
            ..Exclusion::border(1)
        },
        ..Default::default()
    };
    let out = render_movie(&config, &m, &RoiSet::new(), &REPORTER).unwrap();
    assert_eq!(out.report.output_size, (6, 6));
    assert_eq!((out.report.range.vmin, out.report.range.vmax), (1.0, 5.0));
}

#[test]
fn test_threshold_splits_primary_and_flat_background() {
    // Left half bright, right half dark.
    let data = Array3::from_shape_fn((4, 2, 2), |(x, _, _)| if x < 2 { 10.0 } else { 0.0 });
    let m = measurement(Movie::new(data));
    let config = RenderConfig {
        threshold: Thresholder {
            reference: ThresholdReference::Signal,
            positive: Some(ThresholdValue::Absolute(5.0)),
            negative: None,
        },
        colorizer: Colorizer {
            primary: Colormap::Solid(RED),
            secondary: Colormap::Gray,
            background: Background::Flat(GREEN),
        },
        ..Default::default()
    };
    let out = render_movie(&config, &m, &RoiSet::new(), &REPORTER).unwrap();
    assert_eq!(out.report.threshold_coverage, Some(0.5));
    for frame in &out.frames {
        assert_rgba_close(frame.rgba(0, 0), RED);
        assert_rgba_close(frame.rgba(1, 1), RED);
        assert_rgba_close(frame.rgba(2, 0), GREEN);
        assert_rgba_close(frame.rgba(3, 1), GREEN);
    }
}

#[test]
fn test_baseline_background_uses_reference_image() {
    let data = Array3::from_elem((3, 1, 1), 0.0_f32);
    let reference = Array2::from_shape_fn((3, 1), |(x, _)| x as f32);
    let m = measurement(Movie::new(data)).with_reference(reference);
    let config = RenderConfig {
        threshold: Thresholder {
            reference: ThresholdReference::Signal,
            positive: Some(ThresholdValue::Absolute(100.0)),
            negative: None,
        },
        colorizer: Colorizer {
            primary: Colormap::Solid(RED),
            secondary: Colormap::Gray,
            background: Background::Baseline,
        },
        ..Default::default()
    };
    let out = render_movie(&config, &m, &RoiSet::new(), &REPORTER).unwrap();
    let f = &out.frames[0];
    assert_rgba_close(f.rgba(0, 0), [0.0, 0.0, 0.0, 1.0]);
    assert_rgba_close(f.rgba(1, 0), [0.5, 0.5, 0.5, 1.0]);
    assert_rgba_close(f.rgba(2, 0), [1.0, 1.0, 1.0, 1.0]);
}

/// Threshold level above every sample: the whole frame shows the background.
fn all_background(background: Background, background_limits: LimitDecider) -> RenderConfig {
    RenderConfig {
        threshold: Thresholder {
            reference: ThresholdReference::Signal,
            positive: Some(ThresholdValue::Absolute(1.0e6)),
            negative: None,
        },
        colorizer: Colorizer {
            primary: Colormap::Solid(RED),
            secondary: Colormap::Gray,
            background,
        },
        background_limits,
        ..Default::default()
    }
}

#[test]
fn test_constant_raw_background_is_one_solid_color() {
    let m = measurement(constant_movie(4, 4, 2, 7.0));
    let config = all_background(Background::Raw, LimitDecider::default());
    let out = render_movie(&config, &m, &RoiSet::new(), &REPORTER).unwrap();
    assert_eq!(out.report.threshold_coverage, Some(0.0));
    let expected = Colormap::Gray.rgba(0.5);
    for frame in &out.frames {
        for x in 0..4 {
            for y in 0..4 {
                assert_rgba_close(frame.rgba(x, y), expected);
            }
        }
    }
}

#[test]
fn test_raw_background_uses_its_own_limits() {
    let data = Array3::from_shape_fn((4, 1, 1), |(x, _, _)| x as f32);
    let m = measurement(Movie::new(data));

    let full = all_background(Background::Raw, LimitDecider::default());
    let out = render_movie(&full, &m, &RoiSet::new(), &REPORTER).unwrap();
    let g = 1.0 / 3.0;
    assert_rgba_close(out.frames[0].rgba(1, 0), [g, g, g, 1.0]);
    assert_rgba_close(out.frames[0].rgba(3, 0), [1.0, 1.0, 1.0, 1.0]);

    let fixed = all_background(
        Background::Raw,
        LimitDecider::new(LimitStrategy::Fixed, BoundEstimator::MinMax).with_fixed(0.0, 6.0),
    );
    let out = render_movie(&fixed, &m, &RoiSet::new(), &REPORTER).unwrap();
    let g = 1.0 / 6.0;
    assert_rgba_close(out.frames[0].rgba(1, 0), [g, g, g, 1.0]);
    assert_rgba_close(out.frames[0].rgba(3, 0), [0.5, 0.5, 0.5, 1.0]);
}

#[test]
fn test_bilinear_rendering_centers_zero() {
    let data = Array3::from_shape_fn((3, 1, 1), |(x, _, _)| [-8.0, 0.0, 2.0][x]);
    let m = measurement(Movie::new(data));
    let config = RenderConfig {
        scale_mode: ScaleMode::Bilinear,
        colorizer: Colorizer {
            primary: Colormap::Gray,
            ..Default::default()
        },
        ..Default::default()
    };
    let out = render_movie(&config, &m, &RoiSet::new(), &REPORTER).unwrap();
    let f = &out.frames[0];
    assert_rgba_close(f.rgba(0, 0), [0.0, 0.0, 0.0, 1.0]);
    assert_rgba_close(f.rgba(1, 0), [0.5, 0.5, 0.5, 1.0]);
    assert_rgba_close(f.rgba(2, 0), [1.0, 1.0, 1.0, 1.0]);
}

#[test]
fn test_masked_limits_with_empty_area_fail() {
    let m = measurement(ramp_movie(4, 4, 2)).with_area(Array2::from_elem((4, 4), false));
    let config = RenderConfig {
        limits: LimitDecider::new(LimitStrategy::Masked, BoundEstimator::MinMax),
        ..Default::default()
    };
    assert!(render_movie(&config, &m, &RoiSet::new(), &REPORTER).is_err());
}

#[test]
fn test_resampled_area_is_reported() {
    let m = measurement(ramp_movie(8, 8, 2)).with_area(Array2::from_elem((4, 4), true));
    let out = render_movie(&RenderConfig::default(), &m, &RoiSet::new(), &REPORTER).unwrap();
    assert_eq!(out.report.diagnostics.len(), 1);
    assert_eq!(out.report.diagnostics[0].source, "area mask");
}

// ---------------------------------------------------------------------------
// ROIs
// ---------------------------------------------------------------------------

#[test]
fn test_roi_outline_is_drawn_after_crop() {
    let m = measurement(constant_movie(8, 8, 1, 0.0));
    let mut square = Array2::zeros((8, 8));
    for x in 2..6 {
        for y in 2..6 {
            square[[x, y]] = 1.0;
        }
    }
    let mut rois = RoiSet::new();
    rois.insert("cell".to_string(), square);

    let config = RenderConfig {
        exclusion: Exclusion::border(1),
        rois: RoiMarker {
            overlay: RoiOverlay::Outline(RED),
            source: RoiSource(0),
        },
        colorizer: Colorizer {
            primary: Colormap::Solid(GREEN),
            ..Default::default()
        },
        ..Default::default()
    };
    let out = render_movie(&config, &m, &rois, &REPORTER).unwrap();
    let f = &out.frames[0];
    assert_eq!(f.pixels.dim(), (6, 6, 4));
    // Original (2, 2) is cropped (1, 1), on the outline.
    assert_rgba_close(f.rgba(1, 1), RED);
    assert_rgba_close(f.rgba(4, 2), RED);
    // Interior and outside stay untouched.
    assert_rgba_close(f.rgba(2, 2), GREEN);
    assert_rgba_close(f.rgba(0, 0), GREEN);
}

#[test]
fn test_labeled_rois_on_solid_background() {
    let m = measurement(constant_movie(5, 5, 1, 0.0));
    let mut rois = RoiSet::new();
    rois.insert("a".to_string(), Array2::from_elem((5, 5), 1.0));
    let config = RenderConfig {
        rois: RoiMarker {
            overlay: RoiOverlay::LabeledOnSolid([0.0, 0.0, 0.0, 1.0]),
            source: RoiSource(0),
        },
        ..Default::default()
    };
    let out = render_movie(&config, &m, &rois, &REPORTER).unwrap();
    let f = &out.frames[0];
    // The whole frame is the ROI: edges are outline, the centre is background.
    assert_rgba_close(f.rgba(2, 2), [0.0, 0.0, 0.0, 1.0]);
    assert!(f.rgba(0, 0) != [0.0, 0.0, 0.0, 1.0]);
}

// ---------------------------------------------------------------------------
// Border chrome
// ---------------------------------------------------------------------------

#[test]
fn test_border_grows_output_and_keeps_frame() {
    let m = measurement(ramp_movie(20, 12, 2)).with_stimuli(vec![Stimulus {
        onset_ms: 0.0,
        offset_ms: 100.0,
    }]);
    let config = RenderConfig {
        border: BorderConfig {
            colorbar: true,
            timestamp: true,
            stimulus: true,
            ..Default::default()
        },
        ..Default::default()
    };
    let plain = render_movie(&RenderConfig::default(), &m, &RoiSet::new(), &REPORTER).unwrap();
    let framed = render_movie(&config, &m, &RoiSet::new(), &REPORTER).unwrap();

    let (w, h) = framed.report.output_size;
    assert!(w > 20 && h > 12);
    assert_eq!(framed.frames[0].pixels.dim(), (w, h, 4));

    // The data sits at the left edge, above the bottom margin.
    let bottom = DEFAULT_BORDER_SIZE;
    for x in 0..20 {
        for y in 0..12 {
            assert_eq!(framed.frames[1].rgba(x, y + bottom), plain.frames[1].rgba(x, y));
        }
    }
}

#[test]
fn test_still_border_has_no_time_annotations() {
    let m = measurement(ramp_movie(20, 12, 3));
    let config = RenderConfig {
        border: BorderConfig {
            timestamp: true,
            stimulus: true,
            ..Default::default()
        },
        ..Default::default()
    };
    let (frame, report) = render_still(&config, &m, None, &RoiSet::new(), &REPORTER).unwrap();
    assert_eq!(report.output_size, (20, 12));
    assert_eq!(frame.pixels.dim(), (20, 12, 4));
}

// ---------------------------------------------------------------------------
// Stills
// ---------------------------------------------------------------------------

#[test]
fn test_still_defaults_to_mean_signal() {
    let m = measurement(ramp_movie(3, 2, 4));
    let still = still_measurement(&RenderConfig::default(), &m, None).unwrap();
    assert_eq!(still.nt(), 1);
    // Mean of x + 10y + 100t over t = 0..3.
    assert_eq!(still.signal.data[[1, 1, 0]], 11.0 + 150.0);
    assert_eq!(still.reference.as_ref().unwrap()[[1, 1]], 161.0);
}

#[test]
fn test_still_respects_frame_range() {
    let m = measurement(ramp_movie(2, 2, 6));
    let config = RenderConfig {
        exclusion: Exclusion {
            first_frame: 4,
            last_frame: 5,
            ..Default::default()
        },
        ..Default::default()
    };
    let still = still_measurement(&config, &m, None).unwrap();
    assert_eq!(still.signal.data[[0, 0, 0]], 450.0);
}

#[test]
fn test_still_from_overview() {
    let raw = Movie::new(Array3::from_shape_fn((4, 4, 6), |(x, _, t)| {
        if t >= 3 {
            1.0 + x as f32
        } else {
            1.0
        }
    }));
    let m = Measurement::from_raw(raw.clone(), 50.0).unwrap();
    let overview = reduce_movie(&raw, &WindowDifference::new(0..=2, 3..=5)).unwrap();
    let config = RenderConfig {
        colorizer: Colorizer {
            primary: Colormap::Gray,
            ..Default::default()
        },
        ..Default::default()
    };
    let (frame, report) = render_still(&config, &m, Some(&overview), &RoiSet::new(), &REPORTER).unwrap();
    assert_eq!((report.range.vmin, report.range.vmax), (0.0, 3.0));
    assert_rgba_close(frame.rgba(0, 0), [0.0, 0.0, 0.0, 1.0]);
    assert_rgba_close(frame.rgba(3, 2), [1.0, 1.0, 1.0, 1.0]);

    let wrong = Array2::zeros((3, 4));
    assert!(render_still(&config, &m, Some(&wrong), &RoiSet::new(), &REPORTER).is_err());
}

#[test]
fn test_delta_f_over_f_movie_renders() {
    let raw = Movie::new(Array3::from_shape_fn((3, 3, 5), |(_, _, t)| {
        if t < 2 {
            100.0
        } else {
            150.0
        }
    }));
    let signal = delta_f_over_f(&raw, 0..=1).unwrap();
    let m = Measurement::new(raw, signal, 100.0).unwrap();
    let out = render_movie(&RenderConfig::default(), &m, &RoiSet::new(), &REPORTER).unwrap();
    assert_eq!((out.report.range.vmin, out.report.range.vmax), (0.0, 50.0));
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

#[test]
fn test_export_movie_writes_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let stem = dir.path().join("cells");
    let m = measurement(ramp_movie(6, 4, 3));
    let report = export_movie(&RenderConfig::default(), &m, &RoiSet::new(), &stem, &REPORTER).unwrap();
    assert_eq!(report.files.len(), 3);
    assert!(stem.join("cells_00002.png").exists());
    let img = image::open(stem.join("cells_00000.png")).unwrap();
    assert_eq!((img.width(), img.height()), (6, 4));
}

#[test]
fn test_single_frame_movie_export_is_numbered() {
    let dir = tempfile::tempdir().unwrap();
    let stem = dir.path().join("cells");
    let m = measurement(ramp_movie(6, 4, 1));
    let report = export_movie(&RenderConfig::default(), &m, &RoiSet::new(), &stem, &REPORTER).unwrap();
    assert_eq!(report.files, vec![stem.join("cells_00000.png")]);
    assert!(!dir.path().join("cells.png").exists());
}

#[test]
fn test_export_movie_as_tiff_stack() {
    let dir = tempfile::tempdir().unwrap();
    let stem = dir.path().join("cells");
    let m = measurement(ramp_movie(6, 4, 3));
    let config = RenderConfig {
        output: OutputFormat::TiffStack,
        transform: Transform::from_code(4, false, "rotate").unwrap(),
        ..Default::default()
    };
    let report = export_movie(&config, &m, &RoiSet::new(), &stem, &REPORTER).unwrap();
    assert_eq!(report.files, vec![dir.path().join("cells.tif")]);
    assert_eq!(report.output_size, (4, 6));
}

#[test]
fn test_export_still_writes_single_file() {
    let dir = tempfile::tempdir().unwrap();
    let stem = dir.path().join("summary");
    let m = measurement(ramp_movie(5, 5, 4));
    let config = RenderConfig {
        output: OutputFormat::ImageSequence(ImageKind::Bmp),
        ..Default::default()
    };
    let report = export_still(&config, &m, None, &RoiSet::new(), &stem, &REPORTER).unwrap();
    assert_eq!(report.files, vec![dir.path().join("summary.bmp")]);
    assert_eq!(report.frames, 1);
}
