use std::path::Path;

use ndarray::{s, Axis, Zip};
use tracing::{debug, info, warn};

use crate::border::{BorderConfig, ChromeInputs, StaticChrome};
use crate::colorize::{prepare_background, BackgroundField};
use crate::error::{CavizError, Result};
use crate::exclude::CropMode;
use crate::filters::{filter_space, filter_time};
use crate::frame::{Frame, Mask, Movie, RenderedFrame};
use crate::io::{FrameWriter, VideoSettings};
use crate::measurement::Measurement;
use crate::roi::{PreparedRois, RoiSet};
use crate::scale::normalize;
use crate::threshold::{coverage, ReferenceField, ThresholdReference};

use super::config::RenderConfig;
use super::types::{ProgressReporter, RenderReport, RenderStage, RenderedMovie};

/// Everything decided once per export, ahead of the per-frame loop.
struct Prepared {
    normalized: Movie,
    color_mask: Option<Mask>,
    background: Option<BackgroundField>,
    rois: PreparedRois,
    chrome: StaticChrome,
    report: RenderReport,
}

/// Copy of `movie` with pixels outside `keep` set to NaN, so that limit
/// estimation skips them.
fn mask_out(movie: &Movie, keep: &Mask) -> Movie {
    let mut data = movie.data.clone();
    for (t, mut frame) in data.axis_iter_mut(Axis(2)).enumerate() {
        Zip::from(&mut frame).and(keep.frame(t)).for_each(|v, &k| {
            if !k {
                *v = f32::NAN;
            }
        });
    }
    Movie::new(data)
}

fn prepare(
    config: &RenderConfig,
    border: &BorderConfig,
    m: &Measurement,
    rois: &RoiSet,
    reporter: &dyn ProgressReporter,
) -> Result<Prepared> {
    let mut diagnostics = m.diagnostics.clone();
    let ex = &config.exclusion;

    reporter.begin_stage(RenderStage::Cropping, None);
    let window = ex.resolve(m.nx(), m.ny(), m.nt())?;
    let signal = ex.crop_movie(&m.signal)?;
    let raw = ex.crop_movie(&m.raw)?;
    let baseline = ex.crop_frame(&m.baseline())?;
    let retained = ex.retained_mask(signal.nx(), signal.ny())?;
    let mut area = ex.crop_mask(&m.area_mask())?;
    if config.restrict_area {
        area = area.and(&retained)?;
    }
    info!(
        nx = signal.nx(),
        ny = signal.ny(),
        nt = signal.nt(),
        first = window.t0,
        last = window.t1,
        "Cropped input"
    );
    reporter.finish_stage();

    reporter.begin_stage(RenderStage::Filtering, None);
    let signal = filter_time(
        &filter_space(&signal, &config.space_filter),
        &config.time_filter,
    );
    reporter.finish_stage();

    reporter.begin_stage(RenderStage::Scaling, None);
    let range = match ex.mode {
        CropMode::ExcludeOnly => config.limits.decide(&mask_out(&signal, &retained), &area)?,
        CropMode::Trim => config.limits.decide(&signal, &area)?,
    };
    if range.is_degenerate() {
        warn!(
            vmin = range.vmin,
            vmax = range.vmax,
            "Degenerate normalization range, rendering a uniform field"
        );
    }
    let normalized = Movie::new(normalize(&signal.data, range, config.scale_mode));
    info!(vmin = range.vmin, vmax = range.vmax, mode = %config.scale_mode, "Normalized signal");
    reporter.finish_stage();

    reporter.begin_stage(RenderStage::Thresholding, None);
    let (color_mask, background, threshold_coverage) = if config.threshold.is_active() {
        let field = match config.threshold.reference {
            ThresholdReference::None => None,
            ThresholdReference::Baseline => Some(ReferenceField::Static(&baseline)),
            ThresholdReference::Raw => Some(ReferenceField::Movie(&raw)),
            ThresholdReference::Signal => Some(ReferenceField::Movie(&signal)),
        };
        let mask = config.threshold.mask(&area, field)?;
        let background = prepare_background(
            &config.colorizer.background,
            &baseline,
            &raw,
            &config.background_limits,
            &area,
        )?;
        let nt = signal.nt();
        let cov = (0..nt).map(|t| coverage(mask.frame(t))).sum::<f64>() / nt as f64;
        debug!(coverage = cov, "Threshold mask");
        (Some(mask), Some(background), Some(cov))
    } else {
        (None, None, None)
    };
    reporter.finish_stage();

    reporter.begin_stage(RenderStage::Preparing, None);
    let (rois, roi_diagnostics) = config.rois.prepare(rois, ex, m.nx(), m.ny())?;
    diagnostics.extend(roi_diagnostics);
    let (width, height) = config.transform.transform_size(signal.nx(), signal.ny());
    let chrome = StaticChrome::build(
        border,
        &ChromeInputs {
            width,
            height,
            range,
            mode: config.scale_mode,
            colormap: config.colorizer.primary,
            stimuli: &m.stimuli,
            sampling_period_ms: m.sampling_period_ms,
            first_frame: window.t0,
            frames: signal.nt(),
        },
    )?;
    reporter.finish_stage();
    if !diagnostics.is_empty() {
        debug!(count = diagnostics.len(), "Input diagnostics");
    }

    let report = RenderReport {
        range,
        window: Some(window),
        frames: signal.nt(),
        output_size: chrome.output_size(),
        threshold_coverage,
        diagnostics,
        files: Vec::new(),
    };
    Ok(Prepared {
        normalized,
        color_mask,
        background,
        rois,
        chrome,
        report,
    })
}

/// Colorize → ROI overlay → rotate → border for retained frame `t`.
fn render_frame(config: &RenderConfig, p: &Prepared, t: usize) -> Result<RenderedFrame> {
    let colored = config.colorizer.colorize(
        p.normalized.frame(t),
        p.color_mask.as_ref().map(|m| m.frame(t)),
        p.background.as_ref(),
        t,
    )?;
    let marked = if config.rois.is_active() {
        config.rois.mark(&colored, &p.rois)?
    } else {
        colored
    };
    let rotated = config.transform.apply(marked.view());
    let framed = p.chrome.composite(&rotated, t)?;
    Ok(RenderedFrame::new(framed, t))
}

fn run(
    config: &RenderConfig,
    border: &BorderConfig,
    m: &Measurement,
    rois: &RoiSet,
    reporter: &dyn ProgressReporter,
    mut sink: impl FnMut(RenderedFrame) -> Result<()>,
) -> Result<RenderReport> {
    let prepared = prepare(config, border, m, rois, reporter)?;
    let n = prepared.normalized.nt();
    reporter.begin_stage(RenderStage::Rendering, Some(n));
    for t in 0..n {
        sink(render_frame(config, &prepared, t)?)?;
        reporter.advance(t + 1);
    }
    reporter.finish_stage();
    Ok(prepared.report)
}

fn video_settings(config: &RenderConfig, m: &Measurement) -> VideoSettings {
    VideoSettings {
        sampling_period_ms: m.sampling_period_ms,
        ..config.video.clone()
    }
}

/// Render every retained frame in memory.
pub fn render_movie(
    config: &RenderConfig,
    m: &Measurement,
    rois: &RoiSet,
    reporter: &dyn ProgressReporter,
) -> Result<RenderedMovie> {
    let mut frames = Vec::new();
    let report = run(config, &config.border, m, rois, reporter, |f| {
        frames.push(f);
        Ok(())
    })?;
    Ok(RenderedMovie { frames, report })
}

/// Render every retained frame and hand each one to a writer for
/// `config.output`. The writer is created (and the frame rate validated)
/// before any rendering work starts.
pub fn export_movie(
    config: &RenderConfig,
    m: &Measurement,
    rois: &RoiSet,
    stem: &Path,
    reporter: &dyn ProgressReporter,
) -> Result<RenderReport> {
    let window = config.exclusion.resolve(m.nx(), m.ny(), m.nt())?;
    let mut writer = FrameWriter::create(
        config.output,
        stem,
        window.frames(),
        &video_settings(config, m),
    )?;
    let mut report = run(config, &config.border, m, rois, reporter, |f| writer.push(f))?;
    reporter.begin_stage(RenderStage::Writing, None);
    report.attach(writer.finish()?);
    reporter.finish_stage();
    info!(frames = report.frames, files = report.files.len(), "Movie export complete");
    Ok(report)
}

/// One-frame measurement for a still image.
///
/// The still shows `overview` when given, otherwise the mean signal over the
/// retained frame range. The raw layer becomes the static baseline.
pub fn still_measurement(
    config: &RenderConfig,
    m: &Measurement,
    overview: Option<&Frame>,
) -> Result<Measurement> {
    let frame = match overview {
        Some(f) => {
            if f.dim() != (m.nx(), m.ny()) {
                return Err(CavizError::ShapeMismatch(format!(
                    "overview {:?} vs data {:?}",
                    f.dim(),
                    (m.nx(), m.ny())
                )));
            }
            f.clone()
        }
        None => {
            let w = config.exclusion.resolve(m.nx(), m.ny(), m.nt())?;
            Movie::new(m.signal.data.slice(s![.., .., w.t0..=w.t1]).to_owned()).temporal_mean()
        }
    };
    let baseline = m.baseline();
    let mut still = Measurement::new(
        Movie::from_frame(&baseline),
        Movie::from_frame(&frame),
        m.sampling_period_ms,
    )?
    .with_reference(baseline);
    still.area = m.area.clone();
    still.diagnostics = m.diagnostics.clone();
    Ok(still)
}

/// Timestamps and the stimulus timeline describe a time axis a still lacks.
fn still_border(config: &RenderConfig) -> BorderConfig {
    BorderConfig {
        timestamp: false,
        stimulus: false,
        ..config.border.clone()
    }
}

pub fn render_still(
    config: &RenderConfig,
    m: &Measurement,
    overview: Option<&Frame>,
    rois: &RoiSet,
    reporter: &dyn ProgressReporter,
) -> Result<(RenderedFrame, RenderReport)> {
    let still = still_measurement(config, m, overview)?;
    let mut out = None;
    let report = run(config, &still_border(config), &still, rois, reporter, |f| {
        out = Some(f);
        Ok(())
    })?;
    let frame = out.ok_or(CavizError::EmptySequence)?;
    Ok((frame, report))
}

pub fn export_still(
    config: &RenderConfig,
    m: &Measurement,
    overview: Option<&Frame>,
    rois: &RoiSet,
    stem: &Path,
    reporter: &dyn ProgressReporter,
) -> Result<RenderReport> {
    let (frame, mut report) = render_still(config, m, overview, rois, reporter)?;
    reporter.begin_stage(RenderStage::Writing, None);
    let mut writer = FrameWriter::still(config.output, stem, &video_settings(config, m))?;
    writer.push(frame)?;
    report.attach(writer.finish()?);
    reporter.finish_stage();
    info!(files = report.files.len(), "Still export complete");
    Ok(report)
}
