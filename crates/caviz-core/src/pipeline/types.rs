use std::path::PathBuf;

use crate::exclude::CropWindow;
use crate::frame::{Diagnostic, RenderedFrame};
use crate::io::WriteSummary;
use crate::scale::NormalizationRange;

/// Render pipeline stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderStage {
    Cropping,
    Filtering,
    Scaling,
    Thresholding,
    Preparing,
    Rendering,
    Writing,
}

impl std::fmt::Display for RenderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cropping => write!(f, "Cropping"),
            Self::Filtering => write!(f, "Applying filters"),
            Self::Scaling => write!(f, "Deciding limits"),
            Self::Thresholding => write!(f, "Thresholding"),
            Self::Preparing => write!(f, "Preparing overlays"),
            Self::Rendering => write!(f, "Rendering frames"),
            Self::Writing => write!(f, "Writing output"),
        }
    }
}

/// Thread-safe progress reporting for the render pipeline.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new stage has started. `total_items` is the number of work items in
    /// this stage (e.g. frame count), if known.
    fn begin_stage(&self, _stage: RenderStage, _total_items: Option<usize>) {}

    /// One work item within the current stage has completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// Progress reporter that ignores everything.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}

/// What a render produced, besides the pixels.
#[derive(Clone, Debug)]
pub struct RenderReport {
    pub range: NormalizationRange,
    pub window: Option<CropWindow>,
    pub frames: usize,
    /// `(width, height)` of every output frame.
    pub output_size: (usize, usize),
    /// Fraction of pixels shown in true color, averaged over frames.
    pub threshold_coverage: Option<f64>,
    pub diagnostics: Vec<Diagnostic>,
    pub files: Vec<PathBuf>,
}

impl RenderReport {
    pub(crate) fn attach(&mut self, summary: WriteSummary) {
        self.files = summary.files;
    }
}

/// Frames rendered in memory, with their report.
#[derive(Clone, Debug)]
pub struct RenderedMovie {
    pub frames: Vec<RenderedFrame>,
    pub report: RenderReport,
}
