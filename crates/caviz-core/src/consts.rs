/// Minimum pixel count (x*y) to use slice-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Gaussian kernels are truncated at this many sigmas.
pub const GAUSSIAN_TRUNCATE: f32 = 3.0;

/// Default strategy-3 margin: fraction of each spatial edge trimmed before
/// computing limits from the central region.
pub const DEFAULT_CENTER_FRACTION: f64 = 0.2;

/// Default percentile used when percentile limits are enabled.
pub const DEFAULT_PERCENTILE: f64 = 1.0;

/// Default legacy scale code: plain linear, whole-array limits.
pub const DEFAULT_INDIVIDUAL_SCALE: i64 = 2;

/// Default margin (in pixels) added on each annotated side of a frame.
pub const DEFAULT_BORDER_SIZE: usize = 24;

/// Width of the colorbar strip inside the right margin.
pub const COLORBAR_WIDTH: usize = 8;

/// Height of the stimulus timeline strip inside the bottom margin.
pub const STIMULUS_BAR_HEIGHT: usize = 6;

/// Default video bitrate in kbit/s.
pub const DEFAULT_BITRATE_KBPS: i64 = 2000;

/// Number of digits in image-sequence file names (`stem_00042.png`).
pub const SEQUENCE_INDEX_DIGITS: usize = 5;

/// Color channels in a rendered frame (R, G, B, A).
pub const RGBA_CHANNELS: usize = 4;

/// Qualitative palette for per-label ROI outlines (tab10).
pub const ROI_PALETTE: [[f32; 3]; 10] = [
    [0.122, 0.467, 0.706],
    [1.000, 0.498, 0.055],
    [0.173, 0.627, 0.173],
    [0.839, 0.153, 0.157],
    [0.580, 0.404, 0.741],
    [0.549, 0.337, 0.294],
    [0.890, 0.467, 0.761],
    [0.498, 0.498, 0.498],
    [0.737, 0.741, 0.133],
    [0.090, 0.745, 0.812],
];
