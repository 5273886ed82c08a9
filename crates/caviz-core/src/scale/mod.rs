pub mod limits;
pub mod normalize;

use serde::{Deserialize, Serialize};

pub use limits::{BoundEstimator, LimitDecider, LimitStrategy};
pub use normalize::{normalize, normalize_value, ScaleMode};

/// Lower and upper scalar bounds used for normalization.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizationRange {
    pub vmin: f64,
    pub vmax: f64,
}

impl NormalizationRange {
    pub fn new(vmin: f64, vmax: f64) -> Self {
        Self { vmin, vmax }
    }

    /// `vmin >= vmax` (including NaN bounds) cannot be scaled linearly.
    pub fn is_degenerate(&self) -> bool {
        self.vmin.partial_cmp(&self.vmax) != Some(std::cmp::Ordering::Less)
    }
}
