use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CavizError, Result};
use crate::frame::{finite_min_max, Mask, Movie};
use crate::scale::{normalize, LimitDecider, NormalizationRange, ScaleMode};

use super::colormap::Rgba;

/// Source of the secondary field shown where the threshold mask is false.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum Background {
    /// The static reference image, repeated for every frame.
    #[default]
    Baseline,
    /// A single flat color.
    Flat(Rgba),
    /// The raw movie, scaled by its own limit decider.
    Raw,
}

impl Background {
    pub fn from_name(name: &str, flat_color: Rgba, flag: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "baseline" | "foto" | "reference" => Ok(Self::Baseline),
            "flat" | "color" => Ok(Self::Flat(flat_color)),
            "raw" => Ok(Self::Raw),
            _ => Err(CavizError::config(
                flag,
                name,
                "background must be baseline, flat or raw",
            )),
        }
    }
}

/// Normalized secondary field ready for colorization.
#[derive(Clone, Debug)]
pub enum BackgroundField {
    Static(Array2<f32>),
    Movie(Movie),
    Flat(Rgba),
}

impl BackgroundField {
    /// Slice at time `t`, or `None` for a flat color.
    pub fn frame(&self, t: usize) -> Option<ArrayView2<'_, f32>> {
        match self {
            Self::Static(f) => Some(f.view()),
            Self::Movie(m) => Some(m.frame(t)),
            Self::Flat(_) => None,
        }
    }
}

/// Build the normalized background for already cropped inputs.
///
/// A constant field normalizes to a uniform 0.5 and renders as one solid color.
pub fn prepare_background(
    background: &Background,
    baseline: &Array2<f32>,
    raw: &Movie,
    decider: &LimitDecider,
    area: &Mask,
) -> Result<BackgroundField> {
    match background {
        Background::Flat(c) => Ok(BackgroundField::Flat(*c)),
        Background::Baseline => {
            let (lo, hi) = finite_min_max(baseline.iter().copied()).unwrap_or((0.0, 0.0));
            let range = NormalizationRange::new(lo, hi);
            debug!(vmin = lo, vmax = hi, "Baseline background range");
            Ok(BackgroundField::Static(normalize(
                baseline,
                range,
                ScaleMode::Linear,
            )))
        }
        Background::Raw => {
            let range = decider.decide(raw, area)?;
            debug!(vmin = range.vmin, vmax = range.vmax, "Raw background range");
            Ok(BackgroundField::Movie(Movie::new(normalize(
                &raw.data,
                range,
                ScaleMode::Linear,
            ))))
        }
    }
}
