pub mod background;
pub mod colormap;

use ndarray::{Array3, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::consts::RGBA_CHANNELS;
use crate::error::{CavizError, Result};

pub use background::{prepare_background, Background, BackgroundField};
pub use colormap::{parse_color, Colormap, Rgba};

/// Composites a primary layer (mask true) and a secondary layer (mask false).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Colorizer {
    pub primary: Colormap,
    pub secondary: Colormap,
    pub background: Background,
}

impl Colorizer {
    /// Colorize one normalized frame into an `(nx, ny, 4)` RGBA array.
    ///
    /// Without a mask every pixel uses the primary colormap.
    pub fn colorize(
        &self,
        normalized: ArrayView2<'_, f32>,
        mask: Option<ArrayView2<'_, bool>>,
        background: Option<&BackgroundField>,
        t: usize,
    ) -> Result<Array3<f32>> {
        let (nx, ny) = normalized.dim();
        if let Some(m) = &mask {
            if m.dim() != (nx, ny) {
                return Err(CavizError::ShapeMismatch(format!(
                    "mask {:?} vs frame {:?}",
                    m.dim(),
                    (nx, ny)
                )));
            }
        }
        let bg_frame = background.and_then(|b| b.frame(t));
        if let Some(bg) = &bg_frame {
            if bg.dim() != (nx, ny) {
                return Err(CavizError::ShapeMismatch(format!(
                    "background {:?} vs frame {:?}",
                    bg.dim(),
                    (nx, ny)
                )));
            }
        }
        let flat = match background {
            Some(BackgroundField::Flat(c)) => Some(*c),
            _ => None,
        };

        let mut out = Array3::<f32>::zeros((nx, ny, RGBA_CHANNELS));
        for ((x, y), &v) in normalized.indexed_iter() {
            let inside = mask.as_ref().map_or(true, |m| m[[x, y]]);
            let rgba = if inside {
                self.primary.rgba(v)
            } else if let Some(c) = flat {
                c
            } else if let Some(bg) = &bg_frame {
                self.secondary.rgba(bg[[x, y]])
            } else {
                self.secondary.rgba(v)
            };
            for (c, value) in rgba.into_iter().enumerate() {
                out[[x, y, c]] = value;
            }
        }
        Ok(out)
    }
}
