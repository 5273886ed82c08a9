use std::collections::BTreeMap;

use ndarray::{aview1, Array2, Array3, Axis};
use serde::{Deserialize, Serialize};

use crate::colorize::Rgba;
use crate::consts::ROI_PALETTE;
use crate::error::{CavizError, Result};
use crate::exclude::Exclusion;
use crate::frame::{fit_to_shape, Diagnostic};

/// Label → weighted pixel mask. A pixel belongs to a ROI when its weight is > 0.
pub type RoiSet = BTreeMap<String, Array2<f32>>;

/// How ROIs are drawn. Decoded from `floor(code / 10)` of `show_rois`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum RoiOverlay {
    #[default]
    None,
    /// Every perimeter in one foreground color.
    Outline(Rgba),
    /// Per-label palette colors over a solid background.
    LabeledOnSolid(Rgba),
    /// Per-label palette colors over the rendered image.
    LabeledOnImage,
}

/// Which ROI collection to load. Decoded from `code mod 10` of `show_rois`;
/// interpreted by the [`RoiProvider`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoiSource(pub u8);

/// Supplies ROI masks for a source selector.
pub trait RoiProvider {
    fn load(&self, source: RoiSource) -> Result<RoiSet>;
}

/// A provider with no ROIs at all.
pub struct NoRois;

impl RoiProvider for NoRois {
    fn load(&self, _source: RoiSource) -> Result<RoiSet> {
        Ok(RoiSet::new())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoiMarker {
    pub overlay: RoiOverlay,
    pub source: RoiSource,
}

/// ROI perimeters resolved against the output frame, computed once per export.
#[derive(Clone, Debug, Default)]
pub struct PreparedRois {
    pub outlines: Vec<(String, Array2<bool>)>,
}

impl RoiMarker {
    pub fn from_code(code: i64, fg: Rgba, bg: Rgba, flag: &str) -> Result<Self> {
        if code < 0 {
            return Err(CavizError::config(flag, code, "ROI code must be >= 0"));
        }
        let overlay = match code / 10 {
            0 => RoiOverlay::None,
            1 => RoiOverlay::Outline(fg),
            2 => RoiOverlay::LabeledOnSolid(bg),
            3 => RoiOverlay::LabeledOnImage,
            _ => {
                return Err(CavizError::config(
                    flag,
                    code,
                    "ROI overlay digit must be 0-3",
                ))
            }
        };
        Ok(Self {
            overlay,
            source: RoiSource((code % 10) as u8),
        })
    }

    pub fn is_active(&self) -> bool {
        self.overlay != RoiOverlay::None
    }

    /// Fit each mask to the full `nx × ny` frame, crop it like the data and
    /// extract its perimeter. Masks of the wrong shape are resampled and
    /// reported as diagnostics.
    pub fn prepare(
        &self,
        rois: &RoiSet,
        exclusion: &Exclusion,
        nx: usize,
        ny: usize,
    ) -> Result<(PreparedRois, Vec<Diagnostic>)> {
        let mut diagnostics = Vec::new();
        let mut outlines = Vec::with_capacity(rois.len());
        if !self.is_active() {
            return Ok((PreparedRois::default(), diagnostics));
        }
        for (label, weights) in rois {
            let (fitted, diag) = fit_to_shape(weights, nx, ny, &format!("roi {label}"));
            diagnostics.extend(diag);
            let inside = exclusion.crop_frame(&fitted)?.mapv(|w| w > 0.0);
            outlines.push((label.clone(), perimeter(&inside)));
        }
        Ok((PreparedRois { outlines }, diagnostics))
    }

    /// Draw prepared outlines onto an `(nx, ny, 4)` RGBA frame.
    pub fn mark(&self, image: &Array3<f32>, rois: &PreparedRois) -> Result<Array3<f32>> {
        let mut out = image.clone();
        let (nx, ny, _) = out.dim();
        for (_, outline) in &rois.outlines {
            if outline.dim() != (nx, ny) {
                return Err(CavizError::ShapeMismatch(format!(
                    "roi outline {:?} vs frame {:?}",
                    outline.dim(),
                    (nx, ny)
                )));
            }
        }
        match self.overlay {
            RoiOverlay::None => {}
            RoiOverlay::Outline(color) => {
                for (_, outline) in &rois.outlines {
                    paint(&mut out, outline, color);
                }
            }
            RoiOverlay::LabeledOnSolid(bg) => {
                for mut px in out.lanes_mut(Axis(2)) {
                    px.assign(&aview1(&bg));
                }
                paint_labeled(&mut out, rois);
            }
            RoiOverlay::LabeledOnImage => paint_labeled(&mut out, rois),
        }
        Ok(out)
    }
}

fn paint_labeled(out: &mut Array3<f32>, rois: &PreparedRois) {
    for (i, (_, outline)) in rois.outlines.iter().enumerate() {
        let [r, g, b] = ROI_PALETTE[i % ROI_PALETTE.len()];
        paint(out, outline, [r, g, b, 1.0]);
    }
}

fn paint(out: &mut Array3<f32>, mask: &Array2<bool>, color: Rgba) {
    for ((x, y), &on) in mask.indexed_iter() {
        if on {
            for (c, &v) in color.iter().enumerate() {
                out[[x, y, c]] = v;
            }
        }
    }
}

/// Pixels inside `mask` with at least one 4-neighbour outside it.
/// Neighbours beyond the frame edge count as outside.
pub fn perimeter(mask: &Array2<bool>) -> Array2<bool> {
    let (nx, ny) = mask.dim();
    Array2::from_shape_fn((nx, ny), |(x, y)| {
        if !mask[[x, y]] {
            return false;
        }
        let outside = |dx: isize, dy: isize| {
            let px = x as isize + dx;
            let py = y as isize + dy;
            px < 0 || py < 0 || px >= nx as isize || py >= ny as isize
                || !mask[[px as usize, py as usize]]
        };
        outside(-1, 0) || outside(1, 0) || outside(0, -1) || outside(0, 1)
    })
}
