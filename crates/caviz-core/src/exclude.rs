use ndarray::{s, Array2, Array3};
use serde::{Deserialize, Serialize};

use crate::error::{CavizError, Result};
use crate::frame::{Mask, Movie};

/// What happens to the border pixels named by an [`Exclusion`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CropMode {
    /// Physically remove the border from the output.
    #[default]
    Trim,
    /// Keep the full frame but exclude the border from scaling and thresholds.
    ExcludeOnly,
}

/// Border and time-range crop, as configured.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Exclusion {
    pub border_x: usize,
    pub border_y: usize,
    /// Inclusive first frame; negative or out of range means "from the start".
    pub first_frame: i64,
    /// Inclusive last frame; negative or out of range means "to the end".
    pub last_frame: i64,
    #[serde(default)]
    pub mode: CropMode,
}

impl Default for Exclusion {
    fn default() -> Self {
        Self {
            border_x: 0,
            border_y: 0,
            first_frame: -1,
            last_frame: -1,
            mode: CropMode::Trim,
        }
    }
}

/// An [`Exclusion`] resolved against concrete dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropWindow {
    pub x0: usize,
    pub x1: usize,
    pub y0: usize,
    pub y1: usize,
    pub t0: usize,
    /// Inclusive.
    pub t1: usize,
}

impl CropWindow {
    pub fn width(&self) -> usize {
        self.x1 - self.x0
    }

    pub fn height(&self) -> usize {
        self.y1 - self.y0
    }

    pub fn frames(&self) -> usize {
        self.t1 - self.t0 + 1
    }
}

impl Exclusion {
    pub fn border(border: usize) -> Self {
        Self {
            border_x: border,
            border_y: border,
            ..Default::default()
        }
    }

    /// Resolve against `(nx, ny, nt)`, validating border and frame range.
    pub fn resolve(&self, nx: usize, ny: usize, nt: usize) -> Result<CropWindow> {
        if 2 * self.border_x >= nx || 2 * self.border_y >= ny {
            return Err(CavizError::InvalidCrop(format!(
                "border ({}, {}) leaves nothing of a {nx}x{ny} frame",
                self.border_x, self.border_y
            )));
        }
        if nt == 0 {
            return Err(CavizError::EmptySequence);
        }
        let last_index = nt as i64 - 1;
        let t0 = if (0..=last_index).contains(&self.first_frame) {
            self.first_frame
        } else {
            0
        };
        let t1 = if (0..=last_index).contains(&self.last_frame) {
            self.last_frame
        } else {
            last_index
        };
        // A single-frame still has nothing to order.
        if nt > 1 && t0 >= t1 {
            return Err(CavizError::InvalidFrameRange {
                first: self.first_frame,
                last: self.last_frame,
                total: nt,
            });
        }
        let (bx, by) = match self.mode {
            CropMode::Trim => (self.border_x, self.border_y),
            CropMode::ExcludeOnly => (0, 0),
        };
        Ok(CropWindow {
            x0: bx,
            x1: nx - bx,
            y0: by,
            y1: ny - by,
            t0: t0 as usize,
            t1: t1 as usize,
        })
    }

    /// Crop a movie. The result never aliases the input.
    pub fn crop_movie(&self, movie: &Movie) -> Result<Movie> {
        let w = self.resolve(movie.nx(), movie.ny(), movie.nt())?;
        Ok(Movie::new(
            movie
                .data
                .slice(s![w.x0..w.x1, w.y0..w.y1, w.t0..=w.t1])
                .to_owned(),
        ))
    }

    /// Crop a single frame spatially; the time range is ignored.
    pub fn crop_frame<T: Clone>(&self, frame: &Array2<T>) -> Result<Array2<T>> {
        let (nx, ny) = frame.dim();
        let w = self.resolve(nx, ny, 1)?;
        Ok(frame.slice(s![w.x0..w.x1, w.y0..w.y1]).to_owned())
    }

    /// Crop a mask spatially, and in time when it is time-varying.
    pub fn crop_mask(&self, mask: &Mask) -> Result<Mask> {
        match mask {
            Mask::Static(m) => Ok(Mask::Static(self.crop_frame(m)?)),
            Mask::Varying(m) => {
                let (nx, ny, nt) = m.dim();
                let w = self.resolve(nx, ny, nt)?;
                let cropped: Array3<bool> = m
                    .slice(s![w.x0..w.x1, w.y0..w.y1, w.t0..=w.t1])
                    .to_owned();
                Ok(Mask::Varying(cropped))
            }
        }
    }

    /// Pixels outside the retained border region, `true` = excluded.
    ///
    /// Always relative to the full `nx × ny` frame, regardless of crop mode.
    pub fn exclusion_mask(&self, nx: usize, ny: usize) -> Result<Array2<bool>> {
        if 2 * self.border_x >= nx || 2 * self.border_y >= ny {
            return Err(CavizError::InvalidCrop(format!(
                "border ({}, {}) leaves nothing of a {nx}x{ny} frame",
                self.border_x, self.border_y
            )));
        }
        let (bx, by) = (self.border_x, self.border_y);
        Ok(Array2::from_shape_fn((nx, ny), |(x, y)| {
            x < bx || x >= nx - bx || y < by || y >= ny - by
        }))
    }

    /// Mask of retained pixels in output coordinates: the inverse of
    /// [`Self::exclusion_mask`] when the border is only excluded, all-true when
    /// it has been trimmed away.
    pub fn retained_mask(&self, nx: usize, ny: usize) -> Result<Mask> {
        match self.mode {
            CropMode::Trim => Ok(Mask::all(nx, ny)),
            CropMode::ExcludeOnly => {
                let excluded = self.exclusion_mask(nx, ny)?;
                Ok(Mask::Static(excluded.mapv(|e| !e)))
            }
        }
    }

    /// Output size of a frame after cropping.
    pub fn cropped_size(&self, nx: usize, ny: usize) -> Result<(usize, usize)> {
        let w = self.resolve(nx, ny, 1)?;
        Ok((w.width(), w.height()))
    }
}

