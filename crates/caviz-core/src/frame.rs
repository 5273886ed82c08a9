use ndarray::{s, Array2, Array3, ArrayView2, Axis, Zip};

use crate::consts::RGBA_CHANNELS;
use crate::error::{CavizError, Result};

/// A single 2-D slice of data, axes (X, Y).
pub type Frame = Array2<f32>;

/// A stack of frames with a uniform sampling period.
/// Shape = (nx, ny, nt). A still image is a movie of length 1.
#[derive(Clone, Debug)]
pub struct Movie {
    pub data: Array3<f32>,
}

impl Movie {
    pub fn new(data: Array3<f32>) -> Self {
        Self { data }
    }

    /// Wrap a single frame as a one-frame movie.
    pub fn from_frame(frame: &Frame) -> Self {
        Self {
            data: frame.clone().insert_axis(Axis(2)),
        }
    }

    pub fn nx(&self) -> usize {
        self.data.dim().0
    }

    pub fn ny(&self) -> usize {
        self.data.dim().1
    }

    pub fn nt(&self) -> usize {
        self.data.dim().2
    }

    pub fn frame(&self, t: usize) -> ArrayView2<'_, f32> {
        self.data.index_axis(Axis(2), t)
    }

    /// Mean over time, used as the static reference image when none is given.
    pub fn temporal_mean(&self) -> Frame {
        self.data
            .mean_axis(Axis(2))
            .unwrap_or_else(|| Array2::zeros((self.nx(), self.ny())))
    }

    /// Finite minimum and maximum over the whole movie.
    pub fn finite_min_max(&self) -> Option<(f64, f64)> {
        finite_min_max(self.data.iter().copied())
    }
}

pub(crate) fn finite_min_max(values: impl Iterator<Item = f32>) -> Option<(f64, f64)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| {
            let v = v as f64;
            match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            }
        })
}

/// A read-only boolean predicate over a frame or movie.
///
/// Static masks are broadcast over every time index; time-varying masks carry
/// one slice per frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Mask {
    Static(Array2<bool>),
    Varying(Array3<bool>),
}

impl Mask {
    pub fn all(nx: usize, ny: usize) -> Self {
        Mask::Static(Array2::from_elem((nx, ny), true))
    }

    pub fn spatial_dim(&self) -> (usize, usize) {
        match self {
            Mask::Static(m) => m.dim(),
            Mask::Varying(m) => (m.dim().0, m.dim().1),
        }
    }

    /// Slice at time `t`. Static masks return the same slice for every `t`.
    pub fn frame(&self, t: usize) -> ArrayView2<'_, bool> {
        match self {
            Mask::Static(m) => m.view(),
            Mask::Varying(m) => m.index_axis(Axis(2), t),
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(self, Mask::Static(_))
    }

    /// Element-wise AND. Static ∧ static stays static; anything involving a
    /// time-varying mask becomes time-varying.
    pub fn and(&self, other: &Mask) -> Result<Mask> {
        if self.spatial_dim() != other.spatial_dim() {
            return Err(CavizError::ShapeMismatch(format!(
                "mask {:?} vs mask {:?}",
                self.spatial_dim(),
                other.spatial_dim()
            )));
        }
        match (self, other) {
            (Mask::Static(a), Mask::Static(b)) => {
                Ok(Mask::Static(Zip::from(a).and(b).map_collect(|&x, &y| x && y)))
            }
            (Mask::Varying(a), Mask::Static(b)) | (Mask::Static(b), Mask::Varying(a)) => {
                let mut out = a.clone();
                for slice in out.axis_iter_mut(Axis(2)) {
                    Zip::from(slice).and(b).for_each(|x, &y| *x = *x && y);
                }
                Ok(Mask::Varying(out))
            }
            (Mask::Varying(a), Mask::Varying(b)) => {
                if a.dim().2 != b.dim().2 {
                    return Err(CavizError::ShapeMismatch(format!(
                        "mask time extent {} vs {}",
                        a.dim().2,
                        b.dim().2
                    )));
                }
                Ok(Mask::Varying(Zip::from(a).and(b).map_collect(|&x, &y| x && y)))
            }
        }
    }

    /// Count of selected pixels at time `t`.
    pub fn count(&self, t: usize) -> usize {
        self.frame(t).iter().filter(|&&v| v).count()
    }

    /// Check that the mask can be applied to `movie`.
    pub fn check_against(&self, movie: &Movie) -> Result<()> {
        if self.spatial_dim() != (movie.nx(), movie.ny()) {
            return Err(CavizError::ShapeMismatch(format!(
                "mask {:?} vs data {:?}",
                self.spatial_dim(),
                (movie.nx(), movie.ny())
            )));
        }
        if let Mask::Varying(m) = self {
            if m.dim().2 != movie.nt() {
                return Err(CavizError::ShapeMismatch(format!(
                    "mask has {} frames, data has {}",
                    m.dim().2,
                    movie.nt()
                )));
            }
        }
        Ok(())
    }
}

/// Non-fatal note produced while adapting inputs (e.g. a resampled mask).
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    pub source: String,
    pub message: String,
}

/// Resample a 2-D field to `(nx, ny)` with nearest-neighbour lookup.
///
/// Returns a diagnostic when resampling was needed.
pub fn fit_to_shape<T: Clone>(
    field: &Array2<T>,
    nx: usize,
    ny: usize,
    source: &str,
) -> (Array2<T>, Option<Diagnostic>) {
    let (sx, sy) = field.dim();
    if (sx, sy) == (nx, ny) {
        return (field.clone(), None);
    }
    let resized = Array2::from_shape_fn((nx, ny), |(x, y)| {
        let src_x = ((x * sx) / nx.max(1)).min(sx.saturating_sub(1));
        let src_y = ((y * sy) / ny.max(1)).min(sy.saturating_sub(1));
        field[[src_x, src_y]].clone()
    });
    let diag = Diagnostic {
        source: source.to_string(),
        message: format!("resampled from {sx}x{sy} to {nx}x{ny}"),
    };
    (resized, Some(diag))
}

/// Final colorized frame, shape = (nx, ny, 4) with RGBA in [0.0, 1.0].
/// Consumed exactly once by a writer.
#[derive(Clone, Debug)]
pub struct RenderedFrame {
    pub pixels: Array3<f32>,
    pub index: usize,
}

impl RenderedFrame {
    pub fn new(pixels: Array3<f32>, index: usize) -> Self {
        debug_assert_eq!(pixels.dim().2, RGBA_CHANNELS);
        Self { pixels, index }
    }

    pub fn width(&self) -> usize {
        self.pixels.dim().0
    }

    pub fn height(&self) -> usize {
        self.pixels.dim().1
    }

    /// RGBA value at (x, y).
    pub fn rgba(&self, x: usize, y: usize) -> [f32; 4] {
        let p = self.pixels.slice(s![x, y, ..]);
        [p[0], p[1], p[2], p[3]]
    }
}

/// Stimulus epoch in milliseconds from the start of the recording.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Stimulus {
    pub onset_ms: f64,
    pub offset_ms: f64,
}

impl Stimulus {
    /// Convert onset/offset to frame indices for a given sampling period.
    pub fn frame_span(&self, sampling_period_ms: f64) -> Option<(usize, usize)> {
        if sampling_period_ms <= 0.0 {
            return None;
        }
        let on = (self.onset_ms / sampling_period_ms).round().max(0.0) as usize;
        let off = (self.offset_ms / sampling_period_ms).round().max(0.0) as usize;
        Some((on, off.max(on)))
    }
}
