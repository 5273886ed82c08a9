use ndarray::{Array, ArrayView, Axis, Dimension};
use serde::{Deserialize, Serialize};

use crate::error::{CavizError, Result};

/// An element of the dihedral group of the square, acting on the (X, Y) axes.
///
/// Applied as: transpose first (if `transpose`), then mirror X, then mirror Y.
/// Mirroring X reverses the first axis, mirroring Y reverses the second.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transform {
    pub transpose: bool,
    pub mirror_x: bool,
    pub mirror_y: bool,
}

/// `(transpose, mirror_x, mirror_y)` for rotation codes 0..=7.
/// Codes 0-3 are the quarter-turn rotations, 4-7 their reflections.
const CODES: [(bool, bool, bool); 8] = [
    (false, false, false),
    (true, true, false),
    (false, true, true),
    (true, false, true),
    (true, false, false),
    (false, false, true),
    (true, true, true),
    (false, true, false),
];

impl Transform {
    pub const IDENTITY: Self = Self {
        transpose: false,
        mirror_x: false,
        mirror_y: false,
    };

    pub fn new(transpose: bool, mirror_x: bool, mirror_y: bool) -> Self {
        Self {
            transpose,
            mirror_x,
            mirror_y,
        }
    }

    /// Decode a rotation code; `reverse` additionally mirrors the Y axis.
    pub fn from_code(code: i64, reverse: bool, flag: &str) -> Result<Self> {
        let (t, x, y) = usize::try_from(code)
            .ok()
            .and_then(|c| CODES.get(c).copied())
            .ok_or_else(|| CavizError::config(flag, code, "rotation code must be 0-7"))?;
        Ok(Self::new(t, x, y ^ reverse))
    }

    /// The code 0..=7 this transform corresponds to.
    pub fn code(&self) -> usize {
        CODES
            .iter()
            .position(|&c| c == (self.transpose, self.mirror_x, self.mirror_y))
            .unwrap_or(0)
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// `other ∘ self`: apply `self` first, then `other`.
    pub fn then(&self, other: &Transform) -> Transform {
        if other.transpose {
            // Transposing swaps which axis the earlier mirrors act on.
            Transform::new(
                !self.transpose,
                other.mirror_x ^ self.mirror_y,
                other.mirror_y ^ self.mirror_x,
            )
        } else {
            Transform::new(
                self.transpose,
                other.mirror_x ^ self.mirror_x,
                other.mirror_y ^ self.mirror_y,
            )
        }
    }

    pub fn inverse(&self) -> Transform {
        if self.transpose {
            Transform::new(true, self.mirror_y, self.mirror_x)
        } else {
            *self
        }
    }

    /// Output `(width, height)` for an input of `(width, height)`.
    pub fn transform_size(&self, width: usize, height: usize) -> (usize, usize) {
        if self.transpose {
            (height, width)
        } else {
            (width, height)
        }
    }

    /// Apply to any array whose first two axes are (X, Y); trailing axes
    /// (time, color) are carried along unchanged.
    pub fn apply<A: Clone, D: Dimension>(&self, array: ArrayView<'_, A, D>) -> Array<A, D> {
        let mut view = array;
        if view.ndim() < 2 {
            return view.to_owned();
        }
        if self.transpose {
            view.swap_axes(0, 1);
        }
        if self.mirror_x {
            view.invert_axis(Axis(0));
        }
        if self.mirror_y {
            view.invert_axis(Axis(1));
        }
        view.to_owned()
    }
}
