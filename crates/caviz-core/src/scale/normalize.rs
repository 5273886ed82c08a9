use std::fmt;

use ndarray::{Array, Dimension};
use serde::{Deserialize, Serialize};

use crate::error::{CavizError, Result};

use super::NormalizationRange;

/// Mapping convention from `[vmin, vmax]` to `[0, 1]`.
/// Decoded from `floor(code / 10)` of the legacy scale code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleMode {
    /// `vmin → 0`, `vmax → 1`.
    #[default]
    Linear,
    /// Negatives map to `[0, 0.5]` and non-negatives to `[0.5, 1]`, each half
    /// scaled independently, so zero always lands on 0.5.
    Bilinear,
    /// Scale as `[-m, m]` with `m = max(|vmin|, |vmax|)`; zero lands on 0.5.
    Symmetric,
}

impl ScaleMode {
    pub fn from_code(code: i64, flag: &str) -> Result<Self> {
        match code.div_euclid(10) {
            0 => Ok(Self::Linear),
            1 => Ok(Self::Bilinear),
            2 => Ok(Self::Symmetric),
            _ => Err(CavizError::config(flag, code, "scale mode digit must be 0-2")),
        }
    }
}

impl fmt::Display for ScaleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear => write!(f, "Linear"),
            Self::Bilinear => write!(f, "Bilinear around zero"),
            Self::Symmetric => write!(f, "Symmetric around zero"),
        }
    }
}

/// Value every pixel takes when the range is degenerate.
pub const DEGENERATE_LEVEL: f32 = 0.5;

/// Clip to the range and map to `[0, 1]` under `mode`.
///
/// Bilinear and symmetric modes need `vmin < 0 < vmax` and fall back to
/// linear otherwise. A degenerate range yields a constant 0.5 field; NaN
/// inputs stay NaN.
pub fn normalize<D: Dimension>(
    data: &Array<f32, D>,
    range: NormalizationRange,
    mode: ScaleMode,
) -> Array<f32, D> {
    let f = normalizer(range, mode);
    data.mapv(|v| f(v as f64) as f32)
}

/// Scalar form of [`normalize`].
pub fn normalize_value(v: f64, range: NormalizationRange, mode: ScaleMode) -> f64 {
    normalizer(range, mode)(v)
}

fn normalizer(range: NormalizationRange, mode: ScaleMode) -> impl Fn(f64) -> f64 {
    let NormalizationRange { vmin, vmax } = range;
    let straddles_zero = vmin < 0.0 && vmax > 0.0;
    let mode = if straddles_zero { mode } else { ScaleMode::Linear };
    let (lo, hi) = match mode {
        ScaleMode::Symmetric => {
            let m = vmin.abs().max(vmax.abs());
            (-m, m)
        }
        _ => (vmin, vmax),
    };
    let degenerate = range.is_degenerate();

    move |v: f64| {
        if v.is_nan() {
            return f64::NAN;
        }
        if degenerate {
            return DEGENERATE_LEVEL as f64;
        }
        let c = v.clamp(vmin, vmax);
        match mode {
            ScaleMode::Bilinear => {
                if c < 0.0 {
                    0.5 * (c - vmin) / (0.0 - vmin)
                } else {
                    0.5 + 0.5 * c / vmax
                }
            }
            ScaleMode::Linear | ScaleMode::Symmetric => ((c - lo) / (hi - lo)).clamp(0.0, 1.0),
        }
    }
}
