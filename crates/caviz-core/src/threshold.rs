use std::fmt;

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CavizError, Result};
use crate::frame::{finite_min_max, Mask, Movie};

/// A threshold level: absolute, or a percentage of the reference field's own
/// `[min, max]` range.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ThresholdValue {
    Absolute(f64),
    Relative(f64),
}

impl ThresholdValue {
    /// Parse `"r50"` / `"a-1000"`. Empty or `"off"` disables the threshold.
    pub fn parse(text: &str, flag: &str) -> Result<Option<Self>> {
        let t = text.trim();
        if t.is_empty() || t.eq_ignore_ascii_case("off") || t.eq_ignore_ascii_case("none") {
            return Ok(None);
        }
        let mut chars = t.chars();
        let kind = chars.next().unwrap_or_default();
        let value: f64 = chars
            .as_str()
            .trim()
            .parse()
            .map_err(|_| CavizError::config(flag, text, "expected r<percent> or a<value>"))?;
        if !value.is_finite() {
            return Err(CavizError::config(flag, text, "threshold must be finite"));
        }
        match kind {
            'r' | 'R' => Ok(Some(Self::Relative(value))),
            'a' | 'A' => Ok(Some(Self::Absolute(value))),
            _ => Err(CavizError::config(
                flag,
                text,
                "threshold must start with 'r' (relative) or 'a' (absolute)",
            )),
        }
    }

    /// Absolute level for a field spanning `[min, max]`.
    pub fn resolve(&self, min: f64, max: f64) -> f64 {
        match self {
            Self::Absolute(v) => *v,
            Self::Relative(pct) => min + (max - min) * pct / 100.0,
        }
    }
}

impl fmt::Display for ThresholdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absolute(v) => write!(f, "a{v}"),
            Self::Relative(v) => write!(f, "r{v}"),
        }
    }
}

/// Field the threshold predicate is evaluated on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThresholdReference {
    /// Thresholding disabled: every pixel shows true color.
    #[default]
    None,
    /// The static baseline/reference image.
    Baseline,
    /// The raw, unprocessed movie.
    Raw,
    /// The processed signal being rendered.
    Signal,
}

impl ThresholdReference {
    pub fn from_name(name: &str, flag: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "off" => Ok(Self::None),
            "baseline" | "foto" | "reference" => Ok(Self::Baseline),
            "raw" => Ok(Self::Raw),
            "signal" | "data" => Ok(Self::Signal),
            _ => Err(CavizError::config(
                flag,
                name,
                "threshold reference must be none, baseline, raw or signal",
            )),
        }
    }
}

/// Reference data handed to [`Thresholder::mask`].
#[derive(Clone, Copy, Debug)]
pub enum ReferenceField<'a> {
    Static(&'a Array2<f32>),
    Movie(&'a Movie),
}

impl ReferenceField<'_> {
    fn spatial_dim(&self) -> (usize, usize) {
        match self {
            Self::Static(f) => f.dim(),
            Self::Movie(m) => (m.nx(), m.ny()),
        }
    }

    fn min_max(&self) -> Option<(f64, f64)> {
        match self {
            Self::Static(f) => finite_min_max(f.iter().copied()),
            Self::Movie(m) => m.finite_min_max(),
        }
    }
}

/// Computes the "show true color here" mask.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Thresholder {
    pub reference: ThresholdReference,
    pub positive: Option<ThresholdValue>,
    pub negative: Option<ThresholdValue>,
}

impl Thresholder {
    pub fn is_active(&self) -> bool {
        self.reference != ThresholdReference::None
    }

    /// `area AND threshold`. With thresholding disabled (or no field given)
    /// the area mask is returned as is.
    ///
    /// A pixel passes when the reference exceeds the positive level or falls
    /// below the negative level. With neither level set every pixel passes.
    pub fn mask(&self, area: &Mask, field: Option<ReferenceField<'_>>) -> Result<Mask> {
        let Some(field) = field.filter(|_| self.is_active()) else {
            return Ok(area.clone());
        };
        if field.spatial_dim() != area.spatial_dim() {
            return Err(CavizError::ShapeMismatch(format!(
                "threshold reference {:?} vs area mask {:?}",
                field.spatial_dim(),
                area.spatial_dim()
            )));
        }
        if self.positive.is_none() && self.negative.is_none() {
            return Ok(area.clone());
        }

        let (lo, hi) = field.min_max().unwrap_or((0.0, 0.0));
        let pos = self.positive.map(|t| t.resolve(lo, hi));
        let neg = self.negative.map(|t| t.resolve(lo, hi));
        debug!(?pos, ?neg, reference = ?self.reference, "Threshold levels");

        let passes = move |v: f32| -> bool {
            let v = v as f64;
            pos.is_some_and(|p| v > p) || neg.is_some_and(|n| v < n)
        };
        let threshold = match field {
            ReferenceField::Static(f) => Mask::Static(f.mapv(passes)),
            ReferenceField::Movie(m) => Mask::Varying(m.data.mapv(passes)),
        };
        area.and(&threshold)
    }
}

/// Fraction of selected pixels in a mask slice, for logging.
pub fn coverage(mask: ArrayView2<'_, bool>) -> f64 {
    if mask.is_empty() {
        return 0.0;
    }
    mask.iter().filter(|&&v| v).count() as f64 / mask.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_threshold_strings() {
        assert_eq!(
            ThresholdValue::parse("r50", "t").unwrap(),
            Some(ThresholdValue::Relative(50.0))
        );
        assert_eq!(
            ThresholdValue::parse("a-1000", "t").unwrap(),
            Some(ThresholdValue::Absolute(-1000.0))
        );
        assert_eq!(ThresholdValue::parse("", "t").unwrap(), None);
        assert!(ThresholdValue::parse("x50", "t").is_err());
        assert!(ThresholdValue::parse("rabc", "t").is_err());
    }

    #[test]
    fn test_bad_threshold_names_flag() {
        let err = ThresholdValue::parse("q12", "threshold_pos")
            .unwrap_err()
            .to_string();
        assert!(err.contains("threshold_pos") && err.contains("q12"), "got: {err}");
    }

    #[test]
    fn test_relative_resolves_within_range() {
        let t = ThresholdValue::Relative(25.0);
        assert_eq!(t.resolve(0.0, 200.0), 50.0);
        assert_eq!(t.resolve(-100.0, 100.0), -50.0);
    }
}
