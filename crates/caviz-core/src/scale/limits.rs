use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CavizError, Result};
use crate::frame::{Mask, Movie};

use super::NormalizationRange;

/// Which subset of the data the bounds are taken from, and which bounds are
/// fixed. Decoded from `code mod 10` of the legacy scale code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LimitStrategy {
    /// Both bounds fixed (codes 0 and 1).
    Fixed,
    /// Whole array (code 2).
    #[default]
    Full,
    /// Central region only (code 3).
    Center,
    /// Lower fixed, upper from the whole array (code 4).
    FixedLowerFullUpper,
    /// Pixels inside the area-of-interest mask (code 5).
    Masked,
    /// Lower fixed, upper from masked pixels (code 6).
    FixedLowerMaskedUpper,
}

impl LimitStrategy {
    /// Decode the strategy digit. `flag` names the source for error messages.
    pub fn from_code(code: i64, flag: &str) -> Result<Self> {
        match code.rem_euclid(10) {
            0 | 1 => Ok(Self::Fixed),
            2 => Ok(Self::Full),
            3 => Ok(Self::Center),
            4 => Ok(Self::FixedLowerFullUpper),
            5 => Ok(Self::Masked),
            6 => Ok(Self::FixedLowerMaskedUpper),
            _ => Err(CavizError::config(
                flag,
                code,
                "limit strategy digit must be 0-6",
            )),
        }
    }

    fn subset(&self) -> Option<Subset> {
        match self {
            Self::Fixed => None,
            Self::Full | Self::FixedLowerFullUpper => Some(Subset::All),
            Self::Center => Some(Subset::Center),
            Self::Masked | Self::FixedLowerMaskedUpper => Some(Subset::Masked),
        }
    }

    fn fixes_lower(&self) -> bool {
        matches!(
            self,
            Self::Fixed | Self::FixedLowerFullUpper | Self::FixedLowerMaskedUpper
        )
    }
}

impl fmt::Display for LimitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed => write!(f, "Fixed"),
            Self::Full => write!(f, "Full"),
            Self::Center => write!(f, "Center"),
            Self::FixedLowerFullUpper => write!(f, "Fixed lower / full upper"),
            Self::Masked => write!(f, "Masked"),
            Self::FixedLowerMaskedUpper => write!(f, "Fixed lower / masked upper"),
        }
    }
}

/// How bounds are estimated from the selected values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum BoundEstimator {
    #[default]
    MinMax,
    /// Lower = p-th percentile, upper = (100 - p)-th percentile.
    Percentile(f64),
}

impl BoundEstimator {
    pub fn estimate(&self, values: &mut [f64]) -> Option<(f64, f64)> {
        if values.is_empty() {
            return None;
        }
        match self {
            Self::MinMax => {
                let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
                let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                Some((lo, hi))
            }
            Self::Percentile(p) => {
                values.sort_by(|a, b| a.total_cmp(b));
                let p = p.clamp(0.0, 100.0);
                Some((percentile(values, p), percentile(values, 100.0 - p)))
            }
        }
    }
}

/// Percentile of sorted values with linear interpolation between ranks.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let rank = (p / 100.0) * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Which values the estimator sees.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Subset {
    All,
    Center,
    Masked,
}

/// Selects `(vmin, vmax)` for normalization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LimitDecider {
    pub strategy: LimitStrategy,
    pub estimator: BoundEstimator,
    pub fixed_min: f64,
    pub fixed_max: f64,
    /// Fraction of each spatial edge trimmed for [`LimitStrategy::Center`].
    pub center_fraction: f64,
}

impl Default for LimitDecider {
    fn default() -> Self {
        Self {
            strategy: LimitStrategy::Full,
            estimator: BoundEstimator::MinMax,
            fixed_min: 0.0,
            fixed_max: 1.0,
            center_fraction: crate::consts::DEFAULT_CENTER_FRACTION,
        }
    }
}

impl LimitDecider {
    pub fn new(strategy: LimitStrategy, estimator: BoundEstimator) -> Self {
        Self {
            strategy,
            estimator,
            ..Default::default()
        }
    }

    pub fn with_fixed(mut self, fixed_min: f64, fixed_max: f64) -> Self {
        self.fixed_min = fixed_min;
        self.fixed_max = fixed_max;
        self
    }

    pub fn with_center_fraction(mut self, fraction: f64) -> Self {
        self.center_fraction = fraction;
        self
    }

    /// Decide limits for `movie`. `mask` is the area-of-interest mask used by
    /// the masked strategies.
    pub fn decide(&self, movie: &Movie, mask: &Mask) -> Result<NormalizationRange> {
        let Some(subset) = self.strategy.subset() else {
            return Ok(NormalizationRange::new(self.fixed_min, self.fixed_max));
        };
        if movie.nx() == 0 || movie.ny() == 0 {
            return Err(CavizError::EmptySelection(format!(
                "{} limits on a {}x{} movie",
                self.strategy,
                movie.nx(),
                movie.ny()
            )));
        }

        let mut values = self.select(movie, mask, subset)?;
        let (lo, hi) = self
            .estimator
            .estimate(&mut values)
            .ok_or_else(|| CavizError::EmptySelection(format!("{} limits", self.strategy)))?;

        let vmin = if self.strategy.fixes_lower() {
            self.fixed_min
        } else {
            lo
        };
        debug!(strategy = %self.strategy, vmin, vmax = hi, "Decided limits");
        Ok(NormalizationRange::new(vmin, hi))
    }

    fn select(&self, movie: &Movie, mask: &Mask, subset: Subset) -> Result<Vec<f64>> {
        let finite = |v: f32| v.is_finite().then_some(v as f64);
        match subset {
            Subset::All => Ok(movie.data.iter().filter_map(|&v| finite(v)).collect()),
            Subset::Center => {
                let (x0, x1) = center_span(movie.nx(), self.center_fraction);
                let (y0, y1) = center_span(movie.ny(), self.center_fraction);
                let mut out = Vec::with_capacity((x1 - x0) * (y1 - y0) * movie.nt());
                for t in 0..movie.nt() {
                    let frame = movie.frame(t);
                    for x in x0..x1 {
                        for y in y0..y1 {
                            out.extend(finite(frame[[x, y]]));
                        }
                    }
                }
                Ok(out)
            }
            Subset::Masked => {
                mask.check_against(movie)?;
                let mut out = Vec::new();
                for t in 0..movie.nt() {
                    let frame = movie.frame(t);
                    let m = mask.frame(t);
                    for ((x, y), &keep) in m.indexed_iter() {
                        if keep {
                            out.extend(finite(frame[[x, y]]));
                        }
                    }
                }
                Ok(out)
            }
        }
    }
}

/// Index span left after trimming `fraction` of `n` from each end.
/// Always keeps at least one sample.
fn center_span(n: usize, fraction: f64) -> (usize, usize) {
    let cut = ((n as f64) * fraction.clamp(0.0, 0.5)).floor() as usize;
    let start = cut.min(n.saturating_sub(1) / 2);
    let end = (n - start).max(start + 1);
    (start, end)
}
