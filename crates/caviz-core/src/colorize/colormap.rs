use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CavizError, Result};

pub type Rgba = [f32; 4];

/// Anchor colors sampled at evenly spaced positions, interpolated linearly.
#[rustfmt::skip]
const VIRIDIS: [[f32; 3]; 9] = [
    [0.267, 0.005, 0.329], [0.279, 0.175, 0.483], [0.230, 0.322, 0.546],
    [0.173, 0.449, 0.558], [0.128, 0.567, 0.551], [0.158, 0.684, 0.502],
    [0.369, 0.789, 0.383], [0.678, 0.864, 0.190], [0.993, 0.906, 0.144],
];

#[rustfmt::skip]
const MAGMA: [[f32; 3]; 9] = [
    [0.001, 0.000, 0.014], [0.114, 0.065, 0.277], [0.317, 0.071, 0.485],
    [0.513, 0.148, 0.508], [0.716, 0.215, 0.475], [0.904, 0.312, 0.392],
    [0.986, 0.535, 0.382], [0.996, 0.765, 0.528], [0.987, 0.991, 0.750],
];

#[rustfmt::skip]
const COOLWARM: [[f32; 3]; 5] = [
    [0.230, 0.299, 0.754], [0.552, 0.690, 0.996], [0.866, 0.866, 0.866],
    [0.958, 0.604, 0.482], [0.706, 0.016, 0.150],
];

/// A function from a normalized scalar in `[0, 1]` to RGBA.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum Colormap {
    Gray,
    Hot,
    #[default]
    Jet,
    Viridis,
    Magma,
    CoolWarm,
    /// Every value maps to the same color.
    Solid(Rgba),
}

impl Colormap {
    pub fn from_name(name: &str, flag: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "gray" | "grey" | "grayscale" => Ok(Self::Gray),
            "hot" => Ok(Self::Hot),
            "jet" => Ok(Self::Jet),
            "viridis" => Ok(Self::Viridis),
            "magma" => Ok(Self::Magma),
            "coolwarm" => Ok(Self::CoolWarm),
            _ => Err(CavizError::config(flag, name, "unknown colormap")),
        }
    }

    /// Color for `v`. Values are clamped to `[0, 1]`; NaN is transparent.
    pub fn rgba(&self, v: f32) -> Rgba {
        if v.is_nan() {
            return [0.0, 0.0, 0.0, 0.0];
        }
        let t = v.clamp(0.0, 1.0);
        let [r, g, b] = match self {
            Self::Gray => [t, t, t],
            Self::Hot => [
                (t * 3.0).min(1.0),
                (t * 3.0 - 1.0).clamp(0.0, 1.0),
                (t * 3.0 - 2.0).clamp(0.0, 1.0),
            ],
            Self::Jet => {
                let four_t = 4.0 * t;
                [
                    (1.5 - (four_t - 3.0).abs()).clamp(0.0, 1.0),
                    (1.5 - (four_t - 2.0).abs()).clamp(0.0, 1.0),
                    (1.5 - (four_t - 1.0).abs()).clamp(0.0, 1.0),
                ]
            }
            Self::Viridis => interpolate(&VIRIDIS, t),
            Self::Magma => interpolate(&MAGMA, t),
            Self::CoolWarm => interpolate(&COOLWARM, t),
            Self::Solid(c) => return *c,
        };
        [r, g, b, 1.0]
    }
}

impl fmt::Display for Colormap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gray => write!(f, "gray"),
            Self::Hot => write!(f, "hot"),
            Self::Jet => write!(f, "jet"),
            Self::Viridis => write!(f, "viridis"),
            Self::Magma => write!(f, "magma"),
            Self::CoolWarm => write!(f, "coolwarm"),
            Self::Solid(c) => write!(f, "solid({:.2}, {:.2}, {:.2})", c[0], c[1], c[2]),
        }
    }
}

fn interpolate(anchors: &[[f32; 3]], t: f32) -> [f32; 3] {
    let segments = (anchors.len() - 1) as f32;
    let pos = t * segments;
    let i = (pos.floor() as usize).min(anchors.len() - 2);
    let frac = pos - i as f32;
    let (a, b) = (anchors[i], anchors[i + 1]);
    [
        a[0] + (b[0] - a[0]) * frac,
        a[1] + (b[1] - a[1]) * frac,
        a[2] + (b[2] - a[2]) * frac,
    ]
}

/// Parse a named color or `#rrggbb` into opaque RGBA.
pub fn parse_color(text: &str, flag: &str) -> Result<Rgba> {
    let t = text.trim().to_ascii_lowercase();
    let rgb = match t.as_str() {
        "black" => [0.0, 0.0, 0.0],
        "white" => [1.0, 1.0, 1.0],
        "gray" | "grey" => [0.5, 0.5, 0.5],
        "red" => [1.0, 0.0, 0.0],
        "green" => [0.0, 1.0, 0.0],
        "blue" => [0.0, 0.0, 1.0],
        "yellow" => [1.0, 1.0, 0.0],
        "cyan" => [0.0, 1.0, 1.0],
        "magenta" => [1.0, 0.0, 1.0],
        hex if hex.starts_with('#') && hex.len() == 7 && hex.is_ascii() => {
            let channel = |i: usize| {
                u8::from_str_radix(&hex[i..i + 2], 16)
                    .map(|v| v as f32 / 255.0)
                    .map_err(|_| CavizError::config(flag, text, "invalid hex color"))
            };
            [channel(1)?, channel(3)?, channel(5)?]
        }
        _ => return Err(CavizError::config(flag, text, "unknown color")),
    };
    Ok([rgb[0], rgb[1], rgb[2], 1.0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gray_endpoints() {
        assert_eq!(Colormap::Gray.rgba(0.0), [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(Colormap::Gray.rgba(1.0), [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(Colormap::Gray.rgba(2.0), [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_interpolate_hits_anchors() {
        assert_eq!(Colormap::Viridis.rgba(0.0)[..3], VIRIDIS[0]);
        let top = Colormap::Viridis.rgba(1.0);
        for c in 0..3 {
            assert!((top[c] - VIRIDIS[8][c]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("white", "c").unwrap(), [1.0, 1.0, 1.0, 1.0]);
        let c = parse_color("#ff0080", "c").unwrap();
        assert_eq!(c[0], 1.0);
        assert!((c[2] - 128.0 / 255.0).abs() < 1e-6);
        assert!(parse_color("#zz0000", "c").is_err());
        assert!(parse_color("mauve", "c").is_err());
    }

    #[test]
    fn test_nan_is_transparent() {
        assert_eq!(Colormap::Jet.rgba(f32::NAN)[3], 0.0);
    }
}
