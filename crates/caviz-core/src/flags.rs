//! Named configuration values ("flags").
//!
//! Flags are the external configuration surface: a flat mapping from string
//! keys to pre-typed values, usually loaded from a TOML file. Legacy integer
//! encodings (e.g. `individual_scale = 10 * mode + strategy`) live only here;
//! [`crate::pipeline::config::RenderConfig::from_flags`] decodes them into
//! structured values once.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_BITRATE_KBPS, DEFAULT_BORDER_SIZE, DEFAULT_CENTER_FRACTION, DEFAULT_INDIVIDUAL_SCALE,
    DEFAULT_PERCENTILE,
};
use crate::error::{CavizError, Result};

/// Flag keys understood by the render pipeline.
pub mod keys {
    pub const CUT_BORDER: &str = "cut_border";
    pub const CROP_MODE: &str = "crop_mode";
    pub const FIRST_FRAME: &str = "first_frame";
    pub const LAST_FRAME: &str = "last_frame";
    pub const FILTER_SPACE_FLAG: &str = "filter_space_flag";
    pub const FILTER_SPACE_SIZE: &str = "filter_space_size";
    pub const FILTER_TIME_FLAG: &str = "filter_time_flag";
    pub const FILTER_TIME_SIZE: &str = "filter_time_size";
    pub const INDIVIDUAL_SCALE: &str = "individual_scale";
    pub const SCALE_MIN: &str = "scale_min";
    pub const SCALE_MAX: &str = "scale_max";
    pub const CENTER_FRACTION: &str = "center_fraction";
    pub const USE_PERCENTILE: &str = "use_percentile";
    pub const PERCENTILE: &str = "percentile";
    pub const THRESHOLD_REFERENCE: &str = "threshold_reference";
    pub const THRESHOLD_POS: &str = "threshold_pos";
    pub const THRESHOLD_NEG: &str = "threshold_neg";
    pub const RESTRICT_AREA: &str = "restrict_area";
    pub const BACKGROUND: &str = "background";
    pub const BACKGROUND_SCALE: &str = "background_scale";
    pub const COLORMAP: &str = "colormap";
    pub const BACKGROUND_COLORMAP: &str = "background_colormap";
    pub const FG_COLOR: &str = "fg_color";
    pub const BG_COLOR: &str = "bg_color";
    pub const ROTATE: &str = "rotate";
    pub const REVERSE: &str = "reverse";
    pub const SHOW_ROIS: &str = "show_rois";
    pub const BORDER_COLORBAR: &str = "border_colorbar";
    pub const BORDER_TIMESTAMP: &str = "border_timestamp";
    pub const BORDER_STIMULUS: &str = "border_stimulus";
    pub const BORDER_SIZE: &str = "border_size";
    pub const EXPORT_FORMAT: &str = "export_format";
    pub const BITRATE: &str = "bitrate";
    pub const SPEED_FACTOR: &str = "speed_factor";
    pub const ENCODER_THREADS: &str = "encoder_threads";
}

/// A single pre-typed flag value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
        }
    }
}

impl FlagValue {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
        }
    }

    /// Parse a command-line style `value` string: bool, then int, then float,
    /// otherwise text.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if let Ok(b) = trimmed.parse::<bool>() {
            return Self::Bool(b);
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Self::Int(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            return Self::Float(f);
        }
        Self::Text(trimmed.to_string())
    }
}

/// Read-only typed key→value mapping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Flags {
    values: BTreeMap<String, FlagValue>,
}

impl Default for Flags {
    fn default() -> Self {
        use keys::*;
        let mut f = Self::empty();
        f.set(CUT_BORDER, FlagValue::Int(0));
        f.set(CROP_MODE, FlagValue::Text("trim".into()));
        f.set(FIRST_FRAME, FlagValue::Int(-1));
        f.set(LAST_FRAME, FlagValue::Int(-1));
        f.set(FILTER_SPACE_FLAG, FlagValue::Bool(false));
        f.set(FILTER_SPACE_SIZE, FlagValue::Float(0.0));
        f.set(FILTER_TIME_FLAG, FlagValue::Bool(false));
        f.set(FILTER_TIME_SIZE, FlagValue::Float(0.0));
        f.set(INDIVIDUAL_SCALE, FlagValue::Int(DEFAULT_INDIVIDUAL_SCALE));
        f.set(SCALE_MIN, FlagValue::Float(0.0));
        f.set(SCALE_MAX, FlagValue::Float(1.0));
        f.set(CENTER_FRACTION, FlagValue::Float(DEFAULT_CENTER_FRACTION));
        f.set(USE_PERCENTILE, FlagValue::Bool(false));
        f.set(PERCENTILE, FlagValue::Float(DEFAULT_PERCENTILE));
        f.set(THRESHOLD_REFERENCE, FlagValue::Text("none".into()));
        f.set(THRESHOLD_POS, FlagValue::Text(String::new()));
        f.set(THRESHOLD_NEG, FlagValue::Text(String::new()));
        f.set(RESTRICT_AREA, FlagValue::Bool(true));
        f.set(BACKGROUND, FlagValue::Text("baseline".into()));
        f.set(BACKGROUND_SCALE, FlagValue::Int(DEFAULT_INDIVIDUAL_SCALE));
        f.set(COLORMAP, FlagValue::Text("jet".into()));
        f.set(BACKGROUND_COLORMAP, FlagValue::Text("gray".into()));
        f.set(FG_COLOR, FlagValue::Text("white".into()));
        f.set(BG_COLOR, FlagValue::Text("black".into()));
        f.set(ROTATE, FlagValue::Int(0));
        f.set(REVERSE, FlagValue::Bool(false));
        f.set(SHOW_ROIS, FlagValue::Int(0));
        f.set(BORDER_COLORBAR, FlagValue::Bool(false));
        f.set(BORDER_TIMESTAMP, FlagValue::Bool(false));
        f.set(BORDER_STIMULUS, FlagValue::Bool(false));
        f.set(BORDER_SIZE, FlagValue::Int(DEFAULT_BORDER_SIZE as i64));
        f.set(EXPORT_FORMAT, FlagValue::Text("png".into()));
        f.set(BITRATE, FlagValue::Int(DEFAULT_BITRATE_KBPS));
        f.set(SPEED_FACTOR, FlagValue::Float(1.0));
        f.set(ENCODER_THREADS, FlagValue::Int(0));
        f
    }
}

impl Flags {
    /// A mapping with no keys at all. Getters on it report [`CavizError::MissingFlag`].
    pub fn empty() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    /// Defaults overlaid with the keys present in a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let overrides: BTreeMap<String, FlagValue> = toml::from_str(contents)?;
        let mut flags = Self::default();
        for (k, v) in overrides {
            flags.values.insert(k, v);
        }
        Ok(flags)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn set(&mut self, key: &str, value: FlagValue) {
        self.values.insert(key.to_string(), value);
    }

    /// Apply a `key=value` override.
    pub fn set_from_str(&mut self, assignment: &str) -> Result<()> {
        let Some((key, value)) = assignment.split_once('=') else {
            return Err(CavizError::config(assignment, assignment, "expected key=value"));
        };
        self.set(key.trim(), FlagValue::parse(value));
        Ok(())
    }

    pub fn with(mut self, key: &str, value: FlagValue) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Result<&FlagValue> {
        self.values
            .get(key)
            .ok_or_else(|| CavizError::MissingFlag(key.to_string()))
    }

    pub fn int(&self, key: &str) -> Result<i64> {
        match self.get(key)? {
            FlagValue::Int(v) => Ok(*v),
            FlagValue::Float(v) if v.fract() == 0.0 => Ok(*v as i64),
            other => Err(mistyped(key, other, "int")),
        }
    }

    pub fn float(&self, key: &str) -> Result<f64> {
        match self.get(key)? {
            FlagValue::Float(v) => Ok(*v),
            FlagValue::Int(v) => Ok(*v as f64),
            other => Err(mistyped(key, other, "float")),
        }
    }

    pub fn bool(&self, key: &str) -> Result<bool> {
        match self.get(key)? {
            FlagValue::Bool(v) => Ok(*v),
            FlagValue::Int(v) => Ok(*v != 0),
            other => Err(mistyped(key, other, "bool")),
        }
    }

    /// Text value. Numbers are accepted and rendered as text so that
    /// threshold strings like `50` still reach their parser.
    pub fn text(&self, key: &str) -> Result<String> {
        match self.get(key)? {
            FlagValue::Text(v) => Ok(v.clone()),
            FlagValue::Bool(v) => Err(mistyped(key, &FlagValue::Bool(*v), "text")),
            other => Ok(other.to_string()),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FlagValue)> {
        self.values.iter()
    }

    pub fn to_toml_string(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(&self.values)
    }
}

fn mistyped(key: &str, value: &FlagValue, expected: &str) -> CavizError {
    CavizError::config(
        key,
        value,
        format!("expected {expected}, got {}", value.type_name()),
    )
}
