use std::ops::RangeInclusive;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use caviz_core::flags::Flags;
use caviz_core::frame::Stimulus;
use caviz_core::io::{read_frame, read_mask, read_stack};
use caviz_core::measurement::Measurement;
use caviz_core::pipeline::RenderConfig;
use caviz_core::roi::{NoRois, RoiProvider, RoiSet};
use caviz_core::signal::delta_f_over_f;
use clap::Args;
use tracing::warn;

use crate::roi_dir::DirectoryRois;

/// Inputs and configuration shared by `still` and `movie`.
#[derive(Args)]
pub struct RenderArgs {
    /// Input TIFF stack or image
    pub file: PathBuf,

    /// Flags file (TOML); unset keys keep their defaults
    #[arg(long)]
    pub flags: Option<PathBuf>,

    /// Override a flag, e.g. --set individual_scale=15 (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub overrides: Vec<String>,

    /// Sampling period in milliseconds
    #[arg(long, default_value = "100")]
    pub period: f64,

    /// Stimulus epoch as ONSET_MS:OFFSET_MS (repeatable)
    #[arg(long = "stimulus", value_name = "ON:OFF")]
    pub stimuli: Vec<String>,

    /// Render dF/F relative to this frame range (FIRST:LAST) instead of raw data
    #[arg(long, value_name = "FIRST:LAST")]
    pub baseline: Option<String>,

    /// Area mask image (pixels > 0 are inside)
    #[arg(long)]
    pub area: Option<PathBuf>,

    /// Reference image used as the baseline background
    #[arg(long)]
    pub reference: Option<PathBuf>,

    /// Directory of ROI mask images, one per label
    #[arg(long)]
    pub rois: Option<PathBuf>,

    /// Output path without extension
    #[arg(short, long, default_value = "caviz")]
    pub output: PathBuf,
}

/// Parse `A:B` into two numbers.
pub fn parse_pair<T: std::str::FromStr>(text: &str, what: &str) -> Result<(T, T)> {
    let Some((a, b)) = text.split_once(':') else {
        bail!("{what} must be written as A:B, got {text:?}");
    };
    let parse = |s: &str| {
        s.trim()
            .parse::<T>()
            .map_err(|_| anyhow::anyhow!("{what}: cannot parse {s:?}"))
    };
    Ok((parse(a)?, parse(b)?))
}

pub fn parse_window(text: &str, what: &str) -> Result<RangeInclusive<usize>> {
    let (a, b) = parse_pair::<usize>(text, what)?;
    Ok(a..=b)
}

impl RenderArgs {
    pub fn load_flags(&self) -> Result<Flags> {
        let mut flags = match &self.flags {
            Some(path) => Flags::load(path)
                .with_context(|| format!("Failed to read flags {}", path.display()))?,
            None => Flags::default(),
        };
        for assignment in &self.overrides {
            flags.set_from_str(assignment)?;
        }
        Ok(flags)
    }

    pub fn load_config(&self) -> Result<(Flags, RenderConfig)> {
        let flags = self.load_flags()?;
        let config = RenderConfig::from_flags(&flags).context("Invalid flags")?;
        Ok((flags, config))
    }

    pub fn load_measurement(&self) -> Result<Measurement> {
        let raw = read_stack(&self.file)
            .with_context(|| format!("Failed to read {}", self.file.display()))?;
        let mut m = match &self.baseline {
            Some(window) => {
                let signal = delta_f_over_f(&raw, parse_window(window, "--baseline")?)?;
                Measurement::new(raw, signal, self.period)?
            }
            None => Measurement::from_raw(raw, self.period)?,
        };
        if let Some(path) = &self.area {
            let mask = read_mask(path)
                .with_context(|| format!("Failed to read area mask {}", path.display()))?;
            m = m.with_area(mask);
        }
        if let Some(path) = &self.reference {
            let reference = read_frame(path)
                .with_context(|| format!("Failed to read reference {}", path.display()))?;
            m = m.with_reference(reference);
        }
        let stimuli = self
            .stimuli
            .iter()
            .map(|s| {
                let (onset_ms, offset_ms) = parse_pair::<f64>(s, "--stimulus")?;
                Ok(Stimulus {
                    onset_ms,
                    offset_ms,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(m.with_stimuli(stimuli))
    }

    pub fn load_rois(&self, config: &RenderConfig) -> Result<RoiSet> {
        if !config.rois.is_active() {
            return Ok(RoiSet::new());
        }
        let rois = match &self.rois {
            Some(dir) => DirectoryRois::new(dir).load(config.rois.source)?,
            None => NoRois.load(config.rois.source)?,
        };
        if rois.is_empty() {
            warn!("ROI overlay enabled but no ROI masks were found");
        }
        Ok(rois)
    }
}
