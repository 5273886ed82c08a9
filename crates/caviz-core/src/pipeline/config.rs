use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::border::BorderConfig;
use crate::colorize::{parse_color, Background, Colorizer, Colormap};
use crate::error::{CavizError, Result};
use crate::exclude::{CropMode, Exclusion};
use crate::filters::GaussianFilter;
use crate::flags::{keys, Flags};
use crate::io::{OutputFormat, VideoSettings};
use crate::roi::RoiMarker;
use crate::rotate::Transform;
use crate::scale::{BoundEstimator, LimitDecider, LimitStrategy, ScaleMode};
use crate::threshold::{ThresholdReference, ThresholdValue, Thresholder};

/// Every pipeline stage's settings, decoded from [`Flags`] once.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    pub exclusion: Exclusion,
    /// AND the area mask with the retained crop region.
    pub restrict_area: bool,
    pub space_filter: GaussianFilter,
    pub time_filter: GaussianFilter,
    pub limits: LimitDecider,
    pub scale_mode: ScaleMode,
    pub threshold: Thresholder,
    /// Limits for the raw-movie background layer.
    pub background_limits: LimitDecider,
    pub colorizer: Colorizer,
    pub rois: RoiMarker,
    pub transform: Transform,
    pub border: BorderConfig,
    pub output: OutputFormat,
    /// The sampling period is filled in from the measurement at export time.
    pub video: VideoSettings,
}

fn non_negative(flags: &Flags, key: &str) -> Result<usize> {
    let v = flags.int(key)?;
    usize::try_from(v).map_err(|_| CavizError::config(key, v, "must be >= 0"))
}

fn limit_decider(flags: &Flags, code_key: &str) -> Result<LimitDecider> {
    let code = flags.int(code_key)?;
    let strategy = LimitStrategy::from_code(code, code_key)?;
    let estimator = if flags.bool(keys::USE_PERCENTILE)? {
        let p = flags.float(keys::PERCENTILE)?;
        if !(0.0..50.0).contains(&p) {
            return Err(CavizError::config(
                keys::PERCENTILE,
                p,
                "percentile must be in [0, 50)",
            ));
        }
        BoundEstimator::Percentile(p)
    } else {
        BoundEstimator::MinMax
    };
    Ok(LimitDecider::new(strategy, estimator)
        .with_fixed(flags.float(keys::SCALE_MIN)?, flags.float(keys::SCALE_MAX)?)
        .with_center_fraction(flags.float(keys::CENTER_FRACTION)?))
}

impl RenderConfig {
    pub fn from_flags(flags: &Flags) -> Result<Self> {
        let border = non_negative(flags, keys::CUT_BORDER)?;
        let mode = match flags.text(keys::CROP_MODE)?.trim().to_ascii_lowercase().as_str() {
            "trim" | "crop" => CropMode::Trim,
            "exclude" => CropMode::ExcludeOnly,
            other => {
                return Err(CavizError::config(
                    keys::CROP_MODE,
                    other,
                    "crop mode must be trim or exclude",
                ))
            }
        };
        let exclusion = Exclusion {
            first_frame: flags.int(keys::FIRST_FRAME)?,
            last_frame: flags.int(keys::LAST_FRAME)?,
            mode,
            ..Exclusion::border(border)
        };

        let space_filter = GaussianFilter::new(
            flags.bool(keys::FILTER_SPACE_FLAG)?,
            flags.float(keys::FILTER_SPACE_SIZE)? as f32,
        );
        let time_filter = GaussianFilter::new(
            flags.bool(keys::FILTER_TIME_FLAG)?,
            flags.float(keys::FILTER_TIME_SIZE)? as f32,
        );

        let scale_code = flags.int(keys::INDIVIDUAL_SCALE)?;
        let limits = limit_decider(flags, keys::INDIVIDUAL_SCALE)?;
        let scale_mode = ScaleMode::from_code(scale_code, keys::INDIVIDUAL_SCALE)?;
        let background_limits = limit_decider(flags, keys::BACKGROUND_SCALE)?;

        let threshold = Thresholder {
            reference: ThresholdReference::from_name(
                &flags.text(keys::THRESHOLD_REFERENCE)?,
                keys::THRESHOLD_REFERENCE,
            )?,
            positive: ThresholdValue::parse(&flags.text(keys::THRESHOLD_POS)?, keys::THRESHOLD_POS)?,
            negative: ThresholdValue::parse(&flags.text(keys::THRESHOLD_NEG)?, keys::THRESHOLD_NEG)?,
        };

        let fg = parse_color(&flags.text(keys::FG_COLOR)?, keys::FG_COLOR)?;
        let bg = parse_color(&flags.text(keys::BG_COLOR)?, keys::BG_COLOR)?;
        let colorizer = Colorizer {
            primary: Colormap::from_name(&flags.text(keys::COLORMAP)?, keys::COLORMAP)?,
            secondary: Colormap::from_name(
                &flags.text(keys::BACKGROUND_COLORMAP)?,
                keys::BACKGROUND_COLORMAP,
            )?,
            background: Background::from_name(&flags.text(keys::BACKGROUND)?, bg, keys::BACKGROUND)?,
        };

        let rois = RoiMarker::from_code(flags.int(keys::SHOW_ROIS)?, fg, bg, keys::SHOW_ROIS)?;
        let transform = Transform::from_code(
            flags.int(keys::ROTATE)?,
            flags.bool(keys::REVERSE)?,
            keys::ROTATE,
        )?;

        let border_config = BorderConfig {
            colorbar: flags.bool(keys::BORDER_COLORBAR)?,
            timestamp: flags.bool(keys::BORDER_TIMESTAMP)?,
            stimulus: flags.bool(keys::BORDER_STIMULUS)?,
            size: non_negative(flags, keys::BORDER_SIZE)?,
            fg,
            bg,
        };

        let output = OutputFormat::from_name(&flags.text(keys::EXPORT_FORMAT)?, keys::EXPORT_FORMAT)?;
        let bitrate = flags.int(keys::BITRATE)?;
        if bitrate <= 0 {
            return Err(CavizError::config(keys::BITRATE, bitrate, "bitrate must be positive"));
        }
        let video = VideoSettings {
            bitrate_kbps: bitrate,
            speed_factor: flags.float(keys::SPEED_FACTOR)?,
            encoder_threads: non_negative(flags, keys::ENCODER_THREADS)?,
            sampling_period_ms: 0.0,
        };

        let config = Self {
            exclusion,
            restrict_area: flags.bool(keys::RESTRICT_AREA)?,
            space_filter,
            time_filter,
            limits,
            scale_mode,
            threshold,
            background_limits,
            colorizer,
            rois,
            transform,
            border: border_config,
            output,
            video,
        };
        debug!(
            strategy = %config.limits.strategy,
            mode = %config.scale_mode,
            rotate = config.transform.code(),
            output = %config.output,
            "Decoded render configuration"
        );
        Ok(config)
    }
}
