use thiserror::Error;

#[derive(Error, Debug)]
pub enum CavizError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("TIFF error: {0}")]
    TiffError(#[from] tiff::TiffError),

    #[error("Invalid flags file: {0}")]
    Flags(#[from] toml::de::Error),

    #[error("Invalid configuration: {flag} = {value:?} ({reason})")]
    InvalidConfiguration {
        flag: String,
        value: String,
        reason: String,
    },

    #[error("Missing flag: {0}")]
    MissingFlag(String),

    #[error("Invalid crop: {0}")]
    InvalidCrop(String),

    #[error("Invalid frame range: first={first}, last={last} (total: {total})")]
    InvalidFrameRange { first: i64, last: i64, total: usize },

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("No pixels selected for {0}")]
    EmptySelection(String),

    #[error("Invalid sampling period {0} ms: frame rate is undefined")]
    InvalidSamplingPeriod(f64),

    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),

    #[error("Video encoder error: {0}")]
    Encoder(String),

    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("Empty frame sequence")]
    EmptySequence,
}

impl CavizError {
    /// Configuration error naming the offending flag and value.
    pub fn config(flag: &str, value: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            flag: flag.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CavizError>;
