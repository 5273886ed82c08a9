use std::fmt;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::consts::{DEFAULT_BITRATE_KBPS, SEQUENCE_INDEX_DIGITS};
use crate::error::{CavizError, Result};
use crate::frame::RenderedFrame;

use super::tiff_stack::TiffStackWriter;
use super::video::VideoWriter;
use super::{ensure_parent_dir, to_rgba_image, with_appended_extension};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageKind {
    Png,
    Jpeg,
    Bmp,
}

impl ImageKind {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Bmp => "bmp",
        }
    }

    fn format(&self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Bmp => ImageFormat::Bmp,
        }
    }

    fn keeps_alpha(&self) -> bool {
        matches!(self, Self::Png)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoCodec {
    Mp4,
    Avi,
    Mov,
}

impl VideoCodec {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Avi => "avi",
            Self::Mov => "mov",
        }
    }

    /// ffmpeg encoder name.
    pub fn encoder(&self) -> &'static str {
        match self {
            Self::Mp4 => "libx264",
            Self::Avi => "mpeg4",
            Self::Mov => "mjpeg",
        }
    }

    pub fn pixel_format(&self) -> &'static str {
        match self {
            Self::Mov => "yuvj420p",
            _ => "yuv420p",
        }
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.extension(), self.encoder())
    }
}

/// Output encoding selected by the `export_format` flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    ImageSequence(ImageKind),
    TiffStack,
    Video(VideoCodec),
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::ImageSequence(ImageKind::Png)
    }
}

impl OutputFormat {
    pub fn from_name(name: &str, flag: &str) -> Result<Self> {
        match name.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "png" => Ok(Self::ImageSequence(ImageKind::Png)),
            "jpg" | "jpeg" => Ok(Self::ImageSequence(ImageKind::Jpeg)),
            "bmp" => Ok(Self::ImageSequence(ImageKind::Bmp)),
            "tif" | "tiff" => Ok(Self::TiffStack),
            "mp4" => Ok(Self::Video(VideoCodec::Mp4)),
            "avi" => Ok(Self::Video(VideoCodec::Avi)),
            "mov" => Ok(Self::Video(VideoCodec::Mov)),
            other => Err(CavizError::UnsupportedCodec(format!(
                "{flag} = {other:?} (expected png, jpg, bmp, tif, mp4, avi or mov)"
            ))),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::ImageSequence(kind) => kind.extension(),
            Self::TiffStack => "tif",
            Self::Video(codec) => codec.extension(),
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, Self::Video(_))
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImageSequence(kind) => write!(f, "{} images", kind.extension()),
            Self::TiffStack => write!(f, "multi-page TIFF"),
            Self::Video(codec) => write!(f, "{codec} video"),
        }
    }
}

/// Encoder parameters for video output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VideoSettings {
    pub bitrate_kbps: i64,
    pub speed_factor: f64,
    /// 0 leaves the choice to the encoder.
    pub encoder_threads: usize,
    pub sampling_period_ms: f64,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            bitrate_kbps: DEFAULT_BITRATE_KBPS,
            speed_factor: 1.0,
            encoder_threads: 0,
            sampling_period_ms: 0.0,
        }
    }
}

/// Files produced by a finished writer.
#[derive(Clone, Debug, Default)]
pub struct WriteSummary {
    pub format: Option<OutputFormat>,
    pub files: Vec<PathBuf>,
    pub frames: usize,
}

/// Writes numbered images, or a single un-numbered image for a still.
pub struct ImageSequenceWriter {
    kind: ImageKind,
    stem: PathBuf,
    numbered: bool,
    files: Vec<PathBuf>,
}

impl ImageSequenceWriter {
    /// Movies go to `<stem>/<name>_<index>.<ext>`; stills to `<stem>.<ext>`.
    fn path_for(&self, index: usize) -> PathBuf {
        if !self.numbered {
            return with_appended_extension(&self.stem, self.kind.extension());
        }
        let name = self
            .stem
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "frame".to_string());
        self.stem.join(format!(
            "{name}_{index:0width$}.{ext}",
            width = SEQUENCE_INDEX_DIGITS,
            ext = self.kind.extension()
        ))
    }

    fn push(&mut self, frame: RenderedFrame) -> Result<()> {
        let path = self.path_for(frame.index);
        ensure_parent_dir(&path)?;
        let rgba = to_rgba_image(&frame.pixels);
        if self.kind.keeps_alpha() {
            rgba.save_with_format(&path, self.kind.format())?;
        } else {
            DynamicImage::ImageRgba8(rgba)
                .to_rgb8()
                .save_with_format(&path, self.kind.format())?;
        }
        debug!(path = %path.display(), "Wrote frame");
        self.files.push(path);
        Ok(())
    }
}

/// A writer for one export. Frames are handed over by value and the writer
/// is consumed by [`finish`](Self::finish), so a frame cannot be written
/// twice and nothing can be pushed after the output is finalized.
pub enum FrameWriter {
    Images(ImageSequenceWriter),
    Tiff(TiffStackWriter),
    Video(VideoWriter),
}

impl FrameWriter {
    /// Writer for a movie export. `stem` is the output path without
    /// extension and `frames` the number of frames that will be pushed.
    /// Image sequences are always numbered, even for a single frame.
    pub fn create(
        format: OutputFormat,
        stem: &Path,
        frames: usize,
        video: &VideoSettings,
    ) -> Result<Self> {
        Self::open(format, stem, frames, true, video)
    }

    /// Writer for one still image, written to `<stem>.<ext>` without a
    /// sequence number.
    pub fn still(format: OutputFormat, stem: &Path, video: &VideoSettings) -> Result<Self> {
        Self::open(format, stem, 1, false, video)
    }

    fn open(
        format: OutputFormat,
        stem: &Path,
        frames: usize,
        numbered: bool,
        video: &VideoSettings,
    ) -> Result<Self> {
        if frames == 0 {
            return Err(CavizError::EmptySequence);
        }
        let writer = match format {
            OutputFormat::ImageSequence(kind) => Self::Images(ImageSequenceWriter {
                kind,
                stem: stem.to_path_buf(),
                numbered,
                files: Vec::new(),
            }),
            OutputFormat::TiffStack => {
                Self::Tiff(TiffStackWriter::new(&with_appended_extension(stem, "tif")))
            }
            OutputFormat::Video(codec) => Self::Video(VideoWriter::new(
                &with_appended_extension(stem, codec.extension()),
                codec,
                video.clone(),
            )?),
        };
        debug!(%format, stem = %stem.display(), frames, numbered, "Created frame writer");
        Ok(writer)
    }

    pub fn push(&mut self, frame: RenderedFrame) -> Result<()> {
        match self {
            Self::Images(w) => w.push(frame),
            Self::Tiff(w) => w.push(frame),
            Self::Video(w) => w.push(frame),
        }
    }

    pub fn finish(self) -> Result<WriteSummary> {
        let (format, files, frames) = match self {
            Self::Images(w) => {
                if w.files.is_empty() {
                    return Err(CavizError::EmptySequence);
                }
                let n = w.files.len();
                (OutputFormat::ImageSequence(w.kind), w.files, n)
            }
            Self::Tiff(w) => {
                let n = w.page_count();
                (OutputFormat::TiffStack, w.finish()?, n)
            }
            Self::Video(w) => {
                let codec = w.codec();
                let n = w.staged();
                (OutputFormat::Video(codec), w.finish()?, n)
            }
        };
        info!(%format, files = files.len(), frames, "Export finished");
        Ok(WriteSummary {
            format: Some(format),
            files,
            frames,
        })
    }
}
