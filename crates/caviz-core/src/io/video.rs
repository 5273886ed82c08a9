use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use image::ImageFormat;
use tempfile::TempDir;
use tracing::{debug, info};

use crate::error::{CavizError, Result};
use crate::frame::RenderedFrame;

use super::writer::{VideoCodec, VideoSettings};
use super::{ensure_parent_dir, to_rgba_image};

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Frames per second for a sampling period, scaled by the playback speed.
pub fn frame_rate(settings: &VideoSettings) -> Result<f64> {
    let period = settings.sampling_period_ms;
    if !(period.is_finite() && period > 0.0) {
        return Err(CavizError::InvalidSamplingPeriod(period));
    }
    if !(settings.speed_factor.is_finite() && settings.speed_factor > 0.0) {
        return Err(CavizError::config(
            "speed_factor",
            settings.speed_factor,
            "speed factor must be positive",
        ));
    }
    Ok(settings.speed_factor * 1000.0 / period)
}

/// Stages frames as numbered PNGs in a scoped temporary directory, then runs
/// `ffmpeg` once over the sequence. The staging directory is removed when the
/// writer is dropped, whether or not encoding succeeded.
pub struct VideoWriter {
    path: PathBuf,
    codec: VideoCodec,
    settings: VideoSettings,
    fps: f64,
    staging: TempDir,
    staged: usize,
}

impl VideoWriter {
    /// Validate the frame rate and encoder before any frame is staged.
    pub fn new(path: &Path, codec: VideoCodec, settings: VideoSettings) -> Result<Self> {
        let fps = frame_rate(&settings)?;
        if !is_ffmpeg_on_path() {
            return Err(CavizError::Encoder(format!(
                "ffmpeg is required for {codec} output, but was not found on PATH"
            )));
        }
        let staging = tempfile::Builder::new().prefix("caviz-frames-").tempdir()?;
        debug!(dir = %staging.path().display(), fps, "Staging video frames");
        Ok(Self {
            path: path.to_path_buf(),
            codec,
            settings,
            fps,
            staging,
            staged: 0,
        })
    }

    pub fn codec(&self) -> VideoCodec {
        self.codec
    }

    pub fn staged(&self) -> usize {
        self.staged
    }

    pub fn push(&mut self, frame: RenderedFrame) -> Result<()> {
        let file = self.staging.path().join(format!("{:06}.png", self.staged));
        to_rgba_image(&frame.pixels).save_with_format(&file, ImageFormat::Png)?;
        self.staged += 1;
        Ok(())
    }

    pub fn finish(self) -> Result<Vec<PathBuf>> {
        if self.staged == 0 {
            return Err(CavizError::EmptySequence);
        }
        ensure_parent_dir(&self.path)?;

        let pattern = self.staging.path().join("%06d.png");
        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd.args(["-y", "-loglevel", "error", "-framerate"])
            .arg(format!("{}", self.fps))
            .arg("-i")
            .arg(&pattern)
            .args(["-an", "-c:v", self.codec.encoder(), "-b:v"])
            .arg(format!("{}k", self.settings.bitrate_kbps));
        if self.settings.encoder_threads > 0 {
            cmd.arg("-threads")
                .arg(self.settings.encoder_threads.to_string());
        }
        // yuv420p needs even dimensions.
        cmd.args(["-vf", "pad=ceil(iw/2)*2:ceil(ih/2)*2", "-pix_fmt"])
            .arg(self.codec.pixel_format())
            .arg(&self.path);

        let output = cmd.output().map_err(|e| {
            CavizError::Encoder(format!(
                "failed to run ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CavizError::Encoder(format!(
                "ffmpeg exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        info!(
            path = %self.path.display(),
            frames = self.staged,
            fps = self.fps,
            codec = %self.codec,
            "Encoded video"
        );
        Ok(vec![self.path])
    }
}
