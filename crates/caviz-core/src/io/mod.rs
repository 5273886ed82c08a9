pub mod stack_reader;
pub mod tiff_stack;
pub mod video;
pub mod writer;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use ndarray::Array3;

pub use stack_reader::{read_frame, read_mask, read_stack};
pub use writer::{FrameWriter, ImageKind, OutputFormat, VideoCodec, VideoSettings, WriteSummary};

/// Quantize one channel value in `[0, 1]` to 8 bits. NaN becomes 0.
#[inline]
pub(crate) fn quantize(v: f32) -> u8 {
    if v.is_nan() {
        return 0;
    }
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Convert an `(X, Y, 4)` float frame to `(row, col, 4)` bytes with row 0 at
/// the top. Y is flipped and the first two axes are transposed.
pub fn to_display_rgba8(pixels: &Array3<f32>) -> Array3<u8> {
    let (w, h, c) = pixels.dim();
    Array3::from_shape_fn((h, w, c), |(row, col, ch)| {
        quantize(pixels[[col, h - 1 - row, ch]])
    })
}

/// Same conversion as [`to_display_rgba8`], wrapped as an `image` buffer.
pub fn to_rgba_image(pixels: &Array3<f32>) -> RgbaImage {
    let (w, h, _) = pixels.dim();
    let bytes: Vec<u8> = to_display_rgba8(pixels).iter().copied().collect();
    RgbaImage::from_raw(w as u32, h as u32, bytes).expect("buffer size matches dimensions")
}

/// `stem` with `.ext` appended, keeping any dots already in the stem.
pub fn with_appended_extension(stem: &Path, ext: &str) -> PathBuf {
    let mut name: OsString = stem.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

/// Create the parent directory of `path` if it has one.
pub(crate) fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_conversion_flips_y() {
        let mut px = Array3::<f32>::zeros((3, 2, 4));
        // Bottom-left pixel in Y-up storage.
        px[[0, 0, 0]] = 1.0;
        let out = to_display_rgba8(&px);
        assert_eq!(out.dim(), (2, 3, 4));
        assert_eq!(out[[1, 0, 0]], 255);
        assert_eq!(out[[0, 0, 0]], 0);
    }

    #[test]
    fn test_quantize_edges() {
        assert_eq!(quantize(f32::NAN), 0);
        assert_eq!(quantize(-1.0), 0);
        assert_eq!(quantize(2.0), 255);
        assert_eq!(quantize(0.5), 128);
    }

    #[test]
    fn test_appended_extension_keeps_dots() {
        let p = with_appended_extension(Path::new("out/run.v2"), "png");
        assert_eq!(p, PathBuf::from("out/run.v2.png"));
    }
}
