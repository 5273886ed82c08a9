use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use ndarray::{stack, Array2, ArrayView2, Axis};
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::ColorType;
use tracing::{debug, info};

use crate::error::{CavizError, Result};
use crate::frame::{Frame, Movie};

/// Load a recording. TIFF files may hold any number of grayscale pages;
/// other formats are read as a single frame.
///
/// Sample values are kept in their native units (no normalization) for every
/// format so that thresholds and fixed limits refer to the recorded
/// intensities.
pub fn read_stack(path: &Path) -> Result<Movie> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tif") || ext.eq_ignore_ascii_case("tiff") => {
            read_tiff_stack(path)
        }
        _ => Ok(Movie::from_frame(&read_frame(path)?)),
    }
}

fn read_tiff_stack(path: &Path) -> Result<Movie> {
    let file = File::open(path)?;
    let mut limits = Limits::default();
    limits.decoding_buffer_size = 1024 * 1024 * 1024;
    limits.intermediate_buffer_size = 1024 * 1024 * 1024;
    let mut decoder = Decoder::new(BufReader::new(file))?.with_limits(limits);

    let mut pages: Vec<Frame> = Vec::new();
    loop {
        let (w, h) = decoder.dimensions()?;
        match decoder.colortype()? {
            ColorType::Gray(_) => {}
            other => {
                return Err(CavizError::UnsupportedInput(format!(
                    "{}: page {} has color type {other:?}, expected grayscale",
                    path.display(),
                    pages.len()
                )))
            }
        }
        let samples = samples_as_f32(decoder.read_image()?, path)?;
        let (w, h) = (w as usize, h as usize);
        if samples.len() != w * h {
            return Err(CavizError::UnsupportedInput(format!(
                "{}: page {} has {} samples for {w}x{h}",
                path.display(),
                pages.len(),
                samples.len()
            )));
        }
        if let Some(first) = pages.first() {
            if first.dim() != (w, h) {
                return Err(CavizError::ShapeMismatch(format!(
                    "{}: page {} is {w}x{h}, first page is {:?}",
                    path.display(),
                    pages.len(),
                    first.dim()
                )));
            }
        }
        // Rows are stored top-down; frames are (X, Y) with Y up.
        pages.push(Array2::from_shape_fn((w, h), |(x, y)| {
            samples[(h - 1 - y) * w + x]
        }));
        debug!(page = pages.len() - 1, width = w, height = h, "Decoded TIFF page");

        if !decoder.more_images() {
            break;
        }
        decoder.next_image()?;
    }

    let views: Vec<ArrayView2<'_, f32>> = pages.iter().map(|p| p.view()).collect();
    let data = stack(Axis(2), &views)
        .map_err(|e| CavizError::ShapeMismatch(format!("{}: {e}", path.display())))?;
    let movie = Movie::new(data);
    info!(
        path = %path.display(),
        nx = movie.nx(),
        ny = movie.ny(),
        nt = movie.nt(),
        "Loaded stack"
    );
    Ok(movie)
}

fn samples_as_f32(result: DecodingResult, path: &Path) -> Result<Vec<f32>> {
    Ok(match result {
        DecodingResult::U8(buf) => buf.into_iter().map(f32::from).collect(),
        DecodingResult::U16(buf) => buf.into_iter().map(f32::from).collect(),
        DecodingResult::U32(buf) => buf.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I16(buf) => buf.into_iter().map(f32::from).collect(),
        DecodingResult::F32(buf) => buf,
        DecodingResult::F64(buf) => buf.into_iter().map(|v| v as f32).collect(),
        _ => {
            return Err(CavizError::UnsupportedInput(format!(
                "{}: unsupported TIFF sample format",
                path.display()
            )))
        }
    })
}

/// Load a single image as a grayscale frame.
///
/// 8- and 16-bit images keep their integer sample values like TIFF pages do;
/// floating-point images keep their stored values. Color images are reduced
/// to luma first.
pub fn read_frame(path: &Path) -> Result<Frame> {
    let img = image::open(path)?;
    let color = img.color();
    let bits = u16::from(color.bytes_per_pixel()) * 8 / u16::from(color.channel_count());
    let (w, h) = (img.width() as usize, img.height() as usize);
    let samples: Vec<f32> = match bits {
        8 => img.to_luma8().into_raw().into_iter().map(f32::from).collect(),
        16 => img.to_luma16().into_raw().into_iter().map(f32::from).collect(),
        _ => img.to_luma32f().into_raw(),
    };
    debug!(path = %path.display(), width = w, height = h, bits, "Loaded image");
    Ok(Array2::from_shape_fn((w, h), |(x, y)| {
        samples[(h - 1 - y) * w + x]
    }))
}

/// Load a mask image; any pixel above zero is selected.
pub fn read_mask(path: &Path) -> Result<Array2<bool>> {
    Ok(read_frame(path)?.mapv(|v| v > 0.0))
}
