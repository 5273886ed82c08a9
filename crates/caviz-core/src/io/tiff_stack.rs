use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use ndarray::{stack, Array3, Array4, ArrayView3, Axis};
use tiff::encoder::{colortype, TiffEncoder};
use tracing::info;

use crate::error::{CavizError, Result};
use crate::frame::RenderedFrame;

use super::{ensure_parent_dir, to_display_rgba8};

/// Accumulates frames as a `(frame, Y, X, color)` 8-bit volume and writes
/// one multi-page RGBA TIFF on [`finish`](Self::finish).
pub struct TiffStackWriter {
    path: PathBuf,
    pages: Vec<Array3<u8>>,
}

impl TiffStackWriter {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            pages: Vec::new(),
        }
    }

    pub fn push(&mut self, frame: RenderedFrame) -> Result<()> {
        let page = to_display_rgba8(&frame.pixels);
        if let Some(first) = self.pages.first() {
            if first.dim() != page.dim() {
                return Err(CavizError::ShapeMismatch(format!(
                    "frame {} is {:?}, stack pages are {:?}",
                    frame.index,
                    page.dim(),
                    first.dim()
                )));
            }
        }
        self.pages.push(page);
        Ok(())
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// The accumulated `(frame, Y, X, color)` volume.
    pub fn volume(&self) -> Result<Array4<u8>> {
        if self.pages.is_empty() {
            return Err(CavizError::EmptySequence);
        }
        let views: Vec<ArrayView3<'_, u8>> = self.pages.iter().map(|p| p.view()).collect();
        stack(Axis(0), &views).map_err(|e| CavizError::ShapeMismatch(e.to_string()))
    }

    pub fn finish(self) -> Result<Vec<PathBuf>> {
        let volume = self.volume()?;
        ensure_parent_dir(&self.path)?;
        let writer = BufWriter::new(File::create(&self.path)?);
        let mut encoder = TiffEncoder::new(writer)?;
        let (_, rows, cols, _) = volume.dim();
        for page in volume.axis_iter(Axis(0)) {
            let bytes: Vec<u8> = page.iter().copied().collect();
            encoder.write_image::<colortype::RGBA8>(cols as u32, rows as u32, &bytes)?;
        }
        info!(
            path = %self.path.display(),
            pages = volume.dim().0,
            "Wrote TIFF stack"
        );
        Ok(vec![self.path])
    }
}
