use std::path::{Path, PathBuf};

use caviz_core::error::Result;
use caviz_core::io::read_frame;
use caviz_core::roi::{RoiProvider, RoiSet, RoiSource};
use tracing::debug;

const MASK_EXTENSIONS: [&str; 5] = ["png", "tif", "tiff", "bmp", "jpg"];

/// ROI masks stored as one grayscale image per label. Source `n` reads the
/// subdirectory `n/` when it exists, otherwise the directory itself.
pub struct DirectoryRois {
    dir: PathBuf,
}

impl DirectoryRois {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }
}

impl RoiProvider for DirectoryRois {
    fn load(&self, source: RoiSource) -> Result<RoiSet> {
        let sub = self.dir.join(source.0.to_string());
        let dir = if sub.is_dir() { sub } else { self.dir.clone() };

        let mut rois = RoiSet::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            let is_mask = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| MASK_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
            if !path.is_file() || !is_mask {
                continue;
            }
            let label = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            rois.insert(label, read_frame(&path)?);
        }
        debug!(dir = %dir.display(), count = rois.len(), "Loaded ROI masks");
        Ok(rois)
    }
}
