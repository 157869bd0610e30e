//! Output directory and file naming.

use crate::error::Result;
use chrono::{Local, NaiveDateTime};
use std::path::{Path, PathBuf};

/// Characters of the base text considered for the filename slug.
pub const SLUG_SOURCE_CHARS: usize = 20;

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Names output files inside one directory.
#[derive(Debug, Clone)]
pub struct OutputDir {
    dir: PathBuf,
}

impl OutputDir {
    /// Opens `dir`, creating it (and its parents) if missing.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        let shown = std::path::absolute(&dir).unwrap_or_else(|_| dir.clone());
        tracing::info!(path = %shown.display(), "output directory");
        Ok(Self { dir })
    }

    /// Returns the directory files are written to.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Returns a fresh path for image `index`, stamped with the current local time.
    ///
    /// The directory is re-created if it was removed since [`OutputDir::create`].
    pub fn next_path(&self, index: usize, base: Option<&str>) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(self.path_at(index, base, Local::now().naive_local()))
    }

    /// Returns the path for image `index` at the given time.
    pub fn path_at(&self, index: usize, base: Option<&str>, at: NaiveDateTime) -> PathBuf {
        self.dir.join(file_name(index, base, at))
    }
}

/// Builds `<timestamp>_<slug>_<index>.png`, or `image_<timestamp>_<index>.png`
/// when the base text yields no usable slug.
pub fn file_name(index: usize, base: Option<&str>, at: NaiveDateTime) -> String {
    let timestamp = at.format(TIMESTAMP_FORMAT);
    match base.map(slugify).filter(|slug| !slug.is_empty()) {
        Some(slug) => format!("{timestamp}_{slug}_{index}.png"),
        None => format!("image_{timestamp}_{index}.png"),
    }
}

/// Keeps alphanumerics, spaces, `-` and `_` from the first
/// [`SLUG_SOURCE_CHARS`] characters, then turns spaces into underscores.
pub fn slugify(text: &str) -> String {
    text.chars()
        .take(SLUG_SOURCE_CHARS)
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .map(|c| if c == ' ' { '_' } else { c })
        .collect()
}
