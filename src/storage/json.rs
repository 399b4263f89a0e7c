use crate::state::ScrapeProgress;
use crate::storage::traits::{ProgressStore, StorageError, StorageResult};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the progress checkpoint inside the output directory
pub const PROGRESS_FILE: &str = "scraping-progress.json";

/// Progress store backed by a single JSON file
#[derive(Debug, Clone)]
pub struct JsonProgressStore {
    path: PathBuf,
}

impl JsonProgressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store using the default checkpoint file name inside `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(PROGRESS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProgressStore for JsonProgressStore {
    fn load(&self) -> StorageResult<Option<ScrapeProgress>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| io_error(&self.path, e))?;
        let progress = serde_json::from_str(&content)?;
        Ok(Some(progress))
    }

    fn save(&mut self, progress: &ScrapeProgress) -> StorageResult<()> {
        write_json_atomic(&self.path, progress, true)?;
        Ok(())
    }
}

/// Serializes `value` to `path` through a temporary sibling file and a rename
///
/// Returns the number of bytes written.
pub fn write_json_atomic<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
    pretty: bool,
) -> StorageResult<usize> {
    let content = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };

    let tmp_path = temp_path_for(path);
    fs::write(&tmp_path, content.as_bytes()).map_err(|e| io_error(&tmp_path, e))?;
    fs::rename(&tmp_path, path).map_err(|e| io_error(path, e))?;

    Ok(content.len())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "snapshot".to_string());
    path.with_file_name(format!(".{}.tmp", file_name))
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        source,
    }
}
