//! Storage traits and error types
//!
//! The orchestrator only sees [`ProgressStore`]; where and how a snapshot is
//! kept is up to the implementation.

use crate::state::ScrapeProgress;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for progress snapshot backends
///
/// A save replaces the previous snapshot as a whole; readers never observe a
/// partially written snapshot.
pub trait ProgressStore {
    /// Loads the last saved snapshot
    ///
    /// Returns `Ok(None)` when nothing was saved yet.
    fn load(&self) -> StorageResult<Option<ScrapeProgress>>;

    /// Replaces the saved snapshot with `progress`
    fn save(&mut self, progress: &ScrapeProgress) -> StorageResult<()>;
}
