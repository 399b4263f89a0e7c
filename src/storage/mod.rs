//! Storage module for persisting batch progress
//!
//! This module handles the on-disk checkpoint used to resume an interrupted
//! run, and the atomic JSON writes shared with the output writer.

mod json;
mod traits;

pub use json::{write_json_atomic, JsonProgressStore, PROGRESS_FILE};
pub use traits::{ProgressStore, StorageError, StorageResult};
