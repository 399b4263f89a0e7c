//! Output file writer
//!
//! Every file is written through a temporary sibling and a rename, so a
//! consumer never reads a half-written file. `last-update.json` is written
//! last and marks a complete publication.

use crate::model::{slugify, CountryRecord, ErrorLogEntry};
use crate::output::partition::{build_partitions, RegionPartition, DATA_VERSION};
use crate::state::ScrapeProgress;
use crate::storage::{write_json_atomic, StorageResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const INDEX_FILE: &str = "chrome-index.json";
pub const COUNTRIES_DB_FILE: &str = "countries-db.json";
pub const MAPPINGS_FILE: &str = "country-mappings.json";
pub const ERROR_LOG_FILE: &str = "error-log.json";
pub const LAST_UPDATE_FILE: &str = "last-update.json";

/// Master index listing every partition file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataIndex {
    pub regions: Vec<String>,
    pub total_countries: usize,
    pub last_updated: DateTime<Utc>,
    pub version: String,
    pub data_files: Vec<String>,
}

/// Publication metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastUpdate {
    pub timestamp: DateTime<Utc>,
    pub countries_count: usize,
    pub version: String,
    pub regions: Vec<String>,

    /// Compact serialized size of the full data dump, in bytes
    pub total_size: usize,

    /// SHA-256 of the configuration file that produced the data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,
}

/// One written partition file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionFile {
    pub region: String,
    pub file_name: String,
    pub bytes: usize,

    /// Size exceeded the configured warning threshold
    pub oversized: bool,
}

/// What a publication wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub partitions: Vec<PartitionFile>,
    pub total_countries: usize,
}

impl PublishReport {
    pub fn oversized(&self) -> impl Iterator<Item = &PartitionFile> {
        self.partitions.iter().filter(|p| p.oversized)
    }
}

/// Writes each partition compactly to its own file
///
/// A partition above `warning_bytes` is still written; it is logged and
/// flagged as oversized.
pub fn write_partitions(
    dir: &Path,
    partitions: &[RegionPartition],
    warning_bytes: usize,
) -> StorageResult<Vec<PartitionFile>> {
    let mut written = Vec::with_capacity(partitions.len());

    for partition in partitions {
        let file_name = partition.file_name();
        let bytes = write_json_atomic(&dir.join(&file_name), partition, false)?;
        let oversized = bytes > warning_bytes;

        if oversized {
            tracing::warn!(
                "{} is large ({:.1}KB, threshold {:.1}KB), consider splitting the region",
                file_name,
                bytes as f64 / 1024.0,
                warning_bytes as f64 / 1024.0
            );
        } else {
            tracing::info!("Wrote {} ({:.1}KB)", file_name, bytes as f64 / 1024.0);
        }

        written.push(PartitionFile {
            region: partition.region.clone(),
            file_name,
            bytes,
            oversized,
        });
    }

    Ok(written)
}

/// Maps both the slug and the lowercase name of every country to its name
pub fn build_country_mappings(records: &BTreeMap<String, CountryRecord>) -> BTreeMap<String, String> {
    let mut mappings = BTreeMap::new();
    for name in records.keys() {
        let slug = slugify(name);
        if !slug.is_empty() {
            mappings.insert(slug, name.clone());
        }
        mappings.insert(name.to_lowercase(), name.clone());
    }
    mappings
}

/// Writes the complete output set for `progress` into `dir`
pub fn publish(
    dir: &Path,
    progress: &ScrapeProgress,
    error_log: &[ErrorLogEntry],
    config_hash: Option<&str>,
    warning_bytes: usize,
) -> StorageResult<PublishReport> {
    let now = Utc::now();
    let records = &progress.country_records;

    let total_size = serde_json::to_vec(records)?.len();
    write_json_atomic(&dir.join(COUNTRIES_DB_FILE), records, true)?;
    write_json_atomic(&dir.join(MAPPINGS_FILE), &build_country_mappings(records), true)?;

    let partitions = build_partitions(records, &progress.region_assignments, now);
    let written = write_partitions(dir, &partitions, warning_bytes)?;

    let regions: Vec<String> = written.iter().map(|p| p.region.clone()).collect();
    let index = DataIndex {
        regions: regions.clone(),
        total_countries: records.len(),
        last_updated: now,
        version: DATA_VERSION.to_string(),
        data_files: written.iter().map(|p| p.file_name.clone()).collect(),
    };
    write_json_atomic(&dir.join(INDEX_FILE), &index, true)?;

    write_json_atomic(&dir.join(ERROR_LOG_FILE), error_log, true)?;

    let last_update = LastUpdate {
        timestamp: now,
        countries_count: records.len(),
        version: DATA_VERSION.to_string(),
        regions,
        total_size,
        config_hash: config_hash.map(str::to_string),
    };
    write_json_atomic(&dir.join(LAST_UPDATE_FILE), &last_update, true)?;

    tracing::info!(
        "Published {} countries in {} partitions to {}",
        records.len(),
        written.len(),
        dir.display()
    );

    Ok(PublishReport {
        partitions: written,
        total_countries: records.len(),
    })
}
