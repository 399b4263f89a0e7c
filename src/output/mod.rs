//! Output module for publishing the data set
//!
//! This module handles:
//! - Compressing records into the short-keyed partition form
//! - Splitting records into disjoint regional partitions
//! - Writing partitions, the index and the metadata files
//! - Summarizing a run

pub mod compress;
pub mod partition;
pub mod stats;
mod writer;

pub use compress::{compress_record, decompress_record, CompressedCountryRecord};
pub use partition::{build_partitions, partition_file_name, RegionPartition, DATA_VERSION};
pub use stats::{print_summary, RunSummary};
pub use writer::{
    build_country_mappings, publish, write_partitions, DataIndex, LastUpdate, PartitionFile,
    PublishReport, COUNTRIES_DB_FILE, ERROR_LOG_FILE, INDEX_FILE, LAST_UPDATE_FILE, MAPPINGS_FILE,
};
