//! Regional partitioning of the data set

use crate::model::CountryRecord;
use crate::output::compress::{compress_record, CompressedCountryRecord};
use crate::region::region_for;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Format version written into partitions, the index and `last-update.json`
pub const DATA_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionMetadata {
    pub last_updated: DateTime<Utc>,
    pub country_count: usize,
    pub version: String,
}

/// All countries of one region, in the form stored by the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionPartition {
    pub region: String,
    pub countries: BTreeMap<String, CompressedCountryRecord>,
    pub metadata: PartitionMetadata,
}

impl RegionPartition {
    /// File name of this partition: `chrome-data-<region lowercase>.json`
    pub fn file_name(&self) -> String {
        partition_file_name(&self.region)
    }
}

pub fn partition_file_name(region: &str) -> String {
    format!("chrome-data-{}.json", region.to_lowercase())
}

/// Splits records into disjoint regional partitions
///
/// A country goes to the region recorded in `assignments`; countries missing
/// there fall back to the static lookup table. Every record lands in exactly
/// one partition and no partition is empty.
pub fn build_partitions(
    records: &BTreeMap<String, CountryRecord>,
    assignments: &BTreeMap<String, Vec<String>>,
    generated_at: DateTime<Utc>,
) -> Vec<RegionPartition> {
    let assigned: BTreeMap<&str, &str> = assignments
        .iter()
        .flat_map(|(region, members)| members.iter().map(move |c| (c.as_str(), region.as_str())))
        .collect();

    let mut buckets: BTreeMap<String, BTreeMap<String, CompressedCountryRecord>> = BTreeMap::new();
    for (country, record) in records {
        let region = assigned
            .get(country.as_str())
            .copied()
            .unwrap_or_else(|| region_for(country));
        buckets
            .entry(region.to_string())
            .or_default()
            .insert(country.clone(), compress_record(record));
    }

    buckets
        .into_iter()
        .map(|(region, countries)| RegionPartition {
            metadata: PartitionMetadata {
                last_updated: generated_at,
                country_count: countries.len(),
                version: DATA_VERSION.to_string(),
            },
            region,
            countries,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn records(names: &[&str]) -> BTreeMap<String, CountryRecord> {
        names
            .iter()
            .map(|name| {
                (
                    name.to_string(),
                    CountryRecord::empty(format!("https://example.com/{}", name), Utc::now()),
                )
            })
            .collect()
    }

    #[test]
    fn test_partitions_are_disjoint_and_complete() {
        let all = records(&["Kenya", "Brazil", "France", "Japan", "Fiji", "Atlantis"]);
        let partitions = build_partitions(&all, &BTreeMap::new(), Utc::now());

        let mut seen = BTreeSet::new();
        for partition in &partitions {
            assert!(!partition.countries.is_empty());
            assert_eq!(partition.metadata.country_count, partition.countries.len());
            for country in partition.countries.keys() {
                assert!(seen.insert(country.clone()), "{} in two partitions", country);
            }
        }
        assert_eq!(seen, all.keys().cloned().collect::<BTreeSet<_>>());

        let regions: Vec<_> = partitions.iter().map(|p| p.region.as_str()).collect();
        assert!(regions.contains(&"Other"));
    }

    #[test]
    fn test_recorded_assignment_wins() {
        let all = records(&["Kenya"]);
        let mut assignments = BTreeMap::new();
        assignments.insert("Europe".to_string(), vec!["Kenya".to_string()]);

        let partitions = build_partitions(&all, &assignments, Utc::now());
        assert_eq!(partitions.len(), 1);
        assert_eq!(partitions[0].region, "Europe");
    }

    #[test]
    fn test_stale_assignment_without_record_is_ignored() {
        let all = records(&["Kenya"]);
        let mut assignments = BTreeMap::new();
        assignments.insert("Asia".to_string(), vec!["Japan".to_string()]);

        let partitions = build_partitions(&all, &assignments, Utc::now());
        assert_eq!(partitions.len(), 1);
        assert_eq!(partitions[0].region, "Africa");
    }

    #[test]
    fn test_file_name_is_lowercase() {
        assert_eq!(partition_file_name("Americas"), "chrome-data-americas.json");
    }
}
