use crate::model::CountryRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Resumable snapshot of a batch run
///
/// Persisted as a whole at checkpoints. A country with an entry in
/// `country_records` is done and is never fetched again on resume.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeProgress {
    #[serde(default)]
    pub country_records: BTreeMap<String, CountryRecord>,

    /// Countries completed across every run that contributed to this snapshot
    #[serde(default)]
    pub processed_count: u32,

    /// Country page requests issued across every run
    #[serde(default)]
    pub request_count: u32,

    /// Region name to the countries assigned to it
    #[serde(default)]
    pub region_assignments: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub last_saved: Option<DateTime<Utc>>,
}

impl ScrapeProgress {
    /// Creates an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if a record for `country` is already stored
    pub fn is_done(&self, country: &str) -> bool {
        self.country_records.contains_key(country)
    }

    /// Stores a finished record and assigns the country to `region`
    pub fn insert_record(&mut self, country: &str, record: CountryRecord, region: &str) {
        self.country_records.insert(country.to_string(), record);
        self.assign_region(country, region);
        self.processed_count += 1;
    }

    /// Adds `country` to `region`, keeping each country in a single region
    pub fn assign_region(&mut self, country: &str, region: &str) {
        for (name, members) in self.region_assignments.iter_mut() {
            if name != region {
                members.retain(|c| c != country);
            }
        }
        self.region_assignments.retain(|_, members| !members.is_empty());

        let members = self.region_assignments.entry(region.to_string()).or_default();
        if !members.iter().any(|c| c == country) {
            members.push(country.to_string());
        }
    }

    /// Returns the recorded region for `country`, if any
    pub fn region_of(&self, country: &str) -> Option<&str> {
        self.region_assignments
            .iter()
            .find(|(_, members)| members.iter().any(|c| c == country))
            .map(|(region, _)| region.as_str())
    }

    /// Number of stored country records
    pub fn record_count(&self) -> usize {
        self.country_records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: &str) -> CountryRecord {
        CountryRecord::empty(url, Utc::now())
    }

    #[test]
    fn test_new_is_empty() {
        let progress = ScrapeProgress::new();
        assert_eq!(progress.record_count(), 0);
        assert_eq!(progress.processed_count, 0);
        assert!(progress.last_saved.is_none());
    }

    #[test]
    fn test_insert_record_marks_done() {
        let mut progress = ScrapeProgress::new();
        progress.insert_record("Kenya", record("https://example.com/kenya"), "Africa");

        assert!(progress.is_done("Kenya"));
        assert!(!progress.is_done("Brazil"));
        assert_eq!(progress.processed_count, 1);
        assert_eq!(progress.region_of("Kenya"), Some("Africa"));
    }

    #[test]
    fn test_assign_region_no_duplicates() {
        let mut progress = ScrapeProgress::new();
        progress.assign_region("Kenya", "Africa");
        progress.assign_region("Kenya", "Africa");

        assert_eq!(progress.region_assignments["Africa"], vec!["Kenya".to_string()]);
    }

    #[test]
    fn test_assign_region_moves_country() {
        let mut progress = ScrapeProgress::new();
        progress.assign_region("Atlantis", "Other");
        progress.assign_region("Atlantis", "Europe");

        assert_eq!(progress.region_of("Atlantis"), Some("Europe"));
        assert!(!progress.region_assignments.contains_key("Other"));
    }

    #[test]
    fn test_serializes_camel_case() {
        let mut progress = ScrapeProgress::new();
        progress.insert_record("Kenya", record("https://example.com/kenya"), "Africa");
        let json = serde_json::to_value(&progress).unwrap();

        assert!(json.get("countryRecords").is_some());
        assert!(json.get("processedCount").is_some());
        assert!(json.get("requestCount").is_some());
        assert!(json.get("regionAssignments").is_some());
        assert!(json.get("lastSaved").is_some());
    }

    #[test]
    fn test_missing_fields_default() {
        let progress: ScrapeProgress = serde_json::from_str("{}").unwrap();
        assert_eq!(progress, ScrapeProgress::default());
    }
}
