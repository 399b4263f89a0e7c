//! Run summary generation
//!
//! This module derives the end-of-run totals from a progress snapshot and
//! prints them in a formatted manner.

use crate::state::ScrapeProgress;
use serde::Serialize;

/// Totals describing a data set and the run that produced it
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Countries with a stored record
    pub total_countries: usize,

    /// Records holding at least one entry or malaria guidance
    pub with_data: usize,

    /// Records holding nothing
    pub empty: usize,

    /// Failed country attempts
    pub errors: usize,

    /// Countries skipped because they were already done
    pub skipped: usize,

    pub most_travellers: usize,
    pub some_travellers: usize,
    pub other_risks: usize,
    pub with_malaria: usize,
}

impl RunSummary {
    /// Summarizes `progress`, with error and skip counts supplied by the run
    pub fn from_progress(progress: &ScrapeProgress, errors: usize, skipped: usize) -> Self {
        let mut summary = Self {
            total_countries: progress.record_count(),
            errors,
            skipped,
            ..Self::default()
        };

        for record in progress.country_records.values() {
            if record.is_empty() {
                summary.empty += 1;
            } else {
                summary.with_data += 1;
            }
            summary.most_travellers += record.most_travellers.len();
            summary.some_travellers += record.some_travellers.len();
            summary.other_risks += record.other_risks.len();
            if record.malaria.is_some() {
                summary.with_malaria += 1;
            }
        }

        summary
    }

    /// Stored records over stored records plus failures, as a percentage
    pub fn success_rate(&self) -> f64 {
        let attempted = self.total_countries + self.errors;
        if attempted == 0 {
            return 0.0;
        }
        (self.total_countries as f64 / attempted as f64) * 100.0
    }
}

/// Prints the summary to stdout
pub fn print_summary(summary: &RunSummary) {
    println!("=== Scrape Summary ===\n");

    println!("Countries:");
    println!("  With data: {}", summary.with_data);
    println!("  Empty: {}", summary.empty);
    println!("  Errors: {}", summary.errors);
    println!("  Skipped (already done): {}", summary.skipped);
    println!();

    println!("Entries:");
    println!("  Most travellers: {}", summary.most_travellers);
    println!("  Some travellers: {}", summary.some_travellers);
    println!("  Other risks: {}", summary.other_risks);
    println!("  Countries with malaria info: {}", summary.with_malaria);
    println!();

    println!(
        "Success Rate: {:.1}% ({} stored, {} failed)",
        summary.success_rate(),
        summary.total_countries,
        summary.errors
    );
}
