//! Content extraction from country advisory pages
//!
//! Extraction is synchronous and works on a parsed `scraper::Html` that never
//! crosses an await point. Nothing here fails: a section that cannot be found
//! or parsed yields an empty list, and the record carries a note instead.
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use travel_health_scraper::extract::extract_country_record;
//! use travel_health_scraper::model::CountryListing;
//!
//! let html = r#"<html><head><title>Kenya</title></head><body>
//!   <h2 id="Vaccine_Recommendations">Vaccine Recommendations</h2>
//!   <h3>Most travellers</h3>
//!   <ul><li>Hepatitis A</li><li>Tetanus</li></ul>
//! </body></html>"#;
//!
//! let listing = CountryListing::new("Kenya", "https://example.com/country/117/kenya");
//! let record = extract_country_record(html, &listing, Utc::now());
//! assert_eq!(record.most_travellers.len(), 2);
//! assert!(record.note.is_none());
//! ```

mod context;
mod entry;
mod locator;
mod malaria;
mod names;
mod strategies;
mod text;

pub use context::ExtractionContext;
pub use entry::{extract_prevention_advice, EntryContent};
pub use locator::{
    find_section, find_section_container, is_major_heading, is_major_section, SectionQuery,
    SectionScope, MAJOR_SECTIONS, MALARIA, MOST_TRAVELLERS, OTHER_RISKS, SOME_TRAVELLERS,
    VACCINE_RECOMMENDATIONS,
};
pub use malaria::extract_malaria;
pub use names::{
    clean_name, dedupe_description, looks_like_health_risk, looks_like_vaccine_name,
    MAX_NAME_CHARS, MIN_NAME_CHARS,
};
pub use strategies::{
    extract_risk_section, extract_vaccine_section, EntryKind, RiskKind, VaccineKind,
};
pub use text::{element_text, truncate_chars};

use chrono::{DateTime, Utc};
use scraper::Html;
use tracing::{debug, info, warn};

use crate::model::{CountryListing, CountryRecord};

pub const NOTE_NO_HEALTH_CONTENT: &str = "No health content found on page";
pub const NOTE_NO_PARSEABLE_CONTENT: &str = "No parseable content found despite health keywords";

/// Body words that make a page worth extracting without a vaccine section
const HEALTH_KEYWORDS: &[&str] = &["vaccine", "vaccination", "health", "disease", "risk"];

/// Extracts the full record for one country from its page
pub fn extract_country_record(
    html: &str,
    listing: &CountryListing,
    extracted_at: DateTime<Utc>,
) -> CountryRecord {
    let document = Html::parse_document(html);
    let ctx = ExtractionContext::new(&document, &listing.name, &listing.url);
    let mut record = CountryRecord::empty(&listing.url, extracted_at);
    let page_title = ctx.page_title();

    let mut notes = Vec::new();
    if find_section(&ctx, &VACCINE_RECOMMENDATIONS).is_none() {
        debug!("No vaccine recommendations section for {}", listing.name);

        if !has_health_signal(&ctx) {
            info!("No health content found for {}, storing empty record", listing.name);
            record.note = Some(NOTE_NO_HEALTH_CONTENT.to_string());
            record.page_title = page_title;
            return record;
        }

        if !title_matches_country(page_title.as_deref(), &listing.name) {
            warn!(
                "Page title {:?} does not match {}, possible redirect",
                page_title, listing.name
            );
            notes.push(format!("Page title does not match {}", listing.name));
        }
    }

    record.most_travellers = extract_vaccine_section(&ctx, &MOST_TRAVELLERS);
    record.some_travellers = extract_vaccine_section(&ctx, &SOME_TRAVELLERS);
    record.other_risks = extract_risk_section(&ctx);
    record.malaria = extract_malaria(&ctx, extracted_at);

    if record.is_empty() {
        notes.push(NOTE_NO_PARSEABLE_CONTENT.to_string());
    }

    info!(
        "Found {} most, {} some, {} risks, {} for {}",
        record.most_travellers.len(),
        record.some_travellers.len(),
        record.other_risks.len(),
        if record.malaria.is_some() { "malaria info" } else { "no malaria info" },
        listing.name
    );

    if !notes.is_empty() {
        record.note = Some(notes.join("; "));
        record.page_title = page_title;
    }
    record
}

/// Returns true if the page looks like it carries health content at all
fn has_health_signal(ctx: &ExtractionContext<'_>) -> bool {
    let body = ctx.body_text().to_lowercase();
    HEALTH_KEYWORDS.iter().any(|k| body.contains(k)) || ctx.element_by_id("Other_Risks").is_some()
}

/// Loose check that a page title names the expected country
///
/// Matches when the title contains the country, or when the part after
/// " - " is contained in the country name. A page without a title passes.
fn title_matches_country(title: Option<&str>, country: &str) -> bool {
    let Some(title) = title else {
        return true;
    };
    let title = title.to_lowercase();
    let country = country.to_lowercase();

    if title.contains(&country) {
        return true;
    }
    title
        .split(" - ")
        .nth(1)
        .map(str::trim)
        .is_some_and(|part| !part.is_empty() && country.contains(part))
}
