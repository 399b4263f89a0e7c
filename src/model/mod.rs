//! Data model for extracted health records
//!
//! These types are serialized as-is into the full data dump and the progress
//! checkpoint, so field names follow the camelCase JSON the consumers expect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Type tag carried by every risk entry
pub const HEALTH_RISK_TYPE: &str = "health_risk";

/// A country as listed on the directory page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryListing {
    /// Display name, used as the record key
    pub name: String,

    /// Absolute URL of the country's advisory page
    pub url: String,

    /// URL-friendly form of the name
    pub slug: String,
}

impl CountryListing {
    /// Creates a listing, deriving the slug from the name
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        let name = name.into();
        let slug = slugify(&name);
        Self {
            name,
            url: url.into(),
            slug,
        }
    }
}

/// Converts a name into a lowercase, hyphen-separated slug
///
/// # Examples
///
/// ```
/// use travel_health_scraper::model::slugify;
///
/// assert_eq!(slugify("Sao Tome and Principe"), "sao-tome-and-principe");
/// assert_eq!(slugify("Korea, South"), "korea-south");
/// ```
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// A named block of text found under a sub-heading of an entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subsection {
    pub heading: String,
    pub content: String,
}

/// A vaccine recommendation for travellers to a country
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaccineEntry {
    /// Short, title-cased disease or vaccine label
    pub name: String,

    pub description: String,

    #[serde(default)]
    pub prevention: Option<String>,

    #[serde(default)]
    pub risk_factors: Option<Vec<String>>,

    /// Text under an "in <country>" sub-heading
    #[serde(default)]
    pub country_specific: Option<String>,

    #[serde(default)]
    pub vaccination: Option<String>,

    #[serde(default)]
    pub additional_sections: Option<Vec<Subsection>>,
}

/// A non-vaccine health risk (insects, food and water, air quality, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskEntry {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: String,

    pub description: String,

    #[serde(default)]
    pub prevention: Option<String>,
}

/// Malaria guidance taken from the country page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MalariaInfo {
    #[serde(default)]
    pub risk_areas: Option<String>,

    #[serde(default)]
    pub special_risk_groups: Option<String>,

    #[serde(default)]
    pub general_info: Option<String>,

    pub source_url: String,

    pub last_updated: DateTime<Utc>,
}

/// Everything extracted for one country
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryRecord {
    #[serde(default)]
    pub most_travellers: Vec<VaccineEntry>,

    #[serde(default)]
    pub some_travellers: Vec<VaccineEntry>,

    #[serde(default)]
    pub other_risks: Vec<RiskEntry>,

    #[serde(default)]
    pub malaria: Option<MalariaInfo>,

    pub last_updated: DateTime<Utc>,

    pub source_url: String,

    /// Diagnostic marker explaining an empty or suspicious record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    /// Page title, kept alongside the note for offline diagnosis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_title: Option<String>,
}

impl CountryRecord {
    /// Creates a record with no entries
    pub fn empty(source_url: impl Into<String>, last_updated: DateTime<Utc>) -> Self {
        Self {
            most_travellers: Vec::new(),
            some_travellers: Vec::new(),
            other_risks: Vec::new(),
            malaria: None,
            last_updated,
            source_url: source_url.into(),
            note: None,
            page_title: None,
        }
    }

    /// Returns true if nothing at all was extracted
    pub fn is_empty(&self) -> bool {
        self.entry_count() == 0 && self.malaria.is_none()
    }

    /// Total number of vaccine and risk entries
    pub fn entry_count(&self) -> usize {
        self.most_travellers.len() + self.some_travellers.len() + self.other_risks.len()
    }
}

/// One failed country (or directory) attempt, as written to `error-log.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLogEntry {
    pub country: String,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorLogEntry {
    pub fn new(country: impl Into<String>, error: impl ToString) -> Self {
        Self {
            country: country.into(),
            error: error.to_string(),
            timestamp: Utc::now(),
        }
    }
}
