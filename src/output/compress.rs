//! Short-keyed record form used in partition files
//!
//! Each entry carries two channels: display fields (`d`, `p`) truncated to
//! fixed caps, and full-text fields kept verbatim. [`decompress_record`]
//! rebuilds a [`CountryRecord`] from the full-text channel; only risk factors
//! beyond the third are lost.

use crate::extract::truncate_chars;
use crate::model::{CountryRecord, MalariaInfo, RiskEntry, Subsection, VaccineEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const VACCINE_DESCRIPTION_CAP: usize = 200;
pub const VACCINE_PREVENTION_CAP: usize = 100;
pub const RISK_DESCRIPTION_CAP: usize = 150;
pub const RISK_PREVENTION_CAP: usize = 80;
pub const RISK_FACTORS_CAP: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressedVaccine {
    #[serde(rename = "n")]
    pub name: String,

    /// Description truncated for display
    #[serde(rename = "d")]
    pub short_description: String,

    /// Prevention truncated for display
    #[serde(rename = "p")]
    pub short_prevention: Option<String>,

    #[serde(rename = "r")]
    pub risk_factors: Option<Vec<String>>,

    pub country_specific: Option<String>,
    pub vaccination: Option<String>,
    pub additional_sections: Option<Vec<Subsection>>,

    pub description: String,
    pub prevention: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressedRisk {
    #[serde(rename = "n")]
    pub name: String,

    #[serde(rename = "t")]
    pub kind: String,

    #[serde(rename = "d")]
    pub short_description: String,

    #[serde(rename = "p")]
    pub short_prevention: Option<String>,

    pub description: String,
    pub prevention: Option<String>,
}

/// A country record as stored in a partition file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressedCountryRecord {
    /// Most travellers
    pub m: Vec<CompressedVaccine>,

    /// Some travellers
    pub s: Vec<CompressedVaccine>,

    /// Other risks
    pub r: Vec<CompressedRisk>,

    pub malaria: Option<MalariaInfo>,

    /// Last updated
    pub u: DateTime<Utc>,

    /// Source link
    pub l: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_title: Option<String>,
}

pub fn compress_record(record: &CountryRecord) -> CompressedCountryRecord {
    CompressedCountryRecord {
        m: record.most_travellers.iter().map(compress_vaccine).collect(),
        s: record.some_travellers.iter().map(compress_vaccine).collect(),
        r: record.other_risks.iter().map(compress_risk).collect(),
        malaria: record.malaria.clone(),
        u: record.last_updated,
        l: record.source_url.clone(),
        note: record.note.clone(),
        page_title: record.page_title.clone(),
    }
}

fn compress_vaccine(vaccine: &VaccineEntry) -> CompressedVaccine {
    CompressedVaccine {
        name: vaccine.name.clone(),
        short_description: truncate_chars(&vaccine.description, VACCINE_DESCRIPTION_CAP),
        short_prevention: vaccine
            .prevention
            .as_deref()
            .map(|p| truncate_chars(p, VACCINE_PREVENTION_CAP)),
        risk_factors: vaccine
            .risk_factors
            .as_ref()
            .map(|factors| factors.iter().take(RISK_FACTORS_CAP).cloned().collect()),
        country_specific: vaccine.country_specific.clone(),
        vaccination: vaccine.vaccination.clone(),
        additional_sections: vaccine.additional_sections.clone(),
        description: vaccine.description.clone(),
        prevention: vaccine.prevention.clone(),
    }
}

fn compress_risk(risk: &RiskEntry) -> CompressedRisk {
    CompressedRisk {
        name: risk.name.clone(),
        kind: risk.kind.clone(),
        short_description: truncate_chars(&risk.description, RISK_DESCRIPTION_CAP),
        short_prevention: risk
            .prevention
            .as_deref()
            .map(|p| truncate_chars(p, RISK_PREVENTION_CAP)),
        description: risk.description.clone(),
        prevention: risk.prevention.clone(),
    }
}

/// Rebuilds a record from the full-text channel of its compressed form
pub fn decompress_record(compressed: &CompressedCountryRecord) -> CountryRecord {
    CountryRecord {
        most_travellers: compressed.m.iter().map(decompress_vaccine).collect(),
        some_travellers: compressed.s.iter().map(decompress_vaccine).collect(),
        other_risks: compressed.r.iter().map(decompress_risk).collect(),
        malaria: compressed.malaria.clone(),
        last_updated: compressed.u,
        source_url: compressed.l.clone(),
        note: compressed.note.clone(),
        page_title: compressed.page_title.clone(),
    }
}

fn decompress_vaccine(vaccine: &CompressedVaccine) -> VaccineEntry {
    VaccineEntry {
        name: vaccine.name.clone(),
        description: vaccine.description.clone(),
        prevention: vaccine.prevention.clone(),
        risk_factors: vaccine.risk_factors.clone(),
        country_specific: vaccine.country_specific.clone(),
        vaccination: vaccine.vaccination.clone(),
        additional_sections: vaccine.additional_sections.clone(),
    }
}

fn decompress_risk(risk: &CompressedRisk) -> RiskEntry {
    RiskEntry {
        name: risk.name.clone(),
        kind: risk.kind.clone(),
        description: risk.description.clone(),
        prevention: risk.prevention.clone(),
    }
}
