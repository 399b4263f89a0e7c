//! Strategy cascade over a located section
//!
//! Each strategy is a plain function from a section scope to entries. The
//! cascade runs them in a fixed order and keeps the first non-empty result;
//! a strategy that finds nothing returns an empty list, never an error.

use scraper::ElementRef;
use std::collections::HashSet;
use tracing::debug;

use super::context::ExtractionContext;
use super::entry::{extract_entry, extract_prevention_advice, EntryContent};
use super::locator::{is_major_section, SectionQuery, SectionScope, OTHER_RISKS};
use super::names::{looks_like_health_risk, looks_like_vaccine_name, VACCINE_KEYWORDS};
use super::text::{element_text, first_text_piece};
use crate::model::{RiskEntry, VaccineEntry, HEALTH_RISK_TYPE};

/// Expand/collapse markup, tried selector by selector
const ACCORDION_SELECTORS: &[&str] = &[
    ".accordion-item",
    ".collapsible",
    ".expandable",
    "[data-toggle]",
    ".dropdown-toggle",
    "[aria-expanded]",
    "button[aria-controls]",
    ".accordion-button",
    r##"a[href="#"]"##,
    "a[data-target]",
];

const CLICKABLE_SELECTORS: &[&str] = &["a", "button", "[onclick]", "[tabindex]"];

const VACCINE_CLICKABLE_SELECTORS: &[&str] = &[
    "a",
    "button",
    "[onclick]",
    "[tabindex]",
    ".clickable",
    ".interactive",
    ".vaccine-link",
];

const LIST_ITEM_SELECTOR: &str = "li, dt, dd";

const SUBORDINATE_HEADINGS: &str = "h2, h3, h4, h5";

/// What kind of entry a section holds
pub trait EntryKind {
    type Entry;

    /// Name-plausibility filter for candidate labels
    fn looks_like(&self, text: &str) -> bool;

    /// Selectors scanned by the clickable-element strategy
    fn clickable_selectors(&self) -> &'static [&'static str];

    /// Substring of an href that marks a link as relevant
    fn link_hint(&self) -> Option<&'static str>;

    /// Labels searched in the full text when no better name is found
    fn fallback_names(&self) -> &'static [&'static str];

    fn build(&self, content: EntryContent) -> Self::Entry;

    fn entry_name<'e>(&self, entry: &'e Self::Entry) -> &'e str;
}

/// Vaccine recommendation entries ("Most travellers", "Some travellers")
#[derive(Debug, Clone, Copy, Default)]
pub struct VaccineKind;

impl EntryKind for VaccineKind {
    type Entry = VaccineEntry;

    fn looks_like(&self, text: &str) -> bool {
        looks_like_vaccine_name(text)
    }

    fn clickable_selectors(&self) -> &'static [&'static str] {
        VACCINE_CLICKABLE_SELECTORS
    }

    fn link_hint(&self) -> Option<&'static str> {
        Some("vaccine")
    }

    fn fallback_names(&self) -> &'static [&'static str] {
        VACCINE_KEYWORDS
    }

    fn build(&self, content: EntryContent) -> VaccineEntry {
        VaccineEntry {
            name: content.name,
            description: content.description,
            prevention: content.prevention,
            risk_factors: non_empty(content.risk_factors),
            country_specific: content.country_specific,
            vaccination: content.vaccination,
            additional_sections: non_empty(content.additional_sections),
        }
    }

    fn entry_name<'e>(&self, entry: &'e VaccineEntry) -> &'e str {
        &entry.name
    }
}

/// Non-vaccine health risks ("Other Risks")
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskKind;

impl EntryKind for RiskKind {
    type Entry = RiskEntry;

    fn looks_like(&self, text: &str) -> bool {
        looks_like_health_risk(text)
    }

    fn clickable_selectors(&self) -> &'static [&'static str] {
        CLICKABLE_SELECTORS
    }

    fn link_hint(&self) -> Option<&'static str> {
        Some("factsheet")
    }

    fn fallback_names(&self) -> &'static [&'static str] {
        &[]
    }

    fn build(&self, content: EntryContent) -> RiskEntry {
        let prevention = content
            .prevention
            .or_else(|| extract_prevention_advice(&content.flat_text));

        RiskEntry {
            name: content.name,
            kind: HEALTH_RISK_TYPE.to_string(),
            description: content.description,
            prevention,
        }
    }

    fn entry_name<'e>(&self, entry: &'e RiskEntry) -> &'e str {
        &entry.name
    }
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    (!items.is_empty()).then_some(items)
}

/// One named extraction strategy
pub struct Strategy<K: EntryKind> {
    pub name: &'static str,
    pub run: fn(&SectionScope<'_>, &K) -> Vec<K::Entry>,
}

/// The cascade, in the order it is tried
pub fn strategies<K: EntryKind>() -> [Strategy<K>; 5] {
    [
        Strategy {
            name: "accordion",
            run: accordion_strategy::<K>,
        },
        Strategy {
            name: "clickable",
            run: clickable_strategy::<K>,
        },
        Strategy {
            name: "list-item",
            run: list_item_strategy::<K>,
        },
        Strategy {
            name: "heading-cascade",
            run: heading_strategy::<K>,
        },
        Strategy {
            name: "link",
            run: link_strategy::<K>,
        },
    ]
}

/// Runs the cascade and returns the first non-empty, name-deduplicated result
pub fn run_strategies<K: EntryKind>(scope: &SectionScope<'_>, kind: &K) -> Vec<K::Entry> {
    for strategy in strategies::<K>() {
        let entries = dedupe_by_name(kind, (strategy.run)(scope, kind));
        if !entries.is_empty() {
            debug!(
                "Strategy '{}' found {} entries under '{}'",
                strategy.name,
                entries.len(),
                element_text(scope.heading)
            );
            return entries;
        }
    }
    Vec::new()
}

fn dedupe_by_name<K: EntryKind>(kind: &K, entries: Vec<K::Entry>) -> Vec<K::Entry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| seen.insert(kind.entry_name(entry).to_lowercase()))
        .collect()
}

/// Label filter applied to a candidate's whole text or its leading piece
fn label_passes<K: EntryKind>(kind: &K, element: ElementRef<'_>) -> bool {
    kind.looks_like(&element_text(element))
        || first_text_piece(element).is_some_and(|piece| kind.looks_like(&piece))
}

fn accordion_strategy<K: EntryKind>(scope: &SectionScope<'_>, kind: &K) -> Vec<K::Entry> {
    for selector in ACCORDION_SELECTORS {
        let entries: Vec<K::Entry> = scope
            .select(selector)
            .into_iter()
            .filter_map(|element| extract_entry(scope.ctx, kind, element))
            .collect();
        if !entries.is_empty() {
            return entries;
        }
    }
    Vec::new()
}

fn clickable_strategy<K: EntryKind>(scope: &SectionScope<'_>, kind: &K) -> Vec<K::Entry> {
    for selector in kind.clickable_selectors() {
        let entries: Vec<K::Entry> = scope
            .select(selector)
            .into_iter()
            .filter(|element| label_passes(kind, *element))
            .filter_map(|element| extract_entry(scope.ctx, kind, element))
            .collect();
        if !entries.is_empty() {
            return entries;
        }
    }
    Vec::new()
}

fn list_item_strategy<K: EntryKind>(scope: &SectionScope<'_>, kind: &K) -> Vec<K::Entry> {
    scope
        .select(LIST_ITEM_SELECTOR)
        .into_iter()
        .filter(|element| label_passes(kind, *element))
        .filter_map(|element| extract_entry(scope.ctx, kind, element))
        .collect()
}

fn heading_strategy<K: EntryKind>(scope: &SectionScope<'_>, kind: &K) -> Vec<K::Entry> {
    let mut entries = Vec::new();
    for heading in scope.headings(SUBORDINATE_HEADINGS) {
        let text = element_text(heading);
        if is_major_section(&text) {
            break;
        }
        if kind.looks_like(&text) {
            entries.extend(extract_entry(scope.ctx, kind, heading));
        }
    }
    entries
}

fn link_strategy<K: EntryKind>(scope: &SectionScope<'_>, kind: &K) -> Vec<K::Entry> {
    scope
        .select("a[href]")
        .into_iter()
        .filter(|link| {
            let href_hint = match (kind.link_hint(), link.value().attr("href")) {
                (Some(hint), Some(href)) => href.to_lowercase().contains(hint),
                _ => false,
            };
            href_hint || label_passes(kind, *link)
        })
        .filter_map(|link| extract_entry(scope.ctx, kind, link))
        .collect()
}

/// Extracts the vaccine entries listed under `query`, empty if the section is absent
pub fn extract_vaccine_section(ctx: &ExtractionContext<'_>, query: &SectionQuery) -> Vec<VaccineEntry> {
    extract_section(ctx, query, &VaccineKind)
}

/// Extracts the "Other Risks" entries, empty if the section is absent
pub fn extract_risk_section(ctx: &ExtractionContext<'_>) -> Vec<RiskEntry> {
    extract_section(ctx, &OTHER_RISKS, &RiskKind)
}

fn extract_section<K: EntryKind>(ctx: &ExtractionContext<'_>, query: &SectionQuery, kind: &K) -> Vec<K::Entry> {
    match SectionScope::locate(ctx, query) {
        Some(scope) => run_strategies(&scope, kind),
        None => {
            debug!("Section '{}' not found for {}", query.title, ctx.country);
            Vec::new()
        }
    }
}
