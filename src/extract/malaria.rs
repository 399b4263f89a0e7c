//! Malaria sub-sections, read from the already-parsed country page

use chrono::{DateTime, Utc};
use scraper::ElementRef;
use tracing::debug;

use super::context::ExtractionContext;
use super::locator::{find_section, is_major_heading, SectionScope, MALARIA};
use super::text::{element_text, heading_rank, is_heading};
use crate::model::MalariaInfo;

/// Shorter sub-section bodies are treated as missing
const MIN_CONTENT_CHARS: usize = 20;

/// Extracts malaria guidance, `None` when there is no section or nothing usable in it
pub fn extract_malaria(ctx: &ExtractionContext<'_>, last_updated: DateTime<Utc>) -> Option<MalariaInfo> {
    let Some(section) = find_section(ctx, &MALARIA) else {
        debug!("No malaria section for {}", ctx.country);
        return None;
    };
    let scope = SectionScope::new(ctx, section);

    let info = MalariaInfo {
        risk_areas: titled_block(&scope, "Risk areas"),
        special_risk_groups: titled_block(&scope, "Special risk groups"),
        general_info: lead_text(section),
        source_url: format!("{}#Malaria", ctx.source_url),
        last_updated,
    };

    if info.risk_areas.is_none() && info.special_risk_groups.is_none() && info.general_info.is_none() {
        debug!("Malaria section for {} has no usable content", ctx.country);
        return None;
    }
    Some(info)
}

/// Text under the first heading titled `title` inside the malaria section
fn titled_block(scope: &SectionScope<'_>, title: &str) -> Option<String> {
    let heading = scope.heading_titled(title)?;
    let rank = heading_rank(heading).unwrap_or(u8::MAX);

    let lines: Vec<String> = heading
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .take_while(|el| !is_major_heading(*el) && !heading_rank(*el).is_some_and(|r| r <= rank))
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect();

    long_enough(lines.join("\n"))
}

/// Introductory text of the section, before its first sub-heading
fn lead_text(section: ElementRef<'_>) -> Option<String> {
    let lines: Vec<String> = if is_heading(section) {
        section
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .take_while(|el| !is_heading(*el))
            .map(element_text)
            .filter(|text| !text.is_empty())
            .collect()
    } else {
        section
            .children()
            .filter_map(ElementRef::wrap)
            .take_while(|el| !is_heading(*el))
            .map(element_text)
            .filter(|text| !text.is_empty())
            .collect()
    };

    long_enough(lines.join("\n"))
}

fn long_enough(text: String) -> Option<String> {
    let text = text.trim().to_string();
    (text.chars().count() >= MIN_CONTENT_CHARS).then_some(text)
}
