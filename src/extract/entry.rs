//! Per-entry extraction
//!
//! Given one candidate element, collect the text that belongs to it (hidden
//! accordion content included), split it into a description and named
//! subsections, and fall back to sentence patterns for whatever structure did
//! not provide.

use ego_tree::NodeRef;
use regex::Regex;
use scraper::{ElementRef, Node, Selector};
use std::sync::LazyLock;

use super::context::ExtractionContext;
use super::locator::is_major_heading;
use super::names::{clean_name, dedupe_description, strip_label_noise};
use super::strategies::EntryKind;
use super::text::{
    element_text, first_text_piece, heading_rank, is_block_tag, is_heading, is_skipped_tag,
    normalize_whitespace,
};
use crate::model::Subsection;

/// Elements inside a candidate that usually carry its label
const NAME_CONTROLS: &str = "button, a, .clickable, .vaccine-name, h4, h3, strong";

/// List items mentioning any of these become risk factors
const RISK_FACTOR_WORDS: &[&str] = &["risk", "stay", "work", "travel"];

#[allow(clippy::expect_used)]
static COUNTRY_RISK_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)there is a.*?risk.*?in this country[^.]*\.",
        r"(?i)this country has.*?risk[^.]*\.",
        r"(?i)risk.*?in this country[^.]*\.",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("country pattern is valid"))
    .collect()
});

#[allow(clippy::expect_used)]
static PREVENTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)travellers?\s+should[^.]*\.",
        r"(?i)prevention[^.]*\.",
        r"(?i)avoid[^.]*mosquito[^.]*\.",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("prevention pattern is valid"))
    .collect()
});

#[allow(clippy::expect_used)]
static VACCINATION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)vaccination[^.]*considered[^.]*\.",
        r"(?i)vaccine.*?may be[^.]*\.",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("vaccination pattern is valid"))
    .collect()
});

#[allow(clippy::expect_used)]
static SENTENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^.]+\.").expect("sentence regex is valid"));

#[allow(clippy::expect_used)]
static ADVICE_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(take care with|avoid|use|clean|seek medical|prevention)\b")
        .expect("advice regex is valid")
});

/// Structured text of one entry, shared by every entry kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryContent {
    pub name: String,
    pub description: String,
    pub prevention: Option<String>,
    pub risk_factors: Vec<String>,
    pub country_specific: Option<String>,
    pub vaccination: Option<String>,
    pub additional_sections: Vec<Subsection>,

    /// Every block of the entry joined, used for last-resort advice lookup
    pub flat_text: String,
}

/// Builds an entry from a candidate element, `None` if it has no usable name
pub fn extract_entry<K: EntryKind>(
    ctx: &ExtractionContext<'_>,
    kind: &K,
    element: ElementRef<'_>,
) -> Option<K::Entry> {
    let name = entry_name(kind, element)?;
    let content = entry_content(ctx, element, name);
    Some(kind.build(content))
}

/// Picks the entry's label
///
/// Tried in order: labelled controls inside the element, the element's leading
/// text, then the kind's keyword list against the whole text.
pub fn entry_name<K: EntryKind>(kind: &K, element: ElementRef<'_>) -> Option<String> {
    if let Ok(selector) = Selector::parse(NAME_CONTROLS) {
        let from_control = element
            .select(&selector)
            .filter(|control| control.id() != element.id())
            .map(element_text)
            .filter(|text| kind.looks_like(text))
            .find_map(|text| clean_name(&text));
        if from_control.is_some() {
            return from_control;
        }
    }

    if let Some(piece) = first_text_piece(element) {
        let label = strip_label_noise(&piece);
        if kind.looks_like(&label) {
            if let Some(name) = clean_name(&label) {
                return Some(name);
            }
        }
    }

    let text = element_text(element).to_lowercase();
    kind.fallback_names()
        .iter()
        .find(|keyword| text.contains(*keyword))
        .and_then(|keyword| clean_name(keyword))
}

/// Collects and classifies the text belonging to `element`
pub fn entry_content(ctx: &ExtractionContext<'_>, element: ElementRef<'_>, name: String) -> EntryContent {
    let span = entry_span(ctx, element);
    let blocks = flatten_blocks(&span);
    let flat_text = blocks
        .iter()
        .map(Block::text)
        .collect::<Vec<_>>()
        .join(" ");

    let (description, subsections) = split_blocks(blocks, &name);

    let mut content = EntryContent {
        description: finalize_description(&description, &name),
        risk_factors: collect_risk_factors(&span),
        flat_text,
        ..EntryContent::default()
    };

    let country = ctx.country.to_lowercase();
    for section in subsections {
        let heading = section.heading.to_lowercase();
        if is_country_heading(&heading, &country) {
            if content.country_specific.is_none() {
                let combined = format!("{} {}", section.heading, section.content);
                content.country_specific = Some(combined.trim().to_string());
            }
        } else if heading.contains("prevention") {
            if content.prevention.is_none() {
                content.prevention = Some(section.content);
            }
        } else if heading.contains("vaccination") {
            if content.vaccination.is_none() {
                content.vaccination = Some(section.content);
            }
        } else {
            content.additional_sections.push(section);
        }
    }

    if content.country_specific.is_none() && !country.is_empty() {
        content.country_specific = first_match(&COUNTRY_RISK_PATTERNS, &content.flat_text);
    }
    if content.prevention.is_none() {
        content.prevention = first_match(&PREVENTION_PATTERNS, &content.flat_text);
    }
    if content.vaccination.is_none() {
        content.vaccination = vaccination_excerpt(&content.flat_text);
    }

    content.name = name;
    content
}

/// Nodes belonging to an entry
///
/// Headings and controls own their following siblings up to the next heading
/// of the same or higher rank, a major heading, or a sibling with the same
/// tag, plus the panel they reference. A `dt` owns its `dd` siblings.
fn entry_span<'a>(ctx: &ExtractionContext<'a>, element: ElementRef<'a>) -> Vec<NodeRef<'a, Node>> {
    let mut nodes: Vec<NodeRef<'a, Node>> = vec![*element];
    let tag = element.value().name();

    if tag == "dt" {
        for sibling in element.next_siblings() {
            match ElementRef::wrap(sibling) {
                Some(el) if el.value().name() == "dd" => nodes.push(sibling),
                Some(_) => break,
                None => {}
            }
        }
        return nodes;
    }

    if !is_heading(element) && !is_control(element) {
        return nodes;
    }

    let own_rank = heading_rank(element).unwrap_or(u8::MAX);
    for sibling in element.next_siblings() {
        if let Some(el) = ElementRef::wrap(sibling) {
            let closes = heading_rank(el).is_some_and(|rank| rank <= own_rank)
                || is_major_heading(el)
                || el.value().name() == tag;
            if closes {
                break;
            }
        }
        nodes.push(sibling);
    }

    if let Some(panel) = controlled_panel(ctx, element) {
        let already_covered = nodes
            .iter()
            .any(|node| panel.ancestors().any(|a| a.id() == node.id()) || panel.id() == node.id());
        if !already_covered {
            nodes.push(*panel);
        }
    }

    nodes
}

fn is_control(element: ElementRef<'_>) -> bool {
    let value = element.value();
    matches!(value.name(), "a" | "button")
        || value.attr("aria-controls").is_some()
        || value.attr("data-target").is_some()
}

/// Element referenced through `aria-controls`, `data-target` or a fragment href
fn controlled_panel<'a>(ctx: &ExtractionContext<'a>, element: ElementRef<'a>) -> Option<ElementRef<'a>> {
    let value = element.value();
    let target = value
        .attr("aria-controls")
        .and_then(|ids| ids.split_whitespace().next())
        .or_else(|| value.attr("data-target").map(|t| t.trim_start_matches('#')))
        .or_else(|| {
            value
                .attr("href")
                .and_then(|href| href.strip_prefix('#'))
                .filter(|id| !id.is_empty())
        })?;

    ctx.element_by_id(target)
        .filter(|panel| panel.id() != element.id())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Block {
    Heading(String),
    Text(String),
}

impl Block {
    fn text(&self) -> &str {
        match self {
            Self::Heading(text) | Self::Text(text) => text,
        }
    }
}

/// Flattens nodes into heading and text blocks in document order
///
/// Visibility is ignored: `display:none`, `aria-hidden` and collapsed panels
/// are read like any other content.
fn flatten_blocks(nodes: &[NodeRef<'_, Node>]) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut buffer = String::new();

    for node in nodes {
        walk(*node, &mut blocks, &mut buffer);
    }
    flush(&mut blocks, &mut buffer);

    blocks
}

fn walk(node: NodeRef<'_, Node>, blocks: &mut Vec<Block>, buffer: &mut String) {
    match node.value() {
        Node::Text(text) => buffer.push_str(text),
        Node::Element(el) => {
            if is_skipped_tag(el.name()) {
                return;
            }
            if let Some(element) = ElementRef::wrap(node) {
                if is_heading(element) {
                    flush(blocks, buffer);
                    let text = element_text(element);
                    if !text.is_empty() {
                        blocks.push(Block::Heading(text));
                    }
                    return;
                }
            }

            let block = is_block_tag(el.name());
            if block {
                flush(blocks, buffer);
            }
            for child in node.children() {
                walk(child, blocks, buffer);
            }
            if block {
                flush(blocks, buffer);
            }
        }
        _ => {}
    }
}

fn flush(blocks: &mut Vec<Block>, buffer: &mut String) {
    let text = normalize_whitespace(buffer);
    if !text.is_empty() {
        blocks.push(Block::Text(text));
    }
    buffer.clear();
}

/// Splits blocks into leading description text and named subsections
///
/// A first block that reduces to the entry's name is the title; it is kept in
/// the description as the bare name so de-duplication removes it once.
fn split_blocks(blocks: Vec<Block>, name: &str) -> (String, Vec<Subsection>) {
    let mut description = Vec::new();
    let mut subsections: Vec<Subsection> = Vec::new();
    let mut current: Option<(String, Vec<String>)> = None;

    for (index, block) in blocks.into_iter().enumerate() {
        if index == 0 && is_title(block.text(), name) {
            description.push(name.to_string());
            continue;
        }

        match block {
            Block::Heading(heading) => {
                if let Some((h, parts)) = current.take() {
                    push_subsection(&mut subsections, h, parts);
                }
                current = Some((heading, Vec::new()));
            }
            Block::Text(text) => match current.as_mut() {
                Some((_, parts)) => parts.push(text),
                None => description.push(text),
            },
        }
    }

    if let Some((h, parts)) = current {
        push_subsection(&mut subsections, h, parts);
    }

    (description.join(" "), subsections)
}

fn is_title(text: &str, name: &str) -> bool {
    clean_name(text).is_some_and(|cleaned| cleaned.eq_ignore_ascii_case(name))
}

fn push_subsection(subsections: &mut Vec<Subsection>, heading: String, parts: Vec<String>) {
    let content = parts.join(" ");
    if !content.is_empty() {
        subsections.push(Subsection { heading, content });
    }
}

fn finalize_description(description: &str, name: &str) -> String {
    let cleaned = dedupe_description(description, name);
    if cleaned.is_empty() || cleaned.eq_ignore_ascii_case(name) {
        format!("Information about {}", name)
    } else {
        cleaned
    }
}

/// Returns true for sub-headings like "Hepatitis A in Kenya"
///
/// Matching is literal; aliases of the country name are not recognized.
fn is_country_heading(heading_lower: &str, country_lower: &str) -> bool {
    if country_lower.is_empty() {
        return false;
    }
    let padded = format!(" {} ", heading_lower);
    padded.contains(" in ") && heading_lower.contains(country_lower)
}

fn collect_risk_factors(span: &[NodeRef<'_, Node>]) -> Vec<String> {
    let Ok(selector) = Selector::parse("li") else {
        return Vec::new();
    };

    let mut factors: Vec<String> = Vec::new();
    for element in span.iter().filter_map(|node| ElementRef::wrap(*node)) {
        for item in element.select(&selector) {
            let text = element_text(item);
            let lower = text.to_lowercase();
            if RISK_FACTOR_WORDS.iter().any(|w| lower.contains(w)) && !factors.contains(&text) {
                factors.push(text);
            }
        }
    }
    factors
}

fn first_match(patterns: &[Regex], text: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|pattern| pattern.find(text))
        .map(|m| m.as_str().trim().to_string())
}

/// Up to three sentences starting at the first vaccination statement
fn vaccination_excerpt(text: &str) -> Option<String> {
    let start = VACCINATION_PATTERNS
        .iter()
        .find_map(|pattern| pattern.find(text))?
        .start();

    let excerpt = SENTENCE
        .find_iter(&text[start..])
        .take(3)
        .map(|m| m.as_str().trim())
        .collect::<Vec<_>>()
        .join(" ");

    (!excerpt.is_empty()).then_some(excerpt)
}

/// First sentence carrying prevention advice
pub fn extract_prevention_advice(text: &str) -> Option<String> {
    text.split('.')
        .map(str::trim)
        .find(|sentence| !sentence.is_empty() && ADVICE_WORDS.is_match(sentence))
        .map(|sentence| format!("{}.", sentence))
}
