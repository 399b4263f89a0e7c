//! Section locator
//!
//! Country pages are not consistent across countries or over time, so a
//! section is found through a cascade of looser and looser matches:
//!
//! 1. exact element id from the section's known ids,
//! 2. case-insensitive id substring,
//! 3. `h1`-`h5` heading whose text equals the title,
//! 4. `h1`-`h5` heading whose text contains the title, ignoring case.
//!
//! A missing section is `None`, never an error.

use scraper::{ElementRef, Selector};

use super::context::ExtractionContext;
use super::text::{element_text, heading_rank, is_heading};

/// Canonical top-level section titles; a section's content ends at any of these
pub const MAJOR_SECTIONS: &[&str] = &[
    "Most travellers",
    "Some travellers",
    "Other Risks",
    "Certificate requirements",
    "Malaria",
    "Health risks",
    "General Information",
    "Resources",
    "News",
    "Outbreaks",
    "All travellers",
    "Vaccine Recommendations",
];

const CONTAINER_TAGS: &[&str] = &["div", "section", "article"];

/// Rank given to a located node that is neither a heading nor a container
const DEFAULT_SECTION_RANK: u8 = 3;

/// How to find one named section
#[derive(Debug, Clone, Copy)]
pub struct SectionQuery {
    pub title: &'static str,
    pub ids: &'static [&'static str],
    pub id_fragment: Option<&'static str>,
}

pub const VACCINE_RECOMMENDATIONS: SectionQuery = SectionQuery {
    title: "Vaccine Recommendations",
    ids: &[
        "Vaccine_Recommendations",
        "vaccine_recommendations",
        "vaccines",
        "Vaccines",
    ],
    id_fragment: Some("vaccine"),
};

pub const MOST_TRAVELLERS: SectionQuery = SectionQuery {
    title: "Most travellers",
    ids: &[],
    id_fragment: None,
};

pub const SOME_TRAVELLERS: SectionQuery = SectionQuery {
    title: "Some travellers",
    ids: &[],
    id_fragment: None,
};

pub const OTHER_RISKS: SectionQuery = SectionQuery {
    title: "Other Risks",
    ids: &["Other_Risks"],
    id_fragment: None,
};

pub const MALARIA: SectionQuery = SectionQuery {
    title: "Malaria",
    ids: &["Malaria"],
    id_fragment: Some("malaria"),
};

/// Finds a section, first matching strategy wins
pub fn find_section<'a>(ctx: &ExtractionContext<'a>, query: &SectionQuery) -> Option<ElementRef<'a>> {
    query
        .ids
        .iter()
        .find_map(|id| ctx.element_by_id(id))
        .or_else(|| query.id_fragment.and_then(|f| find_by_id_fragment(ctx, f)))
        .or_else(|| find_heading(ctx, query.title, TitleMatch::Exact))
        .or_else(|| find_heading(ctx, query.title, TitleMatch::Contains))
}

#[derive(Clone, Copy)]
enum TitleMatch {
    Exact,
    Contains,
}

fn find_by_id_fragment<'a>(ctx: &ExtractionContext<'a>, fragment: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse("[id]").ok()?;
    let fragment = fragment.to_lowercase();
    ctx.document.select(&selector).find(|el| {
        el.value()
            .id()
            .is_some_and(|id| id.to_lowercase().contains(&fragment))
    })
}

fn find_heading<'a>(ctx: &ExtractionContext<'a>, title: &str, mode: TitleMatch) -> Option<ElementRef<'a>> {
    let selector = Selector::parse("h1, h2, h3, h4, h5").ok()?;
    let lower_title = title.to_lowercase();

    ctx.document
        .select(&selector)
        .find(|heading| {
            let text = element_text(*heading);
            match mode {
                TitleMatch::Exact => text == title,
                TitleMatch::Contains => text.to_lowercase().contains(&lower_title),
            }
        })
}

/// Returns true if `text` is one of the canonical top-level section titles
pub fn is_major_section(text: &str) -> bool {
    let text = text.trim();
    MAJOR_SECTIONS.contains(&text)
}

/// Returns true for `h1`-`h3`, or any heading titled like a top-level section
pub fn is_major_heading(element: ElementRef<'_>) -> bool {
    if matches!(element.value().name(), "h1" | "h2" | "h3") {
        return true;
    }
    is_heading(element) && is_major_section(&element_text(element))
}

fn is_container(element: ElementRef<'_>) -> bool {
    CONTAINER_TAGS.contains(&element.value().name())
}

/// Finds the block that holds a section's content
///
/// A located container is its own content block. For a heading, the nearest
/// following `div`/`section`/`article` sibling is used, unless a major heading
/// comes first; the heading's parent is the fallback.
pub fn find_section_container<'a>(section: ElementRef<'a>) -> ElementRef<'a> {
    if is_container(section) {
        return section;
    }

    for sibling in section.next_siblings().filter_map(ElementRef::wrap) {
        if is_major_heading(sibling) {
            break;
        }
        if is_container(sibling) {
            return sibling;
        }
    }

    section
        .parent()
        .and_then(ElementRef::wrap)
        .unwrap_or(section)
}

/// A located section: its heading, content block and document-order span
pub struct SectionScope<'a> {
    pub ctx: &'a ExtractionContext<'a>,
    pub heading: ElementRef<'a>,
    pub container: ElementRef<'a>,
    start: usize,
    end: usize,
}

impl<'a> SectionScope<'a> {
    pub fn new(ctx: &'a ExtractionContext<'a>, heading: ElementRef<'a>) -> Self {
        let container = find_section_container(heading);
        let start = ctx.position(heading.id());
        let end = if is_container(heading) {
            ctx.subtree_end(heading)
        } else {
            section_end(ctx, heading)
        };

        Self {
            ctx,
            heading,
            container,
            start,
            end,
        }
    }

    /// Locates `query` and scopes it, `None` if the section is absent
    pub fn locate(ctx: &'a ExtractionContext<'a>, query: &SectionQuery) -> Option<Self> {
        find_section(ctx, query).map(|heading| Self::new(ctx, heading))
    }

    /// Returns true if `element` lies inside this section's span
    pub fn contains(&self, element: ElementRef<'_>) -> bool {
        let position = self.ctx.position(element.id());
        position > self.start && position < self.end
    }

    /// Elements of the container matching `css`, restricted to the span
    ///
    /// The container itself is a candidate when it lies inside the span, as an
    /// accordion placed right after its heading does. An unparsable selector
    /// yields nothing.
    pub fn select(&self, css: &str) -> Vec<ElementRef<'a>> {
        let Ok(selector) = Selector::parse(css) else {
            return Vec::new();
        };
        let container_id = self.container.id();

        let mut found: Vec<ElementRef<'a>> = Vec::new();
        if selector.matches(&self.container) && self.contains(self.container) {
            found.push(self.container);
        }
        found.extend(
            self.container
                .select(&selector)
                .filter(|el| el.id() != container_id && self.contains(*el)),
        );
        found
    }

    /// First heading inside the span titled `title`
    ///
    /// Exact text wins over a case-insensitive substring.
    pub fn heading_titled(&self, title: &str) -> Option<ElementRef<'a>> {
        let headings = self.headings("h1, h2, h3, h4, h5");
        let lower_title = title.to_lowercase();

        headings
            .iter()
            .find(|heading| element_text(**heading) == title)
            .or_else(|| {
                headings
                    .iter()
                    .find(|heading| element_text(**heading).to_lowercase().contains(&lower_title))
            })
            .copied()
    }

    /// Headings matching `css` anywhere in the document, restricted to the span
    pub fn headings(&self, css: &str) -> Vec<ElementRef<'a>> {
        let Ok(selector) = Selector::parse(css) else {
            return Vec::new();
        };
        let heading_id = self.heading.id();

        self.ctx
            .document
            .select(&selector)
            .filter(|el| el.id() != heading_id && self.contains(*el))
            .collect()
    }
}

/// Position of the first heading after `heading` that closes its section
///
/// A section closes at a canonical section title, or at a heading of the same
/// or a higher rank.
fn section_end(ctx: &ExtractionContext<'_>, heading: ElementRef<'_>) -> usize {
    let rank = heading_rank(heading).unwrap_or(DEFAULT_SECTION_RANK);
    let after = ctx.subtree_end(heading);

    ctx.document
        .tree
        .root()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| ctx.position(el.id()) >= after)
        .find(|el| {
            heading_rank(*el).is_some_and(|r| r <= rank)
                || (is_heading(*el) && is_major_section(&element_text(*el)))
        })
        .map(|el| ctx.position(el.id()))
        .unwrap_or(usize::MAX)
}
