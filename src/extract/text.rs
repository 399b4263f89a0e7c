//! Text helpers over parsed HTML
//!
//! `textContent`-like flattening with whitespace between block elements, and
//! the heading classification shared by the locator and the entry extractor.

use ego_tree::iter::Edge;
use ego_tree::NodeRef;
use scraper::{ElementRef, Node};

/// Elements whose text never counts as page content
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Elements that break text flow
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "details", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "summary", "table", "tbody",
    "td", "th", "thead", "tr", "ul",
];

/// Class names marking an element as a heading regardless of its tag
const HEADING_CLASSES: &[&str] = &["section-header", "subsection", "heading"];

/// Collapses runs of whitespace to single spaces and trims
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn is_skipped_tag(name: &str) -> bool {
    SKIPPED_TAGS.contains(&name)
}

pub fn is_block_tag(name: &str) -> bool {
    BLOCK_TAGS.contains(&name)
}

/// All text below `node`, hidden content included, whitespace-normalized
pub fn node_text(node: NodeRef<'_, Node>) -> String {
    let mut out = String::new();
    let mut skip_depth = 0usize;

    for edge in node.traverse() {
        match edge {
            Edge::Open(n) => match n.value() {
                Node::Element(el) if is_skipped_tag(el.name()) => skip_depth += 1,
                Node::Element(el) if skip_depth == 0 && is_block_tag(el.name()) => out.push(' '),
                Node::Text(text) if skip_depth == 0 => out.push_str(text),
                _ => {}
            },
            Edge::Close(n) => match n.value() {
                Node::Element(el) if is_skipped_tag(el.name()) => {
                    skip_depth = skip_depth.saturating_sub(1)
                }
                Node::Element(el) if skip_depth == 0 && is_block_tag(el.name()) => out.push(' '),
                _ => {}
            },
        }
    }

    normalize_whitespace(&out)
}

/// Text of an element, see [`node_text`]
pub fn element_text(element: ElementRef<'_>) -> String {
    node_text(*element)
}

/// First non-empty text node below `element`, trimmed
pub fn first_text_piece(element: ElementRef<'_>) -> Option<String> {
    element
        .descendants()
        .filter(|node| !inside_skipped(*node, element))
        .find_map(|node| match node.value() {
            Node::Text(text) => {
                let piece = normalize_whitespace(text);
                (!piece.is_empty()).then_some(piece)
            }
            _ => None,
        })
}

fn inside_skipped(node: NodeRef<'_, Node>, scope: ElementRef<'_>) -> bool {
    node.ancestors()
        .take_while(|a| a.id() != scope.id())
        .filter_map(ElementRef::wrap)
        .any(|a| is_skipped_tag(a.value().name()))
}

/// Returns the level of an `h1`-`h6` tag
pub fn heading_level(name: &str) -> Option<u8> {
    match name {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

/// Returns true for `h1`-`h6` elements and elements carrying a heading class
pub fn is_heading(element: ElementRef<'_>) -> bool {
    let value = element.value();
    heading_level(value.name()).is_some() || value.classes().any(|c| HEADING_CLASSES.contains(&c))
}

/// Rank of a heading, lower is more important
///
/// Class-based headings rank below every tag heading.
pub fn heading_rank(element: ElementRef<'_>) -> Option<u8> {
    heading_level(element.value().name()).or_else(|| is_heading(element).then_some(7))
}

/// Truncates to at most `max` characters
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn first<'a>(doc: &'a Html, css: &str) -> ElementRef<'a> {
        doc.select(&Selector::parse(css).unwrap()).next().unwrap()
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \n\t b  "), "a b");
        assert_eq!(normalize_whitespace(""), "");
    }

    #[test]
    fn test_element_text_separates_blocks() {
        let doc = Html::parse_fragment("<div><p>One</p><p>Two</p><span>Th</span><b>ree</b></div>");
        assert_eq!(element_text(first(&doc, "div")), "One Two Three");
    }

    #[test]
    fn test_element_text_reads_hidden_and_skips_scripts() {
        let doc = Html::parse_fragment(
            r#"<div><p style="display:none">Hidden</p><script>var x = 1;</script><p aria-hidden="true">Too</p></div>"#,
        );
        assert_eq!(element_text(first(&doc, "div")), "Hidden Too");
    }

    #[test]
    fn test_first_text_piece() {
        let doc = Html::parse_fragment("<div>  <span> Rabies  vaccination </span><p>Body</p></div>");
        assert_eq!(
            first_text_piece(first(&doc, "div")),
            Some("Rabies vaccination".to_string())
        );
    }

    #[test]
    fn test_heading_classification() {
        let doc = Html::parse_fragment(
            r#"<h4>A</h4><div class="section-header">B</div><p class="note">C</p>"#,
        );
        assert!(is_heading(first(&doc, "h4")));
        assert!(is_heading(first(&doc, "div")));
        assert!(!is_heading(first(&doc, "p")));

        assert_eq!(heading_rank(first(&doc, "h4")), Some(4));
        assert_eq!(heading_rank(first(&doc, "div")), Some(7));
        assert_eq!(heading_rank(first(&doc, "p")), None);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("éèêë", 2), "éè");
    }
}
