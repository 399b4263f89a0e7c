use ego_tree::NodeId;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;

use super::text::element_text;

/// Everything extraction needs to know about the page being processed
///
/// Threaded explicitly through every locator and strategy call; nothing is
/// kept between countries.
pub struct ExtractionContext<'a> {
    pub document: &'a Html,

    /// Country the page is expected to describe
    pub country: &'a str,

    /// URL the page was fetched from
    pub source_url: &'a str,

    /// Node id to its position in document order
    positions: HashMap<NodeId, usize>,
}

impl<'a> ExtractionContext<'a> {
    pub fn new(document: &'a Html, country: &'a str, source_url: &'a str) -> Self {
        let positions = document
            .tree
            .root()
            .descendants()
            .enumerate()
            .map(|(position, node)| (node.id(), position))
            .collect();

        Self {
            document,
            country,
            source_url,
            positions,
        }
    }

    /// Position of a node in document order
    pub fn position(&self, id: NodeId) -> usize {
        self.positions.get(&id).copied().unwrap_or(usize::MAX)
    }

    /// Position just past the last descendant of `element`
    pub fn subtree_end(&self, element: ElementRef<'a>) -> usize {
        element
            .descendants()
            .last()
            .map(|node| self.position(node.id()).saturating_add(1))
            .unwrap_or(usize::MAX)
    }

    /// Element carrying exactly this `id` attribute
    pub fn element_by_id(&self, id: &str) -> Option<ElementRef<'a>> {
        let selector = Selector::parse("[id]").ok()?;
        self.document
            .select(&selector)
            .find(|el| el.value().id() == Some(id))
    }

    /// Text of the `<title>` element, if any
    pub fn page_title(&self) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        self.document
            .select(&selector)
            .next()
            .map(element_text)
            .filter(|title| !title.is_empty())
    }

    /// Whitespace-normalized text of the whole body
    pub fn body_text(&self) -> String {
        Selector::parse("body")
            .ok()
            .and_then(|selector| self.document.select(&selector).next())
            .map(element_text)
            .unwrap_or_else(|| element_text(self.document.root_element()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_follow_document_order() {
        let doc = Html::parse_document("<html><body><h2>A</h2><p>B</p><h2>C</h2></body></html>");
        let ctx = ExtractionContext::new(&doc, "Kenya", "https://example.com/kenya");
        let h2 = Selector::parse("h2").unwrap();
        let p = Selector::parse("p").unwrap();

        let headings: Vec<_> = doc.select(&h2).collect();
        let para = doc.select(&p).next().unwrap();

        assert!(ctx.position(headings[0].id()) < ctx.position(para.id()));
        assert!(ctx.position(para.id()) < ctx.position(headings[1].id()));
        assert!(ctx.subtree_end(headings[0]) <= ctx.position(para.id()));
    }

    #[test]
    fn test_page_title_and_lookup() {
        let doc = Html::parse_document(
            r#"<html><head><title> Kenya - Travel Health </title></head><body><div id="Malaria">x</div></body></html>"#,
        );
        let ctx = ExtractionContext::new(&doc, "Kenya", "https://example.com/kenya");

        assert_eq!(ctx.page_title(), Some("Kenya - Travel Health".to_string()));
        assert!(ctx.element_by_id("Malaria").is_some());
        assert!(ctx.element_by_id("malaria").is_none());
        assert_eq!(ctx.body_text(), "x");
    }
}
