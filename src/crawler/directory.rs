//! Country directory parser
//!
//! Turns the directory page into the ordered list of countries to process.
//! Anchors are found through a selector cascade; the first selector that
//! matches anything is used.

use crate::extract::element_text;
use crate::model::CountryListing;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Selectors for country links, most specific first
const COUNTRY_LINK_SELECTORS: &[&str] = &[".number_div a", ".country-list a", r#"a[href*="/country/"]"#];

/// Parses the directory page into country listings
///
/// Relative hrefs are resolved against `base_url`; a name seen twice keeps
/// its first link. Directory order is preserved.
///
/// # Example
///
/// ```
/// use travel_health_scraper::crawler::parse_country_directory;
/// use url::Url;
///
/// let html = r#"<div class="number_div"><a href="/country/32/brazil">Brazil</a></div>"#;
/// let base = Url::parse("https://example.com").unwrap();
/// let countries = parse_country_directory(html, &base);
/// assert_eq!(countries[0].url, "https://example.com/country/32/brazil");
/// assert_eq!(countries[0].slug, "brazil");
/// ```
pub fn parse_country_directory(html: &str, base_url: &Url) -> Vec<CountryListing> {
    let document = Html::parse_document(html);

    for css in COUNTRY_LINK_SELECTORS {
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };

        let mut seen = HashSet::new();
        let listings: Vec<CountryListing> = document
            .select(&selector)
            .filter_map(|anchor| {
                let name = element_text(anchor);
                let url = resolve_link(anchor.value().attr("href")?, base_url)?;
                (!name.is_empty()).then(|| CountryListing::new(name, url))
            })
            .filter(|listing| seen.insert(listing.name.clone()))
            .collect();

        if !listings.is_empty() {
            tracing::debug!("Directory selector '{}' matched {} countries", css, listings.len());
            return listings;
        }
    }

    Vec::new()
}

/// Resolves a link href to an absolute HTTP(S) URL
///
/// Returns None for empty hrefs, fragment-only links and non-HTTP schemes.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    matches!(absolute_url.scheme(), "http" | "https").then(|| absolute_url.to_string())
}
