//! Static region lookup used to bucket countries into output partitions
//!
//! A region carries no meaning for the health data itself; it only bounds how
//! many countries end up in a single partition file.

mod table;

pub use table::REGION_TABLE;

/// Region for countries the table does not know
pub const OTHER_REGION: &str = "Other";

/// Returns the region a country belongs to
///
/// An exact (case-insensitive) name match anywhere in the table wins first.
/// Otherwise the first region with an entry that contains the name, or is
/// contained in it, as a whole-word sequence wins. Unmatched names fall into
/// [`OTHER_REGION`].
///
/// # Examples
///
/// ```
/// use travel_health_scraper::region_for;
///
/// assert_eq!(region_for("Kenya"), "Africa");
/// assert_eq!(region_for("Papua New Guinea"), "Oceania");
/// assert_eq!(region_for("Atlantis"), "Other");
/// ```
pub fn region_for(country: &str) -> &'static str {
    let name = normalize_words(country);
    if name.is_empty() {
        return OTHER_REGION;
    }

    for (region, countries) in REGION_TABLE {
        if countries.iter().any(|c| normalize_words(c) == name) {
            return region;
        }
    }

    for (region, countries) in REGION_TABLE {
        let matched = countries.iter().any(|c| {
            let entry = normalize_words(c);
            contains_words(&name, &entry) || contains_words(&entry, &name)
        });
        if matched {
            return region;
        }
    }

    OTHER_REGION
}

/// Lowercases and splits on anything that is not alphanumeric
fn normalize_words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Returns true if `needle` appears as a contiguous run of words in `haystack`
fn contains_words(haystack: &[String], needle: &[String]) -> bool {
    !needle.is_empty()
        && needle.len() <= haystack.len()
        && haystack.windows(needle.len()).any(|w| w == needle)
}
