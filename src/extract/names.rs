//! Name plausibility filters and label cleanup
//!
//! Source pages repeat labels inside bodies, wrap them in list markers and
//! append country clauses; everything here turns that into short labels.

use regex::Regex;
use std::sync::LazyLock;

/// Shortest accepted label, in characters
pub const MIN_NAME_CHARS: usize = 2;

/// Longest accepted label, in characters
pub const MAX_NAME_CHARS: usize = 30;

/// Known vaccine-preventable diseases, also used as a last-resort name source
pub const VACCINE_KEYWORDS: &[&str] = &[
    "hepatitis a",
    "hepatitis b",
    "hepatitis",
    "tetanus",
    "typhoid",
    "rabies",
    "measles",
    "mumps",
    "rubella",
    "dengue",
    "zika",
    "yellow fever",
    "japanese encephalitis",
    "tick-borne",
    "meningococcal",
    "pneumococcal",
    "influenza",
    "cholera",
    "polio",
    "diphtheria",
    "lyssavirus",
    "covid",
    "chikungunya",
];

const HEALTH_RISK_KEYWORDS: &[&str] = &[
    "infection",
    "disease",
    "virus",
    "bacteria",
    "parasite",
    "influenza",
    "dengue",
    "zika",
    "malaria",
    "schistosomiasis",
    "sexually transmitted",
    "insect",
    "tick",
    "mosquito",
    "bite",
    "air quality",
    "pollution",
    "heat",
    "cold",
    "water",
    "food",
    "hygiene",
    "safety",
    "accident",
    "injury",
];

/// Words that turn a disease name into a vaccine label, longest first
const LABEL_SUFFIXES: &[&str] = &["vaccinations", "vaccination", "vaccines", "vaccine"];

const COMMON_WORDS: &[&str] = &[
    "prevention",
    "information",
    "details",
    "more",
    "click",
    "here",
    "about",
    "general",
    "country",
    "travel",
    "health",
    "advice",
];

#[allow(clippy::expect_used)]
static VACCINATION_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+vaccin(?:e|es|ation|ations)\s*$").expect("suffix regex is valid")
});

#[allow(clippy::expect_used)]
static IN_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+in\s+\w+.*$").expect("in-clause regex is valid"));

#[allow(clippy::expect_used)]
static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[\d.\-*•]+\s*").expect("list marker regex is valid"));

#[allow(clippy::expect_used)]
static VACCINE_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[a-z\s]+\s*(vaccination?|vaccine)$").expect("vaccine phrase regex is valid")
});

#[allow(clippy::expect_used)]
static RISK_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[a-z\s]+(infection|disease|virus|risk)s?$").expect("risk phrase regex is valid")
});

#[allow(clippy::expect_used)]
static SINGLE_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]{4,15}$").expect("single word regex is valid"));

/// Returns true if `text` plausibly names a vaccine or vaccine-preventable disease
pub fn looks_like_vaccine_name(text: &str) -> bool {
    let text = text.trim();
    let len = text.chars().count();
    if !(3..=50).contains(&len) {
        return false;
    }

    let lower = text.to_lowercase();
    VACCINE_KEYWORDS.iter().any(|k| lower.contains(k))
        || VACCINE_PHRASE.is_match(text)
        || is_uncommon_single_word(text, &lower)
}

/// Returns true if `text` plausibly names a non-vaccine health risk
pub fn looks_like_health_risk(text: &str) -> bool {
    let text = text.trim();
    let len = text.chars().count();
    if !(3..=100).contains(&len) {
        return false;
    }

    let lower = text.to_lowercase();
    HEALTH_RISK_KEYWORDS.iter().any(|k| lower.contains(k))
        || RISK_PHRASE.is_match(text)
        || is_uncommon_single_word(text, &lower)
}

fn is_uncommon_single_word(text: &str, lower: &str) -> bool {
    SINGLE_WORD.is_match(text) && !COMMON_WORDS.contains(&lower)
}

/// Strips label noise without validating or re-casing the result
///
/// Removes a trailing "in <country...>" clause, a trailing vaccine/vaccination
/// suffix, list-marker prefixes, then cuts at the first colon, open paren or
/// standalone dash. Hyphens inside words are kept ("Tick-borne").
pub fn strip_label_noise(raw: &str) -> String {
    let text = super::text::normalize_whitespace(raw);
    let text = IN_CLAUSE.replace(&text, "");
    let text = VACCINATION_SUFFIX.replace(&text, "");
    let text = LIST_MARKER.replace(&text, "");
    truncate_at_separator(&text).trim().to_string()
}

fn truncate_at_separator(text: &str) -> &str {
    let cut = [
        text.find(':'),
        text.find('('),
        text.find(" - "),
        text.find('\u{2013}'),
        text.find('\u{2014}'),
    ]
    .into_iter()
    .flatten()
    .min();

    match cut {
        Some(idx) => &text[..idx],
        None => text,
    }
}

/// Turns a raw label into a short, title-cased name
///
/// Returns `None` when the cleaned label is outside 2..=30 characters.
///
/// # Examples
///
/// ```
/// use travel_health_scraper::extract::clean_name;
///
/// assert_eq!(clean_name("hepatitis A vaccination"), Some("Hepatitis A".to_string()));
/// assert_eq!(clean_name("Rabies in Kenya"), Some("Rabies".to_string()));
/// assert_eq!(clean_name("x"), None);
/// ```
pub fn clean_name(raw: &str) -> Option<String> {
    let cleaned = strip_label_noise(raw);
    let len = cleaned.chars().count();
    if !(MIN_NAME_CHARS..=MAX_NAME_CHARS).contains(&len) {
        return None;
    }
    Some(title_case(&cleaned))
}

/// Lowercases every word and capitalizes its first character
pub fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Removes the label echoed at the start of a description
///
/// A raw label such as `Rabies vaccination` counts as the bare name. A doubled
/// `name name` prefix collapses to a single occurrence; otherwise a single
/// leading `name ` is stripped. Matching ignores ASCII case. Later
/// occurrences of the name are never touched.
///
/// # Examples
///
/// ```
/// use travel_health_scraper::extract::dedupe_description;
///
/// assert_eq!(
///     dedupe_description("Hepatitis A Hepatitis A is recommended for all travellers.", "Hepatitis A"),
///     "Hepatitis A is recommended for all travellers."
/// );
/// assert_eq!(dedupe_description("Rabies Spread by bites.", "Rabies"), "Spread by bites.");
/// assert_eq!(
///     dedupe_description("Rabies vaccination Rabies is spread by bites.", "Rabies"),
///     "Rabies is spread by bites."
/// );
/// ```
pub fn dedupe_description(description: &str, name: &str) -> String {
    let mut text = description.trim().to_string();
    if name.is_empty() {
        return text;
    }
    text = collapse_label_suffix(&text, name);

    let doubled = format!("{} {}", name, name);
    let mut collapsed = false;
    while starts_with_ignore_ascii_case(&text, &doubled) {
        text = text[name.len() + 1..].to_string();
        collapsed = true;
    }

    if !collapsed && starts_with_ignore_ascii_case(&text, &format!("{} ", name)) {
        text = text[name.len() + 1..].trim_start().to_string();
    }

    text
}

/// Rewrites a leading `name vaccine`/`name vaccination` label to `name`
fn collapse_label_suffix(text: &str, name: &str) -> String {
    if !starts_with_ignore_ascii_case(text, name) {
        return text.to_string();
    }
    let rest = &text[name.len()..];
    let trimmed = rest.trim_start();
    if trimmed.len() == rest.len() {
        return text.to_string();
    }

    let suffix = LABEL_SUFFIXES.iter().find(|suffix| {
        starts_with_ignore_ascii_case(trimmed, suffix)
            && trimmed[suffix.len()..]
                .chars()
                .next()
                .map_or(true, char::is_whitespace)
    });

    match suffix {
        Some(suffix) => format!("{}{}", name, &trimmed[suffix.len()..]),
        None => text.to_string(),
    }
}

fn starts_with_ignore_ascii_case(text: &str, prefix: &str) -> bool {
    text.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}
