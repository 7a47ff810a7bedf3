//! Small field-level helpers shared by the converters: URL extraction,
//! keyword cleanup, file size parsing, and date coercion.

use std::sync::LazyLock;

use regex::Regex;

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"http[s]?://(?:[a-zA-Z]|[0-9]|[$-_@.&+]|[!*\(\),]|(?:%[0-9a-fA-F][0-9a-fA-F]))+")
        .expect("URL regex must compile")
});

/// Extracts all URLs from free text, in order of appearance.
/// HTML entities are decoded so `&amp;` inside a query string survives.
pub fn extract_urls(text: &str) -> Vec<String> {
    let decoded = html_escape::decode_html_entities(text);
    URL_RE
        .find_iter(&decoded)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Builds a GeoJSON Polygon string from decimal bounding-box corners.
/// The ring runs NW, NE, SE, SW and closes back at NW.
pub fn bbox_polygon(west: &str, east: &str, north: &str, south: &str) -> String {
    format!(
        "{{\"type\": \"Polygon\", \"coordinates\": [[[{west}, {north}], [{east}, {north}], [{east}, {south}], [{west}, {south}], [{west}, {north}]]]}}"
    )
}

/// Normalizes one keyword: bracket characters become separators, the
/// result is lowercased and trimmed.
pub fn clean_keyword(raw: &str) -> String {
    raw.trim()
        .replace('/', " - ")
        .replace('(', "- ")
        .replace(')', "")
        .replace('[', "- ")
        .replace(']', "")
        .replace('+', "")
        .to_lowercase()
        .trim()
        .to_string()
}

/// Cleans and merges keywords into `seed`, flattening `a > b > c`
/// hierarchies to their leaf term, then dedupes and sorts the result.
pub fn merge_keywords(raw: &[String], mut seed: Vec<String>) -> Vec<String> {
    for keyword in raw {
        let leaf = keyword.split('>').next_back().unwrap_or(keyword);
        let cleaned = clean_keyword(leaf);
        if !cleaned.is_empty() {
            seed.push(cleaned);
        }
    }
    seed.sort();
    seed.dedup();
    seed
}

/// Parses a human file size such as `"2 MB"` into bytes using binary
/// multiples. Anything unparseable collapses to zero.
pub fn parse_file_size(raw: &str) -> u64 {
    let mut parts = raw.split_whitespace();
    let value: f64 = match parts.next().and_then(|v| v.parse().ok()) {
        Some(v) => v,
        None => return 0,
    };
    let multiplier = match parts.next() {
        Some("KB") => 1024.0,
        Some("MB") => 1_048_576.0,
        Some("GB") => 1_073_741_824.0,
        _ => return 0,
    };
    (value * multiplier).round() as u64
}

/// Whether a partial date anchors the start or the end of a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBound {
    Start,
    End,
}

/// Widens partial provider dates: a bare year becomes January 1st or
/// December 31st depending on the bound, a year-month gets the first of
/// the month. An empty string, or `"ongoing"` as an end bound, yields
/// `None`. Full dates pass through verbatim.
pub fn coerce_date(raw: &str, bound: DateBound) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if bound == DateBound::End && trimmed.eq_ignore_ascii_case("ongoing") {
        return None;
    }
    match trimmed.len() {
        4 => match bound {
            DateBound::Start => Some(format!("{trimmed}-01-01")),
            DateBound::End => Some(format!("{trimmed}-12-31")),
        },
        7 => Some(format!("{trimmed}-01")),
        _ => Some(trimmed.to_string()),
    }
}
