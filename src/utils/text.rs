//! Text normalization shared by every resolver.

use chrono::Datelike;
use regex::Regex;
use scraper::Html;
use std::fmt::Display;
use std::sync::OnceLock;

fn markup_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Covers namespaced tags such as <jats:p> as well as plain HTML.
    RE.get_or_init(|| Regex::new(r"</?[A-Za-z][^<>]*>").expect("valid markup regex"))
}

/// Collapse whitespace runs to one space, trim, and decode HTML entities.
///
/// Never fails; an empty input yields an empty string.
pub fn clean(text: &str) -> String {
    collapse_whitespace(&unescape_html(text))
}

/// Like [`clean`], but strips every markup tag (JATS, HTML) first.
pub fn clean_abstract(text: &str) -> String {
    let stripped = markup_re().replace_all(text, " ");
    clean(&stripped)
}

/// Collapse whitespace runs to a single space and trim the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode HTML character references (`&amp;`, `&eacute;`, `&#8211;`, ...).
///
/// Literal `<` is escaped before parsing so tag-like text survives as text.
fn unescape_html(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let fragment = Html::parse_fragment(&text.replace('<', "&lt;"));
    fragment.root_element().text().collect()
}

/// The current calendar year (UTC)
pub fn current_year() -> i32 {
    chrono::Utc::now().year()
}

/// Oldest year a record may carry
pub const RECORD_MIN_YEAR: i32 = 1800;

/// Oldest year accepted as a heuristic guess (PDF text, page dates)
pub const PLAUSIBLE_MIN_YEAR: i32 = 1900;

/// Interpret a value as a record's publication year.
///
/// The first four characters of the value's text form are parsed; the
/// result is kept only when it lies in `1800..=current_year + 1`.
pub fn parse_year<Y: Display>(value: Y) -> Option<i32> {
    let text = value.to_string();
    let head: String = text.trim().chars().take(4).collect();
    let year = head.parse::<i32>().ok()?;

    (RECORD_MIN_YEAR..=current_year() + 1)
        .contains(&year)
        .then_some(year)
}

/// Interpret a value as a plausible modern publication year.
///
/// Same parsing as [`parse_year`] with the floor raised to 1900, which is
/// what heuristic sources (PDF text, free-form page dates) are held to.
pub fn normalize_year<Y: Display>(value: Y) -> Option<i32> {
    parse_year(value).filter(|year| *year >= PLAUSIBLE_MIN_YEAR)
}

/// Cut `text` to at most `max_chars` characters
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
