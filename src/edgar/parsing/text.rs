use html_escape::decode_html_entities;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};
use std::borrow::Cow;
use unicode_normalization::UnicodeNormalization;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Namespace-prefixed elements written in XHTML self-closing form, e.g.
/// `<ix:nonFraction ... xsi:nil="true"/>`.
static SELF_CLOSING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<([A-Za-z][\w.-]*:[\w.-]+)([^<>]*?)\s*/>").unwrap());

/// Rewrites `<ix:tag .../>` as `<ix:tag ...></ix:tag>`. HTML parsing ignores
/// the trailing slash on non-void elements, which would otherwise leave the
/// element open around all following content.
pub fn expand_self_closing(html: &str) -> Cow<'_, str> {
    SELF_CLOSING_RE.replace_all(html, "<${1}${2}></${1}>")
}

/// Parses a filing document, closing self-closed prefixed elements first.
pub fn parse_filing(html: &str) -> Html {
    Html::parse_document(&expand_self_closing(html))
}

/// Decodes leftover entities, applies NFKC and collapses all whitespace runs
/// (including non-breaking spaces) into single spaces.
pub fn clean_text(raw: &str) -> String {
    let decoded = decode_html_entities(raw);
    let normalized = decoded.nfkc().collect::<String>();
    WHITESPACE_RE
        .replace_all(&normalized, " ")
        .trim()
        .to_string()
}

/// Cleaned text of an element; script and style elements have none.
pub fn element_text(element: ElementRef) -> String {
    if matches!(element.value().name(), "script" | "style") {
        return String::new();
    }
    clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

/// Visible text of a whole document, used for form-type and label detection.
pub fn document_text(document: &Html) -> String {
    element_text(document.root_element())
}

/// Renders a table one row per line with tab-separated cells.
pub fn table_to_text(table: ElementRef) -> String {
    let mut rows = Vec::new();

    for row in table
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "tr")
    {
        let cells: Vec<String> = row
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|e| matches!(e.value().name(), "td" | "th"))
            .map(element_text)
            .collect();

        if cells.iter().any(|c| !c.is_empty()) {
            rows.push(cells.join("\t"));
        }
    }

    rows.join("\n")
}

/// Reduces an HTML fragment (a rendered chart page, a text-block fact) to
/// plain text.
pub fn html_to_text(input: &str) -> String {
    let fragment = Html::parse_fragment(input);
    element_text(fragment.root_element())
}
