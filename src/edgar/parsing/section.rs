use log::{debug, info};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;

use super::charts::ChartStandardizer;
use super::lexicon::{Lexicon, SectionPattern};
use super::text::{clean_text, document_text, element_text, parse_filing, table_to_text};
use super::types::{Confidence, Section, SectionType};
use crate::core::config::AnalyzerConfig;
use crate::edgar::report::ReportType;

/// Longest heading or caption text kept as a section title.
const MAX_TITLE_CHARS: usize = 120;

/// Locates narrative sections by their headings and bounds each one at the
/// next major header.
pub struct SectionExtractor<'a> {
    lexicon: &'a Lexicon,
    min_section_chars: usize,
    default_form: ReportType,
}

/// A text node that can start a section: its cleaned text and the element
/// that holds it.
struct TextHit<'d> {
    text: String,
    element: ElementRef<'d>,
}

impl<'a> SectionExtractor<'a> {
    pub fn new(lexicon: &'a Lexicon, config: &AnalyzerConfig) -> Self {
        SectionExtractor {
            lexicon,
            min_section_chars: config.min_section_chars,
            default_form: config.default_form,
        }
    }

    pub fn detect_form(&self, document: &Html) -> ReportType {
        let text = document_text(document);
        ReportType::detect(&text, self.lexicon, self.default_form)
    }

    /// Detects the form type, then extracts narrative and table sections.
    pub fn extract(&self, html: &str) -> Vec<Section> {
        let document = parse_filing(html);
        let form = self.detect_form(&document);
        self.extract_from(&document, form)
    }

    pub fn extract_from(&self, document: &Html, form: ReportType) -> Vec<Section> {
        let mut sections = self.narrative_sections(document, form);
        let standardizer = ChartStandardizer::new(self.lexicon);
        sections.extend(self.financial_tables(document, &standardizer));

        info!("Extracted {} sections from {} filing", sections.len(), form);
        sections
    }

    /// One section per taxonomy entry at most, in taxonomy order.
    pub fn narrative_sections(&self, document: &Html, form: ReportType) -> Vec<Section> {
        let hits = text_hits(document);
        let mut sections = Vec::new();

        for rule in self.lexicon.section_taxonomy(form) {
            match rule
                .patterns
                .iter()
                .find_map(|pattern| self.first_accepted(&hits, pattern))
            {
                Some((title, content)) => {
                    debug!(
                        "Section {} bounded at '{}' ({} chars)",
                        rule.section_type,
                        title,
                        content.chars().count()
                    );
                    sections.push(Section::new(rule.section_type, Some(title), content));
                }
                None => debug!("No {} section found", rule.section_type),
            }
        }

        sections
    }

    /// Tries every match of `pattern` in document order; short bodies (table
    /// of contents rows, cross references) are passed over.
    fn first_accepted(&self, hits: &[TextHit], pattern: &SectionPattern) -> Option<(String, String)> {
        for hit in hits.iter().filter(|h| pattern.regex.is_match(&h.text)) {
            let start = anchor(hit.element);
            let content = self.collect_body(start);
            if content.chars().count() > self.min_section_chars {
                let title = Some(element_text(start))
                    .filter(|t| !t.is_empty() && t.chars().count() <= MAX_TITLE_CHARS)
                    .unwrap_or_else(|| hit.text.clone());
                return Some((title, content));
            }
            debug!(
                "Match of '{}' at '{}' too short, trying next",
                pattern.phrase, hit.text
            );
        }
        None
    }

    /// Concatenates the text of the following element siblings up to the
    /// next major header.
    fn collect_body(&self, start: ElementRef) -> String {
        let mut parts = Vec::new();

        for sibling in start.next_siblings().filter_map(ElementRef::wrap) {
            let text = if sibling.value().name() == "table" {
                table_to_text(sibling)
            } else {
                element_text(sibling)
            };
            if self.is_major_header(sibling, &text) {
                break;
            }
            if !text.is_empty() {
                parts.push(text);
            }
        }

        parts.join("\n")
    }

    fn is_major_header(&self, element: ElementRef, text: &str) -> bool {
        matches!(
            element.value().name(),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
        ) || self.lexicon.is_header_text(text)
    }

    /// Financial statement tables, at most one per statement type. The
    /// highest-confidence table wins; ties keep the earliest.
    pub fn financial_tables(&self, document: &Html, standardizer: &ChartStandardizer) -> Vec<Section> {
        let mut best: BTreeMap<SectionType, (Confidence, Section)> = BTreeMap::new();

        for table in document.select(&TABLE_SELECTOR) {
            let content = table_to_text(table);
            if content.chars().count() <= self.min_section_chars {
                continue;
            }

            let Some(found) = standardizer.score_content(&content) else {
                continue;
            };
            if found.confidence == Confidence::Low {
                continue;
            }
            let Some(section_type) = found.standard_type.as_section_type() else {
                continue;
            };

            if let Some((held, _)) = best.get(&section_type) {
                if held.rank() >= found.confidence.rank() {
                    continue;
                }
            }

            debug!(
                "Table classified as {} ({}, score {})",
                section_type, found.confidence, found.score
            );
            let section = Section::new(section_type, caption(table), content);
            best.insert(section_type, (found.confidence, section));
        }

        best.into_values().map(|(_, section)| section).collect()
    }
}

static TABLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("table").unwrap());

/// Text nodes in document order, outside of scripts, styles and the title.
fn text_hits(document: &Html) -> Vec<TextHit<'_>> {
    document
        .tree
        .root()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let element = node.parent().and_then(ElementRef::wrap)?;
            if matches!(element.value().name(), "script" | "style" | "title") {
                return None;
            }
            let text = clean_text(text);
            (!text.is_empty()).then_some(TextHit { text, element })
        })
        .collect()
}

/// Climbs from the matched element until an ancestor has a following element
/// sibling, so that inline wrappers such as `<b>Item 7.</b>` resolve to their
/// block. Stops below `body`.
fn anchor(element: ElementRef) -> ElementRef {
    let mut current = element;
    loop {
        if current.next_siblings().any(|n| n.value().is_element()) {
            return current;
        }
        match current.parent().and_then(ElementRef::wrap) {
            Some(parent) if !matches!(parent.value().name(), "body" | "html") => current = parent,
            _ => return current,
        }
    }
}

/// Short text of the element just before a table, e.g. `CONSOLIDATED BALANCE SHEETS`.
fn caption(table: ElementRef) -> Option<String> {
    table
        .prev_siblings()
        .filter_map(ElementRef::wrap)
        .map(element_text)
        .find(|text| !text.is_empty())
        .filter(|text| text.chars().count() <= MAX_TITLE_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILLER: &str = "The Company faces competition, regulation and supply risks that could adversely affect results of operations.";

    fn risk_document(body: &str) -> String {
        format!(
            r#"<html><body>
<h2>Item 1A. Risk Factors</h2>
<p>{}</p>
<h2>Item 1. Business</h2>
<p>We design widgets.</p>
</body></html>"#,
            body
        )
    }

    fn extractor() -> SectionExtractor<'static> {
        SectionExtractor::new(Lexicon::global(), &AnalyzerConfig::default())
    }

    fn text_of_len(len: usize) -> String {
        FILLER.chars().cycle().take(len).collect::<String>()
    }

    #[test]
    fn test_section_bounded_by_next_item() {
        let html = risk_document(&text_of_len(150));
        let document = Html::parse_document(&html);
        let sections = extractor().narrative_sections(&document, ReportType::Form10K);

        let risk: Vec<_> = sections
            .iter()
            .filter(|s| s.section_type == SectionType::RiskFactors)
            .collect();
        assert_eq!(risk.len(), 1);
        assert_eq!(risk[0].content.chars().count(), 150);
        assert!(!risk[0].content.contains("widgets"));
        assert_eq!(risk[0].title.as_deref(), Some("Item 1A. Risk Factors"));
        assert!(risk[0].content_fingerprint.is_some());
    }

    #[test]
    fn test_short_section_rejected() {
        let html = risk_document(&text_of_len(60));
        let document = Html::parse_document(&html);
        let sections = extractor().narrative_sections(&document, ReportType::Form10K);
        assert!(sections
            .iter()
            .all(|s| s.section_type != SectionType::RiskFactors));
    }

    #[test]
    fn test_toc_match_skipped() {
        let html = format!(
            r#"<html><body>
<table>
  <tr><td>Item 7.</td><td>Management's Discussion and Analysis</td><td>12</td></tr>
  <tr><td>Item 8.</td><td>Financial Statements</td><td>20</td></tr>
</table>
<h2><b>Item 7.</b> Management&#8217;s Discussion and Analysis</h2>
<div>{}</div>
<div>{}</div>
<h2>Item 8. Financial Statements</h2>
</body></html>"#,
            text_of_len(80),
            text_of_len(80)
        );
        let document = Html::parse_document(&html);
        let sections = extractor().narrative_sections(&document, ReportType::Form10K);

        let mdna = sections
            .iter()
            .find(|s| s.section_type == SectionType::ManagementDiscussion)
            .unwrap();
        assert_eq!(mdna.content.lines().count(), 2);
        assert_eq!(
            mdna.title.as_deref(),
            Some("Item 7. Management\u{2019}s Discussion and Analysis")
        );
    }

    #[test]
    fn test_all_caps_line_stops_section() {
        let html = format!(
            r#"<html><body>
<p><b>Item 3. Legal Proceedings</b></p>
<p>{}</p>
<p>SIGNATURES.</p>
<p>Pursuant to the requirements of the Securities Exchange Act.</p>
</body></html>"#,
            text_of_len(120)
        );
        let document = Html::parse_document(&html);
        let sections = extractor().narrative_sections(&document, ReportType::Form10K);
        let legal = sections
            .iter()
            .find(|s| s.section_type == SectionType::LegalProceedings)
            .unwrap();
        assert!(!legal.content.contains("Pursuant"));
    }

    #[test]
    fn test_balance_sheet_table_becomes_section() {
        let html = r#"<html><body>
<p>CONSOLIDATED BALANCE SHEETS</p>
<table>
  <tr><td>Total current assets</td><td>400</td></tr>
  <tr><td>Total assets</td><td>2,500</td></tr>
  <tr><td>Total current liabilities</td><td>300</td></tr>
  <tr><td>Total liabilities</td><td>1,100</td></tr>
  <tr><td>Total equity</td><td>1,400</td></tr>
</table>
<table><tr><td>Exhibit</td><td>Description</td></tr></table>
</body></html>"#;
        let document = Html::parse_document(html);
        let standardizer = ChartStandardizer::new(Lexicon::global());
        let sections = extractor().financial_tables(&document, &standardizer);

        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].section_type, SectionType::BalanceSheet);
        assert_eq!(sections[0].title.as_deref(), Some("CONSOLIDATED BALANCE SHEETS"));
        assert!(sections[0].content.starts_with("Total current assets\t400\n"));
    }

    #[test]
    fn test_extract_detects_form() {
        let html = format!(
            r#"<html><body><p>FORM 10-Q</p>
<h2>Item 2. Management's Discussion and Analysis</h2><p>{}</p><h2>Item 3.</h2>
</body></html>"#,
            text_of_len(200)
        );
        let sections = extractor().extract(&html);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].section_type, SectionType::ManagementDiscussion);
    }
}
