use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::charts::{completeness, summarize, ChartStandardizer};
use super::error::ParseError;
use super::facts::FactResolver;
use super::inline::InlineFactExtractor;
use super::lexicon::Lexicon;
use super::section::SectionExtractor;
use super::text::{clean_text, document_text, element_text, parse_filing};
use super::types::{
    Chart, ChartRecord, ChartSummary, Context, Fact, KeyMetrics, Section, SectionType,
    StatementCompleteness, Unit,
};
use super::xbrl::StructuredFactParser;
use crate::core::config::AnalyzerConfig;
use crate::edgar::report::ReportType;

static FILING_DATE_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    const DATE: &str = r"(\d{1,2}/\d{1,2}/\d{4}|\d{4}-\d{2}-\d{2}|[A-Z][a-z]+\s+\d{1,2},\s+\d{4})";
    [
        format!(r"(?i)date\s+of\s+report[^:]{{0,60}}:\s*{}", DATE),
        format!(r"(?i)filing\s+date\s*:?\s*{}", DATE),
        r"\b(\d{1,2}/\d{1,2}/\d{4})\b".to_string(),
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static COMPANY_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:company\s+(?:conformed\s+)?name|registrant)\s*:\s*(.+)$").unwrap()
});

static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());

/// Document-level facts about one HTML filing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilingOverview {
    pub form_type: ReportType,
    pub total_length: usize,
    pub section_count: usize,
    pub has_financial_data: bool,
    pub fact_count: usize,
    pub filing_date: Option<String>,
    pub company_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedFiling {
    pub form_type: ReportType,
    pub sections: Vec<Section>,
    pub facts: Vec<Fact>,
    pub contexts: HashMap<String, Context>,
    pub units: HashMap<String, Unit>,
    pub key_metrics: KeyMetrics,
    pub overview: FilingOverview,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedXbrl {
    pub facts: Vec<Fact>,
    pub contexts: HashMap<String, Context>,
    pub units: HashMap<String, Unit>,
    pub key_metrics: KeyMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartBatch {
    pub charts: Vec<Chart>,
    pub summary: ChartSummary,
    pub completeness: StatementCompleteness,
}

/// Runs every extractor over one document and bundles the results.
pub struct FilingParser<'a> {
    lexicon: &'a Lexicon,
    config: AnalyzerConfig,
}

impl<'a> FilingParser<'a> {
    pub fn new(lexicon: &'a Lexicon, config: AnalyzerConfig) -> Self {
        FilingParser { lexicon, config }
    }

    pub fn parse_html(&self, html: &str) -> ParsedFiling {
        let document = parse_filing(html);

        let sections_extractor = SectionExtractor::new(self.lexicon, &self.config);
        let form_type = sections_extractor.detect_form(&document);
        let sections = sections_extractor.extract_from(&document, form_type);

        let inline = InlineFactExtractor::new(self.lexicon).extract_from(&document);
        let key_metrics = FactResolver::new(self.lexicon).resolve(&inline.facts);

        let overview = FilingOverview {
            form_type,
            total_length: html.chars().count(),
            section_count: sections.len(),
            has_financial_data: sections.iter().any(|s| is_statement(s.section_type)),
            fact_count: inline.facts.len(),
            filing_date: filing_date(&document_text(&document)),
            company_name: company_name(&document, &inline.facts),
        };

        info!(
            "Parsed {} filing: {} sections, {} facts, {} key metrics",
            form_type,
            sections.len(),
            inline.facts.len(),
            key_metrics.len()
        );

        ParsedFiling {
            form_type,
            sections,
            facts: inline.facts,
            contexts: inline.contexts,
            units: inline.units,
            key_metrics,
            overview,
        }
    }

    pub fn parse_xbrl(&self, xml: &str) -> Result<ParsedXbrl, ParseError> {
        let instance = StructuredFactParser::new(self.lexicon).parse(xml)?;
        let key_metrics = FactResolver::new(self.lexicon).resolve(&instance.facts);

        Ok(ParsedXbrl {
            facts: instance.facts,
            contexts: instance.contexts,
            units: instance.units,
            key_metrics,
        })
    }

    pub fn standardize_charts(&self, records: &[ChartRecord]) -> ChartBatch {
        let charts = ChartStandardizer::new(self.lexicon).batch_standardize(records);
        ChartBatch {
            summary: summarize(&charts),
            completeness: completeness(&charts),
            charts,
        }
    }
}

fn is_statement(section_type: SectionType) -> bool {
    matches!(
        section_type,
        SectionType::BalanceSheet
            | SectionType::IncomeStatement
            | SectionType::CashFlowStatement
            | SectionType::StockholdersEquity
            | SectionType::ComprehensiveIncome
    )
}

/// First labelled report or filing date, else the first `M/D/YYYY` date.
fn filing_date(text: &str) -> Option<String> {
    FILING_DATE_RES
        .iter()
        .find_map(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Registrant name from the cover-page fact, a `COMPANY NAME:` style label,
/// or the document title, in that order.
fn company_name(document: &Html, facts: &[Fact]) -> Option<String> {
    let from_fact = facts
        .iter()
        .find(|f| f.concept == "EntityRegistrantName" && !f.raw_value.is_empty())
        .map(|f| f.raw_value.clone());
    if from_fact.is_some() {
        return from_fact;
    }

    let from_label = document
        .tree
        .root()
        .descendants()
        .filter_map(|node| node.value().as_text().map(|t| clean_text(t)))
        .find_map(|text| {
            COMPANY_LABEL_RE
                .captures(&text)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim().to_string())
        });
    if from_label.is_some() {
        return from_label;
    }

    document
        .select(&TITLE_SELECTOR)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
}
