use std::fs;
use std::path::PathBuf;

use super::document::FilingParser;
use super::lexicon::Lexicon;
use super::manifest::parse_manifest;
use super::types::{Confidence, DataType, MetricValue, PeriodType, SectionType, StandardType};
use crate::core::config::AnalyzerConfig;
use crate::edgar::report::ReportType;

pub fn get_test_file_path(filename: &str) -> PathBuf {
    PathBuf::from("src/edgar/parsing/tests/data").join(filename)
}

pub fn read_test_file(filename: &str) -> String {
    fs::read_to_string(get_test_file_path(filename))
        .unwrap_or_else(|e| panic!("Failed to read test file {}: {}", filename, e))
}

fn parser() -> FilingParser<'static> {
    FilingParser::new(Lexicon::global(), AnalyzerConfig::default())
}

#[test]
fn test_sample_10k_sections() {
    let parsed = parser().parse_html(&read_test_file("sample_10k.htm"));

    assert_eq!(parsed.form_type, ReportType::Form10K);

    let types: Vec<SectionType> = parsed.sections.iter().map(|s| s.section_type).collect();
    assert_eq!(
        types,
        vec![
            SectionType::Business,
            SectionType::RiskFactors,
            SectionType::ManagementDiscussion,
            SectionType::FinancialStatements,
            SectionType::Controls,
            SectionType::BalanceSheet,
        ]
    );

    // Every emitted section clears the length floor and carries a fingerprint.
    for section in &parsed.sections {
        assert!(section.content.chars().count() > 100, "{:?}", section.section_type);
        assert!(section.content_fingerprint.is_some());
    }

    let business = &parsed.sections[0];
    assert_eq!(business.title.as_deref(), Some("Item 1. Business"));
    assert!(business.content.starts_with("Acme Widgets Corp designs"));
    assert!(!business.content.contains("Risk Factors"));

    let mdna = &parsed.sections[2];
    assert!(mdna.content.contains("Revenues were $ 1,234 thousand"));
    assert!(!mdna.content.contains("Item 8"));

    let statements = &parsed.sections[3];
    assert!(statements.content.contains("CONSOLIDATED BALANCE SHEETS"));
    assert!(statements.content.contains("Total assets\t2,500"));
}

#[test]
fn test_sample_10k_balance_sheet_table() {
    let parsed = parser().parse_html(&read_test_file("sample_10k.htm"));

    let balance = parsed
        .sections
        .iter()
        .find(|s| s.section_type == SectionType::BalanceSheet)
        .unwrap();
    assert_eq!(balance.title.as_deref(), Some("CONSOLIDATED BALANCE SHEETS"));
    assert!(balance.content.starts_with("\tDecember 31, 2023\n"));
    assert!(balance.content.contains("Total liabilities\t1,100"));
}

#[test]
fn test_sample_10k_inline_facts() {
    let parsed = parser().parse_html(&read_test_file("sample_10k.htm"));

    assert_eq!(parsed.facts.len(), 9);
    assert_eq!(parsed.contexts.len(), 2);
    assert_eq!(parsed.units.len(), 2);

    let shares = parsed
        .facts
        .iter()
        .find(|f| f.concept == "CommonStockSharesOutstanding")
        .unwrap();
    assert_eq!(shares.data_type, DataType::Shares);
    assert_eq!(shares.decimals, None);
    assert!(!shares.is_monetary);

    let name = &parsed.facts[0];
    assert_eq!(name.concept, "EntityRegistrantName");
    assert_eq!(name.data_type, DataType::Text);
    assert_eq!(name.period.as_ref().unwrap().period_type, PeriodType::Duration);
}

#[test]
fn test_sample_10k_key_metrics() {
    let parsed = parser().parse_html(&read_test_file("sample_10k.htm"));
    let metrics = &parsed.key_metrics;

    assert_eq!(metrics.len(), 6);
    assert_eq!(metrics["revenue"].value, MetricValue::Number(1_234_000.0));
    assert_eq!(metrics["net_income"].value, MetricValue::Number(210_000.0));
    assert_eq!(metrics["total_assets"].value, MetricValue::Number(2_500_000_000.0));
    assert_eq!(metrics["cash"].source_concept, "CashAndCashEquivalentsAtCarryingValue");
    assert_eq!(metrics["stockholders_equity"].value, MetricValue::Number(1_400_000_000.0));
    assert_eq!(metrics["total_liabilities"].unit.as_deref(), Some("usd"));
}

#[test]
fn test_sample_10k_overview() {
    let parsed = parser().parse_html(&read_test_file("sample_10k.htm"));
    let overview = &parsed.overview;

    assert_eq!(overview.form_type, ReportType::Form10K);
    assert_eq!(overview.section_count, 6);
    assert!(overview.has_financial_data);
    assert_eq!(overview.fact_count, 9);
    assert_eq!(overview.filing_date.as_deref(), Some("February 15, 2024"));
    assert_eq!(overview.company_name.as_deref(), Some("Acme Widgets Corp"));
}

#[test]
fn test_sample_instance() {
    let parsed = parser()
        .parse_xbrl(&read_test_file("sample_instance.xml"))
        .unwrap();

    assert_eq!(parsed.facts.len(), 8);
    assert_eq!(parsed.units["USDPerShare"].measure, "iso4217:USD/xbrli:shares");

    let eps = parsed
        .facts
        .iter()
        .find(|f| f.concept == "EarningsPerShareBasic")
        .unwrap();
    assert!(eps.is_monetary);
    assert_eq!(eps.decimals, Some(2));

    let equity = parsed
        .facts
        .iter()
        .find(|f| f.concept == "StockholdersEquity")
        .unwrap();
    assert_eq!(equity.context_ref.as_deref(), Some("Missing"));
    assert!(equity.period.is_none());

    let metrics = &parsed.key_metrics;
    assert_eq!(metrics.len(), 5);
    assert!(!metrics.contains_key("cash"));
    assert_eq!(
        metrics["revenue"].source_concept,
        "RevenueFromContractWithCustomerExcludingAssessedTax"
    );
    assert_eq!(metrics["revenue"].value, MetricValue::Number(1_234_000.0));
    assert!(metrics["stockholders_equity"].period.is_none());
}

#[test]
fn test_filing_summary_charts() {
    let entries = parse_manifest(&read_test_file("FilingSummary.xml")).unwrap();
    let identifiers: Vec<&str> = entries.iter().map(|e| e.identifier.as_str()).collect();
    assert_eq!(identifiers, vec!["R1", "R2", "R3", "R4", "R5", "R6"]);

    let records: Vec<_> = entries.iter().map(|e| e.to_chart_record()).collect();
    let batch = parser().standardize_charts(&records);

    let types: Vec<StandardType> = batch.charts.iter().map(|c| c.standard_type).collect();
    assert_eq!(
        types,
        vec![
            StandardType::Unknown,
            StandardType::BalanceSheet,
            StandardType::IncomeStatement,
            StandardType::CashFlowStatement,
            StandardType::StockholdersEquity,
            StandardType::Unknown,
        ]
    );
    assert!(batch.charts[1..5].iter().all(|c| c.confidence == Confidence::High));
    assert!(batch.completeness.is_complete());
    assert_eq!(batch.summary[&StandardType::Unknown].len(), 2);
}
