use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use super::fingerprint::content_fingerprint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DataType {
    Monetary,
    Numeric,
    Shares,
    Date,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PeriodType {
    Instant,
    Duration,
}

/// Reporting period of a context, carried over onto every fact that references it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub period_type: PeriodType,
    pub instant_date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Period {
    pub fn instant(date: Option<NaiveDate>) -> Self {
        Period {
            period_type: PeriodType::Instant,
            instant_date: date,
            start_date: None,
            end_date: None,
        }
    }

    pub fn duration(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Period {
            period_type: PeriodType::Duration,
            instant_date: None,
            start_date: start,
            end_date: end,
        }
    }

    /// Builds a period from the raw text of `instant` / `startDate` / `endDate`.
    /// Returns `None` for contexts that carry neither shape (e.g. `forever`).
    pub fn from_parts(instant: Option<&str>, start: Option<&str>, end: Option<&str>) -> Option<Self> {
        match (instant, start, end) {
            (Some(instant), _, _) => Some(Period::instant(parse_date(instant))),
            (None, Some(start), Some(end)) => {
                Some(Period::duration(parse_date(start), parse_date(end)))
            }
            _ => None,
        }
    }
}

/// Parses the `YYYY-MM-DD` prefix of a date or date-time string.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub id: String,
    #[serde(flatten)]
    pub period: Period,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: String,
    pub measure: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub concept: String,
    pub raw_value: String,
    pub context_ref: Option<String>,
    pub unit_ref: Option<String>,
    pub scale: Option<i32>,
    pub decimals: Option<i32>,
    pub format_hint: Option<String>,
    pub data_type: DataType,
    pub is_monetary: bool,
    /// Inline facts display magnitudes; `sign="-"` flips the reported value.
    pub is_negative: bool,
    pub period: Option<Period>,
}

impl Fact {
    pub fn new(concept: String, raw_value: String, data_type: DataType) -> Self {
        Fact {
            concept,
            raw_value,
            context_ref: None,
            unit_ref: None,
            scale: None,
            decimals: None,
            format_hint: None,
            data_type,
            is_monetary: data_type == DataType::Monetary,
            is_negative: false,
            period: None,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SectionType {
    Business,
    RiskFactors,
    LegalProceedings,
    ManagementDiscussion,
    FinancialStatements,
    Controls,
    BalanceSheet,
    IncomeStatement,
    CashFlowStatement,
    StockholdersEquity,
    ComprehensiveIncome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(rename = "type")]
    pub section_type: SectionType,
    pub title: Option<String>,
    pub content: String,
    pub content_fingerprint: Option<String>,
}

impl Section {
    pub fn new(section_type: SectionType, title: Option<String>, content: String) -> Self {
        let content_fingerprint = content_fingerprint(&content);
        Section {
            section_type,
            title,
            content,
            content_fingerprint,
        }
    }
}

/// Canonical statement categories. Declaration order is the classification
/// order and therefore the tie-break order of the content-scoring tier.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StandardType {
    BalanceSheet,
    IncomeStatement,
    CashFlowStatement,
    StockholdersEquity,
    ComprehensiveIncome,
    NotesToFinancialStatements,
    Other,
    Unknown,
}

pub const CORE_STATEMENTS: [StandardType; 4] = [
    StandardType::BalanceSheet,
    StandardType::IncomeStatement,
    StandardType::CashFlowStatement,
    StandardType::StockholdersEquity,
];

impl StandardType {
    /// The types a chart can be matched to, in tie-break order.
    pub fn classifiable() -> impl Iterator<Item = StandardType> {
        StandardType::iter().filter(|t| !matches!(t, StandardType::Other | StandardType::Unknown))
    }

    /// Statement types that are also emitted as sections when found as a table.
    pub fn as_section_type(&self) -> Option<SectionType> {
        match self {
            StandardType::BalanceSheet => Some(SectionType::BalanceSheet),
            StandardType::IncomeStatement => Some(SectionType::IncomeStatement),
            StandardType::CashFlowStatement => Some(SectionType::CashFlowStatement),
            StandardType::StockholdersEquity => Some(SectionType::StockholdersEquity),
            StandardType::ComprehensiveIncome => Some(SectionType::ComprehensiveIncome),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn rank(&self) -> u8 {
        match self {
            Confidence::High => 3,
            Confidence::Medium => 2,
            Confidence::Low => 1,
        }
    }
}

/// One entry of a filing's chart manifest, or an ad hoc table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRecord {
    pub identifier: String,
    pub title: String,
    pub content: Option<String>,
}

impl ChartRecord {
    pub fn new(identifier: impl Into<String>, title: impl Into<String>) -> Self {
        ChartRecord {
            identifier: identifier.into(),
            title: title.into(),
            content: None,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub identifier: String,
    pub original_title: String,
    pub standard_type: StandardType,
    pub confidence: Confidence,
    pub evidence: Vec<String>,
    pub content: String,
    pub content_fingerprint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSummaryEntry {
    pub identifier: String,
    pub original_title: String,
    pub confidence: Confidence,
}

pub type ChartSummary = BTreeMap<StandardType, Vec<ChartSummaryEntry>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatementCompleteness {
    pub balance_sheet: bool,
    pub income_statement: bool,
    pub cash_flow_statement: bool,
    pub stockholders_equity: bool,
}

impl StatementCompleteness {
    pub fn is_complete(&self) -> bool {
        self.balance_sheet && self.income_statement && self.cash_flow_statement && self.stockholders_equity
    }

    pub fn missing(&self) -> Vec<StandardType> {
        CORE_STATEMENTS
            .iter()
            .copied()
            .filter(|t| !self.has(*t))
            .collect()
    }

    pub fn has(&self, standard_type: StandardType) -> bool {
        match standard_type {
            StandardType::BalanceSheet => self.balance_sheet,
            StandardType::IncomeStatement => self.income_statement,
            StandardType::CashFlowStatement => self.cash_flow_statement,
            StandardType::StockholdersEquity => self.stockholders_equity,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyMetric {
    pub canonical_name: String,
    pub value: MetricValue,
    pub source_concept: String,
    pub unit: Option<String>,
    pub context_ref: Option<String>,
    pub scale: Option<i32>,
    pub decimals: Option<i32>,
    pub period: Option<Period>,
}

pub type KeyMetrics = BTreeMap<String, KeyMetric>;
