//! Fixed lookup tables shared by every parser.
//!
//! The tables are built once per process behind [`LEXICON`] and never
//! mutated afterwards, so parser instances borrow them freely across threads.

use once_cell::sync::Lazy;
use regex::Regex;

use super::types::{SectionType, StandardType};
use crate::edgar::report::ReportType;

pub static LEXICON: Lazy<Lexicon> = Lazy::new(Lexicon::build);

/// Canonical metric name and the concept-name fragments that count as it.
#[derive(Debug)]
pub struct MetricAliases {
    pub canonical_name: &'static str,
    pub aliases: &'static [&'static str],
    folded: Vec<String>,
}

impl MetricAliases {
    fn new(canonical_name: &'static str, aliases: &'static [&'static str]) -> Self {
        MetricAliases {
            canonical_name,
            aliases,
            folded: aliases.iter().map(|a| a.to_lowercase()).collect(),
        }
    }

    /// Case-insensitive substring match against a concept name.
    pub fn matches(&self, concept: &str) -> bool {
        let concept = concept.to_lowercase();
        self.folded.iter().any(|alias| concept.contains(alias.as_str()))
    }
}

/// One heading phrase and the regex it compiles to.
#[derive(Debug)]
pub struct SectionPattern {
    pub phrase: &'static str,
    pub regex: Regex,
}

#[derive(Debug)]
pub struct SectionRule {
    pub section_type: SectionType,
    pub patterns: Vec<SectionPattern>,
}

#[derive(Debug)]
pub struct Lexicon {
    pub metric_aliases: Vec<MetricAliases>,
    pub currency_tokens: &'static [&'static str],
    pub share_tokens: &'static [&'static str],
    pub numeric_format_tokens: &'static [&'static str],
    pub date_format_tokens: &'static [&'static str],
    pub taxonomy_markers: &'static [&'static str],
    /// Lower-cased local names that are never facts in a structured document.
    pub structural_elements: &'static [&'static str],
    /// Prefixes whose elements only carry context/unit definitions inline.
    pub inline_envelope_prefixes: &'static [&'static str],
    /// `ix:` wrappers that hold facts or definitions but are not facts themselves.
    pub inline_envelope_elements: &'static [&'static str],
    pub chart_phrases: Vec<(StandardType, &'static [&'static str])>,
    pub supporting_keywords: Vec<(StandardType, &'static [&'static str])>,
    pub heuristic_rules: Vec<(StandardType, &'static [&'static str])>,
    pub header_markers: Vec<Regex>,
    pub form_patterns: Vec<Regex>,
    section_taxonomies: Vec<(ReportType, Vec<SectionRule>)>,
}

const METRIC_ALIASES: &[(&str, &[&str])] = &[
    (
        "revenue",
        &[
            "Revenues",
            "Revenue",
            "SalesRevenueNet",
            "RevenueFromContractWithCustomerExcludingAssessedTax",
        ],
    ),
    ("net_income", &["NetIncome", "NetIncomeLoss", "ProfitLoss"]),
    ("total_assets", &["Assets", "AssetsCurrent", "AssetsNoncurrent"]),
    (
        "cash",
        &[
            "Cash",
            "CashAndCashEquivalents",
            "CashAndCashEquivalentsAtCarryingValue",
        ],
    ),
    ("stockholders_equity", &["StockholdersEquity", "ShareholdersEquity"]),
    (
        "total_liabilities",
        &["Liabilities", "LiabilitiesAndStockholdersEquity"],
    ),
];

const CHART_PHRASES: &[(StandardType, &[&str])] = &[
    (
        StandardType::BalanceSheet,
        &[
            "balance sheet",
            "consolidated balance sheet",
            "statement of financial position",
            "consolidated statement of financial position",
            "assets and liabilities",
            "assets, liabilities and stockholders",
            "financial position",
        ],
    ),
    (
        StandardType::IncomeStatement,
        &[
            "income statement",
            "consolidated income statement",
            "statement of operations",
            "statements of operations",
            "consolidated statement of operations",
            "statement of income",
            "statements of income",
            "earnings",
            "consolidated earnings",
            "statement of comprehensive income",
            "operations and comprehensive income",
            "profit and loss",
        ],
    ),
    (
        StandardType::CashFlowStatement,
        &[
            "cash flow",
            "consolidated cash flow",
            "statement of cash flows",
            "consolidated statement of cash flows",
            "cash flows",
        ],
    ),
    (
        StandardType::StockholdersEquity,
        &[
            "stockholders equity",
            "shareholders equity",
            "statement of equity",
            "statement of stockholders equity",
            "consolidated statement of stockholders equity",
            "changes in stockholders equity",
            "stockholders investment",
        ],
    ),
    (
        StandardType::ComprehensiveIncome,
        &[
            "comprehensive income",
            "consolidated comprehensive income",
            "other comprehensive income",
            "comprehensive loss",
        ],
    ),
    (
        StandardType::NotesToFinancialStatements,
        &[
            "notes to consolidated financial statements",
            "notes to financial statements",
            "financial statement notes",
            "notes",
        ],
    ),
];

const SUPPORTING_KEYWORDS: &[(StandardType, &[&str])] = &[
    (
        StandardType::BalanceSheet,
        &[
            "assets",
            "liabilities",
            "equity",
            "current assets",
            "property plant equipment",
        ],
    ),
    (
        StandardType::IncomeStatement,
        &[
            "revenue",
            "cost of sales",
            "gross profit",
            "net income",
            "operating expenses",
        ],
    ),
    (
        StandardType::CashFlowStatement,
        &[
            "operating activities",
            "investing activities",
            "financing activities",
            "net cash",
        ],
    ),
    (
        StandardType::StockholdersEquity,
        &[
            "common stock",
            "retained earnings",
            "accumulated other comprehensive",
            "stockholders",
            "shareholders",
        ],
    ),
    (
        StandardType::ComprehensiveIncome,
        &[
            "foreign currency translation",
            "unrealized gains",
            "pension adjustments",
        ],
    ),
];

const HEURISTIC_RULES: &[(StandardType, &[&str])] = &[
    (StandardType::BalanceSheet, &["balance", "assets", "liabilities"]),
    (
        StandardType::IncomeStatement,
        &["income", "operations", "earnings", "revenue"],
    ),
    (StandardType::CashFlowStatement, &["cash", "flows"]),
    (
        StandardType::StockholdersEquity,
        &["equity", "stockholders", "shareholders"],
    ),
    (StandardType::ComprehensiveIncome, &["comprehensive"]),
    (
        StandardType::NotesToFinancialStatements,
        &["notes", "footnotes"],
    ),
];

const FORM_10K_SECTIONS: &[(SectionType, &[&str])] = &[
    (SectionType::Business, &["Item 1", "Business"]),
    (SectionType::RiskFactors, &["Item 1A", "Risk Factors"]),
    (SectionType::LegalProceedings, &["Item 3", "Legal Proceedings"]),
    (
        SectionType::ManagementDiscussion,
        &["Item 7", "Management's Discussion and Analysis", "MD&A"],
    ),
    (SectionType::FinancialStatements, &["Item 8", "Financial Statements"]),
    (SectionType::Controls, &["Item 9A", "Controls and Procedures"]),
];

const FORM_10Q_SECTIONS: &[(SectionType, &[&str])] = &[
    (
        SectionType::FinancialStatements,
        &["Part I", "Financial Information"],
    ),
    (
        SectionType::ManagementDiscussion,
        &["Item 2", "Management's Discussion"],
    ),
    (SectionType::RiskFactors, &["Item 1A", "Risk Factors"]),
    (SectionType::Controls, &["Item 4", "Controls and Procedures"]),
    (SectionType::LegalProceedings, &["Item 1", "Legal Proceedings"]),
];

const HEADER_MARKERS: &[&str] = &[
    r"(?i)^(PART|ITEM)\s+[IVX\d]+",
    r"(?i)^Table of Contents",
    // All-caps line ending in a period; deliberately case-sensitive.
    r"^[A-Z\s]+\s*\.\s*$",
    r"^\d+\.\s+[A-Z]",
];

const FORM_PATTERNS: &[&str] = &[
    r"(?i)\bFORM\s+(10-?K|10-?Q|8-?K)\b",
    r"(?i)\b(10-?K|10-?Q|8-?K)\s+(?:ANNUAL|QUARTERLY|CURRENT)\s+REPORT",
];

impl Lexicon {
    pub fn global() -> &'static Lexicon {
        &LEXICON
    }

    fn build() -> Lexicon {
        let section_taxonomies = vec![
            (ReportType::Form10K, compile_sections(FORM_10K_SECTIONS)),
            (ReportType::Form10Q, compile_sections(FORM_10Q_SECTIONS)),
        ];

        Lexicon {
            metric_aliases: METRIC_ALIASES
                .iter()
                .map(|&(name, aliases)| MetricAliases::new(name, aliases))
                .collect(),
            currency_tokens: &["usd", "dollar", "iso4217", "eur", "gbp", "jpy"],
            share_tokens: &["share"],
            numeric_format_tokens: &["num", "decimal"],
            date_format_tokens: &["date"],
            taxonomy_markers: &["us-gaap", "dei", "ifrs"],
            structural_elements: &[
                "context",
                "unit",
                "schemaref",
                "linkbaseref",
                "roleref",
                "arcroleref",
                "footnotelink",
            ],
            inline_envelope_prefixes: &["xbrli", "link", "xbrldi"],
            inline_envelope_elements: &[
                "header",
                "hidden",
                "references",
                "resources",
                "continuation",
                "exclude",
                "footnote",
                "relationship",
            ],
            chart_phrases: CHART_PHRASES.to_vec(),
            supporting_keywords: SUPPORTING_KEYWORDS.to_vec(),
            heuristic_rules: HEURISTIC_RULES.to_vec(),
            header_markers: HEADER_MARKERS.iter().map(|p| compile(p)).collect(),
            form_patterns: FORM_PATTERNS.iter().map(|p| compile(p)).collect(),
            section_taxonomies,
        }
    }

    /// Ordered section rules for a form; 8-K filings use the 10-K taxonomy.
    pub fn section_taxonomy(&self, form: ReportType) -> &[SectionRule] {
        let form = match form {
            ReportType::Form8K => ReportType::Form10K,
            other => other,
        };
        self.section_taxonomies
            .iter()
            .find(|(f, _)| *f == form)
            .map(|(_, rules)| rules.as_slice())
            .unwrap_or(&[])
    }

    pub fn phrases_for(&self, standard_type: StandardType) -> &'static [&'static str] {
        lookup(&self.chart_phrases, standard_type)
    }

    pub fn keywords_for(&self, standard_type: StandardType) -> &'static [&'static str] {
        lookup(&self.supporting_keywords, standard_type)
    }

    pub fn is_header_text(&self, text: &str) -> bool {
        self.header_markers.iter().any(|re| re.is_match(text))
    }
}

fn lookup(
    table: &[(StandardType, &'static [&'static str])],
    standard_type: StandardType,
) -> &'static [&'static str] {
    table
        .iter()
        .find(|(t, _)| *t == standard_type)
        .map(|(_, words)| *words)
        .unwrap_or(&[])
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid built-in pattern {}: {}", pattern, e))
}

fn compile_sections(table: &[(SectionType, &'static [&'static str])]) -> Vec<SectionRule> {
    table
        .iter()
        .map(|(section_type, phrases)| SectionRule {
            section_type: *section_type,
            patterns: phrases
                .iter()
                .map(|&phrase| SectionPattern {
                    phrase,
                    regex: compile(&phrase_pattern(phrase)),
                })
                .collect(),
        })
        .collect()
}

/// Turns a heading phrase into a case-insensitive regex: words may be
/// separated by any whitespace, apostrophes are optional (straight or curly),
/// and word-character ends are anchored on word boundaries so `Item 1`
/// never matches inside `Item 1A`.
pub fn phrase_pattern(phrase: &str) -> String {
    let is_word = |c: Option<char>| c.map_or(false, |c| c.is_alphanumeric() || c == '_');

    let mut pattern = String::from("(?i)");
    if is_word(phrase.chars().next()) {
        pattern.push_str(r"\b");
    }
    for (i, word) in phrase.split_whitespace().enumerate() {
        if i > 0 {
            pattern.push_str(r"\s+");
        }
        pattern.push_str(&regex::escape(word).replace('\'', "['\u{2019}]?"));
    }
    if is_word(phrase.chars().last()) {
        pattern.push_str(r"\b");
    }
    pattern
}
