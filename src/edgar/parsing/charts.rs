use log::{debug, info};
use std::collections::BTreeMap;

use super::fingerprint::content_fingerprint;
use super::lexicon::Lexicon;
use super::text::clean_text;
use super::types::{
    Chart, ChartRecord, ChartSummary, ChartSummaryEntry, Confidence, StandardType,
    StatementCompleteness,
};

/// Best content score for a piece of table text.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentMatch {
    pub standard_type: StandardType,
    pub confidence: Confidence,
    pub evidence: Vec<String>,
    pub score: usize,
}

/// Collapses whitespace (non-breaking spaces included), lower-cases and drops
/// apostrophes so that `Stockholders'\u{a0}Equity` and `stockholders equity`
/// compare equal.
fn normalize(text: &str) -> String {
    clean_text(text)
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '\'' | '\u{2019}'))
        .collect()
}

/// Maps company-specific statement titles onto [`StandardType`].
///
/// Tiers run in order and the first that matches wins:
/// 1. a canonical phrase in the title (high),
/// 2. phrase and keyword counts in the content (high or medium),
/// 3. a single keyword in the title (low),
/// 4. `unknown` (low, no evidence).
pub struct ChartStandardizer<'a> {
    lexicon: &'a Lexicon,
}

impl<'a> ChartStandardizer<'a> {
    pub fn new(lexicon: &'a Lexicon) -> Self {
        ChartStandardizer { lexicon }
    }

    pub fn standardize(&self, record: &ChartRecord) -> Chart {
        self.standardize_chart(&record.identifier, &record.title, record.content.as_deref())
    }

    pub fn standardize_chart(&self, identifier: &str, title: &str, content: Option<&str>) -> Chart {
        let (standard_type, confidence, evidence) = self.classify(title, content);

        debug!(
            "Chart {} '{}' -> {} ({})",
            identifier, title, standard_type, confidence
        );

        let content = content.unwrap_or_default().to_string();
        Chart {
            identifier: identifier.to_string(),
            original_title: title.to_string(),
            standard_type,
            confidence,
            evidence,
            content_fingerprint: content_fingerprint(&content),
            content,
        }
    }

    pub fn batch_standardize(&self, records: &[ChartRecord]) -> Vec<Chart> {
        let charts: Vec<Chart> = records.iter().map(|r| self.standardize(r)).collect();
        info!(
            "Standardized {} charts, {} unknown",
            charts.len(),
            charts
                .iter()
                .filter(|c| c.standard_type == StandardType::Unknown)
                .count()
        );
        charts
    }

    fn classify(&self, title: &str, content: Option<&str>) -> (StandardType, Confidence, Vec<String>) {
        let title = normalize(title);

        if let Some((standard_type, phrase)) = self.match_title_phrase(&title) {
            return (standard_type, Confidence::High, vec![phrase.to_string()]);
        }

        if let Some(found) = content
            .filter(|c| !c.trim().is_empty())
            .and_then(|c| self.score_content(c))
        {
            return (found.standard_type, found.confidence, found.evidence);
        }

        if let Some((standard_type, keyword)) = self.match_title_keyword(&title) {
            return (standard_type, Confidence::Low, vec![keyword.to_string()]);
        }

        (StandardType::Unknown, Confidence::Low, Vec::new())
    }

    fn match_title_phrase(&self, title: &str) -> Option<(StandardType, &'static str)> {
        self.lexicon.chart_phrases.iter().find_map(|(standard_type, phrases)| {
            phrases
                .iter()
                .find(|p| title.contains(*p))
                .map(|p| (*standard_type, *p))
        })
    }

    fn match_title_keyword(&self, title: &str) -> Option<(StandardType, &'static str)> {
        self.lexicon.heuristic_rules.iter().find_map(|(standard_type, keywords)| {
            keywords
                .iter()
                .find(|k| title.contains(*k))
                .map(|k| (*standard_type, *k))
        })
    }

    /// Scores content against every classifiable type: three points per
    /// canonical phrase occurrence, one per supporting keyword occurrence.
    /// The strictly highest positive score wins; ties keep the type that
    /// comes first in [`StandardType::classifiable`] order.
    pub fn score_content(&self, content: &str) -> Option<ContentMatch> {
        let content = normalize(content);
        let mut best: Option<ContentMatch> = None;

        for standard_type in StandardType::classifiable() {
            let mut evidence = Vec::new();

            let phrase_hits = count_hits(&content, self.lexicon.phrases_for(standard_type), &mut evidence);
            let keyword_hits = count_hits(&content, self.lexicon.keywords_for(standard_type), &mut evidence);
            let score = 3 * phrase_hits + keyword_hits;

            if score == 0 || best.as_ref().map_or(false, |b| score <= b.score) {
                continue;
            }

            best = Some(ContentMatch {
                standard_type,
                confidence: if phrase_hits > 0 {
                    Confidence::High
                } else {
                    Confidence::Medium
                },
                evidence,
                score,
            });
        }

        best
    }
}

/// Total occurrences of `terms` in `content`; each matched term is recorded once.
fn count_hits(content: &str, terms: &[&str], evidence: &mut Vec<String>) -> usize {
    terms
        .iter()
        .map(|term| {
            let hits = content.matches(term).count();
            if hits > 0 {
                evidence.push(term.to_string());
            }
            hits
        })
        .sum()
}

/// Groups charts by standard type, keeping identifier, title and confidence.
pub fn summarize(charts: &[Chart]) -> ChartSummary {
    let mut summary: ChartSummary = BTreeMap::new();
    for chart in charts {
        summary
            .entry(chart.standard_type)
            .or_default()
            .push(ChartSummaryEntry {
                identifier: chart.identifier.clone(),
                original_title: chart.original_title.clone(),
                confidence: chart.confidence,
            });
    }
    summary
}

/// Which of the four core statements the batch contains.
pub fn completeness(charts: &[Chart]) -> StatementCompleteness {
    let has = |t: StandardType| charts.iter().any(|c| c.standard_type == t);
    StatementCompleteness {
        balance_sheet: has(StandardType::BalanceSheet),
        income_statement: has(StandardType::IncomeStatement),
        cash_flow_statement: has(StandardType::CashFlowStatement),
        stockholders_equity: has(StandardType::StockholdersEquity),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standardizer() -> ChartStandardizer<'static> {
        ChartStandardizer::new(Lexicon::global())
    }

    #[test]
    fn test_title_phrase_is_high_confidence() {
        let chart = standardizer().standardize_chart("R2", "CONSOLIDATED BALANCE SHEETS", None);
        assert_eq!(chart.standard_type, StandardType::BalanceSheet);
        assert_eq!(chart.confidence, Confidence::High);
        assert!(chart.evidence.contains(&"balance sheet".to_string()));
        assert_eq!(chart.content_fingerprint, None);
    }

    #[test]
    fn test_title_whitespace_is_collapsed() {
        let chart = standardizer().standardize_chart("R2", "CONSOLIDATED  BALANCE\u{a0}SHEETS", None);
        assert_eq!(chart.standard_type, StandardType::BalanceSheet);
        assert_eq!(chart.confidence, Confidence::High);
        assert_eq!(chart.evidence, vec!["balance sheet".to_string()]);
    }

    #[test]
    fn test_apostrophes_ignored_in_titles() {
        let chart = standardizer().standardize_chart(
            "R5",
            "Consolidated Statements of Stockholders\u{2019} Equity",
            None,
        );
        assert_eq!(chart.standard_type, StandardType::StockholdersEquity);
        assert_eq!(chart.confidence, Confidence::High);
    }

    #[test]
    fn test_content_keywords_give_medium_confidence() {
        let chart = standardizer().standardize_chart("R7", "Report 7", Some("assets assets liabilities"));
        assert_eq!(chart.standard_type, StandardType::BalanceSheet);
        assert_eq!(chart.confidence, Confidence::Medium);
        assert_eq!(chart.evidence, vec!["assets", "liabilities"]);
        assert!(chart.content_fingerprint.is_some());
    }

    #[test]
    fn test_content_phrase_gives_high_confidence() {
        let found = standardizer()
            .score_content("Net cash provided by operating activities. Statement of cash flows")
            .unwrap();
        assert_eq!(found.standard_type, StandardType::CashFlowStatement);
        assert_eq!(found.confidence, Confidence::High);
        assert_eq!(found.evidence[0], "cash flow");
    }

    #[test]
    fn test_content_ties_keep_declaration_order() {
        // One balance sheet keyword and one income statement keyword.
        let found = standardizer().score_content("assets revenue").unwrap();
        assert_eq!(found.score, 1);
        assert_eq!(found.standard_type, StandardType::BalanceSheet);
    }

    #[test]
    fn test_heuristic_title_keyword_is_low() {
        let chart = standardizer().standardize_chart("R9", "Revenue Details", None);
        assert_eq!(chart.standard_type, StandardType::IncomeStatement);
        assert_eq!(chart.confidence, Confidence::Low);
        assert_eq!(chart.evidence, vec!["revenue"]);
    }

    #[test]
    fn test_default_is_unknown() {
        let chart = standardizer().standardize_chart("R1", "Cover Page", Some("   "));
        assert_eq!(chart.standard_type, StandardType::Unknown);
        assert_eq!(chart.confidence, Confidence::Low);
        assert!(chart.evidence.is_empty());
    }

    #[test]
    fn test_summary_partitions_batch() {
        let records = vec![
            ChartRecord::new("R1", "Cover"),
            ChartRecord::new("R2", "Consolidated Balance Sheets"),
            ChartRecord::new("R3", "Consolidated Statements of Operations"),
            ChartRecord::new("R4", "Balance Sheet (Parenthetical)"),
        ];
        let charts = standardizer().batch_standardize(&records);
        let summary = summarize(&charts);

        let total: usize = summary.values().map(Vec::len).sum();
        assert_eq!(total, records.len());
        assert_eq!(summary[&StandardType::BalanceSheet].len(), 2);
        assert_eq!(summary[&StandardType::Unknown][0].identifier, "R1");

        let check = completeness(&charts);
        assert!(check.balance_sheet && check.income_statement);
        assert_eq!(
            check.missing(),
            vec![StandardType::CashFlowStatement, StandardType::StockholdersEquity]
        );
    }
}
