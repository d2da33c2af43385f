use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use super::lexicon::Lexicon;
use super::types::{DataType, Fact, KeyMetric, KeyMetrics, MetricValue};

static DATE_PREFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").unwrap());

/// Currency symbols, thousands separators and whitespace.
fn is_numeric_noise(c: char) -> bool {
    matches!(c, ',' | '$' | '€' | '£' | '¥') || c.is_whitespace()
}

/// Parses a displayed number such as `$ 1,234.5` or `(1,234)`.
///
/// Parentheses mark a negative amount. Anything that is not a plain decimal
/// after cleanup (words, dates, `NaN`) yields `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| !is_numeric_noise(*c)).collect();

    let (negative, body) = match cleaned.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, cleaned.as_str()),
    };

    let digits = body.strip_prefix(['-', '+']).unwrap_or(body);
    if digits.is_empty()
        || !digits.chars().any(|c| c.is_ascii_digit())
        || !digits.chars().all(|c| c.is_ascii_digit() || c == '.')
    {
        return None;
    }

    let value = body.parse::<f64>().ok()?;
    Some(if negative { -value } else { value })
}

/// Assigns a data type in priority order: unit tokens, format hint,
/// numeric parse, `YYYY-MM-DD` prefix, text.
///
/// `unit_texts` holds everything known about the unit (its id and, when
/// resolved, its measure).
pub fn classify_data_type(
    lexicon: &Lexicon,
    value: &str,
    unit_texts: &[&str],
    format_hint: Option<&str>,
) -> DataType {
    let units: Vec<String> = unit_texts.iter().map(|u| u.to_lowercase()).collect();
    let unit_has = |tokens: &[&str]| {
        units
            .iter()
            .any(|unit| tokens.iter().any(|token| unit.contains(token)))
    };

    if unit_has(lexicon.currency_tokens) {
        return DataType::Monetary;
    }
    if unit_has(lexicon.share_tokens) {
        return DataType::Shares;
    }

    if let Some(format) = format_hint.map(str::to_lowercase) {
        if lexicon.numeric_format_tokens.iter().any(|t| format.contains(t)) {
            return DataType::Numeric;
        }
        if lexicon.date_format_tokens.iter().any(|t| format.contains(t)) {
            return DataType::Date;
        }
    }

    if parse_number(value).is_some() {
        return DataType::Numeric;
    }

    if DATE_PREFIX_RE.is_match(value.trim()) {
        return DataType::Date;
    }

    DataType::Text
}

/// Numeric value of a monetary fact: cleaned, parsed, scaled by `10^scale`
/// and sign-adjusted. Falls back to the raw string when it does not parse.
pub fn normalize_monetary(fact: &Fact) -> MetricValue {
    match parse_number(&fact.raw_value) {
        Some(mut value) => {
            if let Some(scale) = fact.scale {
                value *= 10f64.powi(scale);
            }
            if fact.is_negative {
                value = -value;
            }
            MetricValue::Number(value)
        }
        None => {
            debug!(
                "Keeping raw value for {}: '{}' is not numeric",
                fact.concept, fact.raw_value
            );
            MetricValue::Text(fact.raw_value.clone())
        }
    }
}

/// Maps facts onto the canonical metric table.
pub struct FactResolver<'a> {
    lexicon: &'a Lexicon,
}

impl<'a> FactResolver<'a> {
    pub fn new(lexicon: &'a Lexicon) -> Self {
        FactResolver { lexicon }
    }

    /// For every canonical metric, the first fact (in document order) whose
    /// concept contains one of the metric's aliases, case-insensitively.
    pub fn resolve(&self, facts: &[Fact]) -> KeyMetrics {
        let mut metrics = BTreeMap::new();

        for aliases in &self.lexicon.metric_aliases {
            if let Some(fact) = facts.iter().find(|f| aliases.matches(&f.concept)) {
                debug!(
                    "Resolved {} from {} = '{}'",
                    aliases.canonical_name, fact.concept, fact.raw_value
                );
                metrics.insert(
                    aliases.canonical_name.to_string(),
                    key_metric(aliases.canonical_name, fact),
                );
            }
        }

        metrics
    }
}

fn key_metric(canonical_name: &str, fact: &Fact) -> KeyMetric {
    let value = if fact.is_monetary && !fact.raw_value.is_empty() {
        normalize_monetary(fact)
    } else {
        MetricValue::Text(fact.raw_value.clone())
    };

    KeyMetric {
        canonical_name: canonical_name.to_string(),
        value,
        source_concept: fact.concept.clone(),
        unit: fact.unit_ref.clone(),
        context_ref: fact.context_ref.clone(),
        scale: fact.scale,
        decimals: fact.decimals,
        period: fact.period.clone(),
    }
}

/// Facts whose concept contains `concept`, ignoring case.
pub fn facts_by_concept<'f>(facts: &'f [Fact], concept: &str) -> Vec<&'f Fact> {
    let needle = concept.to_lowercase();
    facts
        .iter()
        .filter(|f| f.concept.to_lowercase().contains(&needle))
        .collect()
}

/// Human-readable rendering of a metric value, e.g. `$1,234,000` or
/// `5,000,000 shares`.
pub fn format_metric_value(value: &MetricValue, unit: Option<&str>) -> String {
    let number = match value {
        MetricValue::Number(n) => *n,
        MetricValue::Text(text) => return text.clone(),
    };

    let formatted = if number.fract() == 0.0 {
        group_thousands(&format!("{:.0}", number))
    } else {
        let fixed = format!("{:.2}", number);
        let (int_part, dec_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
        format!("{}.{}", group_thousands(int_part), dec_part)
    };

    match unit.map(str::to_lowercase) {
        Some(u) if u.contains("usd") => match formatted.strip_prefix('-') {
            Some(abs) => format!("-${}", abs),
            None => format!("${}", formatted),
        },
        Some(u) if u.contains("share") => format!("{} shares", formatted),
        Some(_) => format!("{} {}", formatted, unit.unwrap_or_default()),
        None => formatted,
    }
}

fn group_thousands(int_part: &str) -> String {
    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", int_part),
    };

    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    format!("{}{}", sign, grouped)
}
