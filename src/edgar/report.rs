use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use strum::{EnumIter, IntoEnumIterator};

use super::parsing::lexicon::Lexicon;

/// Filing forms with their own section taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
#[serde(try_from = "String", into = "String")]
pub enum ReportType {
    Form10K,
    Form10Q,
    Form8K,
}

impl TryFrom<String> for ReportType {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        ReportType::from_str(&s)
    }
}

impl From<ReportType> for String {
    fn from(report_type: ReportType) -> Self {
        report_type.to_string()
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportType::Form10K => write!(f, "10-K"),
            ReportType::Form10Q => write!(f, "10-Q"),
            ReportType::Form8K => write!(f, "8-K"),
        }
    }
}

pub static REPORT_TYPES: Lazy<String> = Lazy::new(|| {
    ReportType::iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
});

impl ReportType {
    pub fn list_types() -> &'static str {
        &REPORT_TYPES
    }

    /// Detects the form type from the visible document text.
    ///
    /// Patterns are tried in order and the first hit wins; `fallback` is
    /// returned when no known form label appears anywhere.
    pub fn detect(text: &str, lexicon: &Lexicon, fallback: ReportType) -> ReportType {
        for pattern in &lexicon.form_patterns {
            if let Some(form) = pattern
                .captures(text)
                .and_then(|caps| caps.get(1))
                .and_then(|m| ReportType::from_str(m.as_str()).ok())
            {
                log::debug!("Detected form type {} via /{}/", form, pattern.as_str());
                return form;
            }
        }
        log::debug!("No form label found, falling back to {}", fallback);
        fallback
    }
}

impl FromStr for ReportType {
    type Err = String;

    fn from_str(s: &str) -> Result<ReportType, String> {
        match s.trim().to_uppercase().as_str() {
            "10-K" | "10K" => Ok(ReportType::Form10K),
            "10-Q" | "10Q" => Ok(ReportType::Form10Q),
            "8-K" | "8K" => Ok(ReportType::Form8K),
            _ => Err(format!(
                "Unknown form type '{}', expected one of: {}",
                s,
                ReportType::list_types()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        assert_eq!(ReportType::from_str("10-k").unwrap(), ReportType::Form10K);
        assert_eq!(ReportType::from_str(" 10-Q ").unwrap(), ReportType::Form10Q);
        assert_eq!(ReportType::Form8K.to_string(), "8-K");
        assert!(ReportType::from_str("S-1").is_err());
        assert_eq!(ReportType::list_types(), "10-K, 10-Q, 8-K");
    }

    #[test]
    fn test_detect_form_type() {
        let lexicon = Lexicon::global();
        let text = "UNITED STATES SECURITIES AND EXCHANGE COMMISSION Washington, D.C. Form 10-Q QUARTERLY REPORT";
        assert_eq!(
            ReportType::detect(text, lexicon, ReportType::Form10K),
            ReportType::Form10Q
        );

        let text = "8-K CURRENT REPORT pursuant to Section 13";
        assert_eq!(
            ReportType::detect(text, lexicon, ReportType::Form10K),
            ReportType::Form8K
        );
    }

    #[test]
    fn test_detect_falls_back() {
        let lexicon = Lexicon::global();
        assert_eq!(
            ReportType::detect("Annual letter to shareholders", lexicon, ReportType::Form10K),
            ReportType::Form10K
        );
    }

    #[test]
    fn test_serde_uses_form_labels() {
        let json = serde_json::to_string(&ReportType::Form10K).unwrap();
        assert_eq!(json, "\"10-K\"");
        let parsed: ReportType = serde_json::from_str("\"8-K\"").unwrap();
        assert_eq!(parsed, ReportType::Form8K);
    }
}
