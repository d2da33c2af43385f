use anyhow::{anyhow, Context, Result};
use std::str::FromStr;

use crate::edgar::report::ReportType;

pub const DEFAULT_MIN_SECTION_CHARS: usize = 100;

#[derive(Clone, Debug, PartialEq)]
pub struct AnalyzerConfig {
    /// A section is kept only when its content is longer than this.
    pub min_section_chars: usize,
    /// Form assumed when no form label appears in the document.
    pub default_form: ReportType,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            min_section_chars: DEFAULT_MIN_SECTION_CHARS,
            default_form: ReportType::Form10K,
        }
    }
}

impl AnalyzerConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = AnalyzerConfig::default();

        let min_section_chars = match std::env::var("SEC_ANALYZER_MIN_SECTION_CHARS") {
            Ok(raw) => raw.trim().parse::<usize>().with_context(|| {
                format!("SEC_ANALYZER_MIN_SECTION_CHARS must be a whole number, got '{}'", raw)
            })?,
            Err(_) => defaults.min_section_chars,
        };

        let default_form = match std::env::var("SEC_ANALYZER_DEFAULT_FORM") {
            Ok(raw) => ReportType::from_str(&raw).map_err(|e| anyhow!(e))?,
            Err(_) => defaults.default_form,
        };

        Ok(Self {
            min_section_chars,
            default_form,
        })
    }
}
