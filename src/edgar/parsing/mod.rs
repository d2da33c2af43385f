pub mod charts;
pub mod document;
pub mod error;
pub mod facts;
pub mod fingerprint;
pub mod inline;
pub mod lexicon;
pub mod manifest;
pub mod section;
pub mod text;
pub mod types;
pub mod xbrl;

#[cfg(test)]
mod tests;

pub use charts::{completeness, summarize, ChartStandardizer, ContentMatch};
pub use document::{ChartBatch, FilingOverview, FilingParser, ParsedFiling, ParsedXbrl};
pub use error::ParseError;
pub use facts::{facts_by_concept, format_metric_value, FactResolver};
pub use fingerprint::content_fingerprint;
pub use inline::{InlineDocument, InlineFactExtractor};
pub use lexicon::{Lexicon, LEXICON};
pub use manifest::{parse_manifest, ManifestEntry};
pub use section::SectionExtractor;
pub use types::*;
pub use xbrl::{StructuredFactParser, XbrlInstance};
