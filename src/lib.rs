pub mod core;
pub mod edgar;

// Re-exports
pub use core::config::AnalyzerConfig;
pub use edgar::parsing::{FilingParser, Lexicon, ParseError};
pub use edgar::report::ReportType;
