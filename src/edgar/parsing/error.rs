use thiserror::Error;

/// Errors that fail a whole parse call.
///
/// Missing sections, facts or metrics are not errors; they show up as
/// empty or partial result collections.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The structured fact document is not well-formed XML
    #[error("malformed fact document: {0}")]
    Xml(#[from] roxmltree::Error),

    /// The chart manifest could not be read
    #[error("malformed filing manifest: {0}")]
    Manifest(String),
}
