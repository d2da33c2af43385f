pub mod parsing;
pub mod report;

pub use report::ReportType;
