//! Validation of GTFS feeds too big to be held twice in memory
//!
//! The feed is loaded once, table by table, into an [gtfs_store::InMemoryDao] whose stop times and
//! shape points are packed by parent while they are read. Streaming validators check each record
//! as it is loaded; once the DAO is closed, the DAO validators check the whole feed, possibly on
//! several threads. Every issue goes to a [report::ReportSink].
pub mod configuration;
pub mod loader;
pub mod pipeline;
pub mod report;
pub mod validation;

#[cfg(test)]
mod tests;

pub use configuration::ValidatorConfig;
pub use pipeline::{FeedValidation, Phase, ValidationOutcome};
pub use report::{InMemoryReport, IssueKind, ReportIssue, ReportSink, Severity};
