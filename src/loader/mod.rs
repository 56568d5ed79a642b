//! Loading of a feed into the DAO, table by table, row by row
mod converter;
mod tables;

pub use converter::{Presence, RowConverter};
pub use tables::table_descriptors;

use crate::report::{IssueKind, ReportIssue, ReportSink};
use crate::validation::{panic_message, StreamingContext, StreamingValidator, StreamingValidators};
use gtfs_model::{FeedSource, SourceContext, SourceRef, KNOWN_TABLES};
use gtfs_store::InMemoryDao;
use rustc_hash::FxHashSet;
use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

/// What the descriptors need to save a record
pub struct LoadContext<'a> {
    pub dao: &'a mut InMemoryDao,
    pub report: &'a dyn ReportSink,
    pub validators: &'a StreamingValidators,
    /// Validators that panicked, skipped until the end of the load
    failed: RefCell<FxHashSet<&'static str>>,
}

impl<'a> LoadContext<'a> {
    pub fn new(
        dao: &'a mut InMemoryDao,
        report: &'a dyn ReportSink,
        validators: &'a StreamingValidators,
    ) -> Self {
        Self {
            dao,
            report,
            validators,
            failed: RefCell::default(),
        }
    }

    /// Runs the streaming validators of a record against the tables loaded so far
    pub fn validate<T>(
        &self,
        validators: &[Box<dyn StreamingValidator<T>>],
        record: &T,
        source: &SourceContext<'_>,
    ) {
        if validators.is_empty() {
            return;
        }
        let context = StreamingContext {
            source,
            dao: &*self.dao,
            report: self.report,
        };
        for validator in validators {
            let name = validator.name();
            if self.failed.borrow().contains(name) {
                continue;
            }
            let outcome = catch_unwind(AssertUnwindSafe(|| validator.validate(record, &context)));
            if let Err(payload) = outcome {
                let failure = format!("panicked: {}", panic_message(payload.as_ref()));
                log::error!(
                    "validator {} failed at {}: {}",
                    name,
                    source.source_ref,
                    failure
                );
                self.report.report(
                    ReportIssue::new(
                        IssueKind::InternalError,
                        format!("validator {} failed, skipped for the rest of the load", name),
                    )
                    .at(source.source_ref)
                    .value(failure),
                );
                self.failed.borrow_mut().insert(name);
            }
        }
    }
}

/// Reports a record having the same key as a previous one; the record is still saved over it
pub fn report_duplicate(
    row: &mut RowConverter<'_>,
    previous: SourceRef,
    key_fields: &[&'static str],
    key: impl Into<String>,
) {
    row.report(
        ReportIssue::new(IssueKind::DuplicatedObject, "duplicated key")
            .at(previous)
            .fields(key_fields)
            .value(key),
    );
}

/// How a table is read
pub trait TableDescriptor: Sync {
    fn table_name(&self) -> &'static str;

    /// A feed without this table is invalid
    fn mandatory(&self) -> bool {
        false
    }

    /// Every column of the reference, the others are reported as unknown
    fn columns(&self) -> &'static [&'static str];

    fn mandatory_columns(&self) -> &'static [&'static str];

    /// Converts the row, validates the record and saves it
    fn parse_and_save(&self, row: &mut RowConverter<'_>, context: &mut LoadContext<'_>);
}

/// Rows read by table, in load order
#[derive(Debug, Default)]
pub struct LoadSummary {
    pub tables: Vec<(&'static str, usize)>,
}

/// Loads every known table of the feed, in dependency order; the DAO is left open
pub fn load_feed(
    source: &mut FeedSource,
    dao: &mut InMemoryDao,
    validators: &StreamingValidators,
    report: &dyn ReportSink,
) -> LoadSummary {
    for file_name in source.file_names() {
        if !KNOWN_TABLES.contains(&file_name.as_str()) {
            report.report(
                ReportIssue::new(IssueKind::UnknownFile, "file not in the reference")
                    .value(file_name.as_str()),
            );
        }
    }

    let ids = dao.shared_id_cache();
    let mut summary = LoadSummary::default();
    let mut context = LoadContext::new(dao, report, validators);
    for descriptor in table_descriptors() {
        let table = descriptor.table_name();
        let rows = match source.open_table(table) {
            Ok(Some(rows)) => rows,
            Ok(None) => {
                if descriptor.mandatory() {
                    report.report(ReportIssue::new(
                        IssueKind::MissingMandatoryTable,
                        format!("missing mandatory table {}", table),
                    ));
                }
                continue;
            }
            Err(e) => {
                report.report(
                    ReportIssue::new(IssueKind::UnreadableTable, e.to_string())
                        .at(SourceRef::new(table, 1)),
                );
                continue;
            }
        };

        let headers = rows.headers().clone();
        for column in descriptor.mandatory_columns() {
            if !headers.contains(column) {
                report.report(
                    ReportIssue::new(IssueKind::MissingMandatoryColumn, "missing mandatory column")
                        .at(SourceRef::new(table, 1))
                        .field(*column),
                );
            }
        }
        for column in headers.names() {
            if !descriptor.columns().contains(&column.as_str()) {
                report.report(
                    ReportIssue::new(IssueKind::UnknownColumn, "column not in the reference")
                        .at(SourceRef::new(table, 1))
                        .value(column.as_str()),
                );
            }
        }

        let start = Instant::now();
        let mut count = 0;
        for row in rows {
            match row {
                Ok(row) => {
                    let mut converter = RowConverter::new(&row, &ids, report);
                    converter.check_encoding();
                    descriptor.parse_and_save(&mut converter, &mut context);
                    count += 1;
                }
                Err(e) => {
                    log::warn!("{}: {}", table, e);
                    report.report(
                        ReportIssue::new(IssueKind::UnreadableTable, e.to_string())
                            .at(SourceRef::new(table, count as u64 + 2)),
                    );
                    break;
                }
            }
        }
        log::info!(
            "{}: {} rows loaded in {:.2}s",
            table,
            count,
            start.elapsed().as_secs_f32()
        );
        summary.tables.push((table, count));
    }
    summary
}
