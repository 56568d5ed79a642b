use crate::report::{IssueKind, ReportIssue, ReportSink, Severity};
use chrono::NaiveDate;
use gtfs_model::fields::{parse_bool, parse_color, parse_date, parse_time};
use gtfs_model::{
    DataRow, GtfsCode, Id, IdCache, LogicalTime, SourceContext, SourceInfo, SourceRef,
};
use rgb::RGB8;
use std::str::FromStr;
use std::sync::Arc;

/// Whether a value must be there
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Optional,
    Mandatory,
}

pub use Presence::{Mandatory, Optional};

/// Turns the raw values of one row into typed values
///
/// Every malformed value is reported with the table, line and column, and comes out as `None`
/// (or the default of the enumeration), so that the row is still loaded.
pub struct RowConverter<'a> {
    row: &'a DataRow,
    ids: &'a IdCache,
    report: &'a dyn ReportSink,
    source_info: Option<Arc<SourceInfo>>,
}

impl<'a> RowConverter<'a> {
    pub fn new(row: &'a DataRow, ids: &'a IdCache, report: &'a dyn ReportSink) -> Self {
        Self {
            row,
            ids,
            report,
            source_info: None,
        }
    }

    pub fn source_ref(&self) -> SourceRef {
        self.row.source_ref
    }

    pub fn line(&self) -> u64 {
        self.row.source_ref.line
    }

    /// Raw values of the row, built once and shared by the issues of the row
    pub fn source_info(&mut self) -> Arc<SourceInfo> {
        let row = self.row;
        Arc::clone(
            self.source_info
                .get_or_insert_with(|| Arc::new(row.source_info())),
        )
    }

    /// The context handed to the validators and the DAO; the raw values are copied only if needed
    pub fn source_context(&self) -> SourceContext<'a> {
        SourceContext::of_row(self.row, self.source_info.clone())
    }

    /// Reports an issue on this row
    pub fn report(&mut self, issue: ReportIssue) {
        let info = self.source_info();
        self.report.report(issue.at(self.source_ref()).with_row(&info));
    }

    /// Reports the values that were not valid UTF-8 or contain a NUL character
    ///
    /// A `U+FFFD` written as such in a valid UTF-8 file is a legitimate value.
    pub fn check_encoding(&mut self) {
        let row = self.row;
        let invalid_utf8 = row.invalid_utf8;
        let invalid: Vec<(String, String)> = row
            .headers
            .names()
            .iter()
            .zip(&row.fields)
            .filter(|(_, v)| (invalid_utf8 && v.contains('\u{FFFD}')) || v.contains('\0'))
            .map(|(h, v)| (h.clone(), v.clone()))
            .collect();
        for (column, value) in invalid {
            self.report(
                ReportIssue::new(
                    IssueKind::InvalidEncoding,
                    format!("invalid characters in column {}", column),
                )
                .value(value),
            );
        }
    }

    fn raw(&mut self, field: &'static str, presence: Presence) -> Option<&'a str> {
        let row = self.row;
        match row.get(field).filter(|v| !v.is_empty()) {
            Some(value) => Some(value),
            None => {
                // A missing column is reported once by the loader
                if presence == Mandatory && row.headers.contains(field) {
                    self.report(
                        ReportIssue::new(IssueKind::MissingMandatoryValue, "missing value")
                            .field(field),
                    );
                }
                None
            }
        }
    }

    fn parse<T>(
        &mut self,
        field: &'static str,
        presence: Presence,
        expected: &str,
        parse: impl FnOnce(&str) -> Option<T>,
    ) -> Option<T> {
        let raw = self.raw(field, presence)?;
        let parsed = parse(raw);
        if parsed.is_none() {
            self.report(
                ReportIssue::new(
                    IssueKind::InvalidFieldFormat,
                    format!("expected {}", expected),
                )
                .field(field)
                .value(raw),
            );
        }
        parsed
    }

    pub fn string(&mut self, field: &'static str, presence: Presence) -> Option<String> {
        self.raw(field, presence).map(str::to_owned)
    }

    pub fn id<T>(&mut self, field: &'static str, presence: Presence) -> Option<Id<T>> {
        let raw = self.raw(field, presence)?;
        self.ids.intern(raw)
    }

    pub fn number<T: FromStr>(
        &mut self,
        field: &'static str,
        presence: Presence,
        expected: &str,
    ) -> Option<T> {
        self.parse(field, presence, expected, |s| s.parse().ok())
    }

    /// A non-negative integer
    pub fn u32(&mut self, field: &'static str, presence: Presence) -> Option<u32> {
        self.number(field, presence, "a non-negative integer")
    }

    /// A sequence number, kept below `i32::MAX`
    pub fn sequence(&mut self, field: &'static str) -> Option<u32> {
        self.parse(field, Mandatory, "a sequence number (non-negative integer)", |s| {
            s.parse::<u32>().ok().filter(|&n| n <= i32::MAX as u32)
        })
    }

    /// A finite floating-point number
    pub fn f64(&mut self, field: &'static str, presence: Presence) -> Option<f64> {
        self.parse(field, presence, "a floating-point number", |s| {
            s.parse::<f64>().ok().filter(|f| f.is_finite())
        })
    }

    pub fn f32(&mut self, field: &'static str, presence: Presence) -> Option<f32> {
        self.parse(field, presence, "a floating-point number", |s| {
            s.parse::<f32>().ok().filter(|f| f.is_finite())
        })
    }

    /// A coordinate in degrees, reported out of `[-limit, limit]`
    pub fn coordinate(
        &mut self,
        field: &'static str,
        presence: Presence,
        limit: f64,
    ) -> Option<f64> {
        let value = self.f64(field, presence)?;
        if value.abs() > limit {
            self.report(
                ReportIssue::new(
                    IssueKind::InvalidFieldValue,
                    format!("coordinate out of [-{}, {}]", limit, limit),
                )
                .field(field)
                .value(value.to_string()),
            );
            return None;
        }
        Some(value)
    }

    pub fn date(&mut self, field: &'static str, presence: Presence) -> Option<NaiveDate> {
        self.parse(field, presence, "a date (YYYYMMDD)", |s| parse_date(s).ok())
    }

    pub fn time(&mut self, field: &'static str, presence: Presence) -> Option<LogicalTime> {
        self.parse(field, presence, "a time (HH:MM:SS)", |s| parse_time(s).ok())
    }

    pub fn color(&mut self, field: &'static str) -> Option<RGB8> {
        self.parse(field, Optional, "a color (RRGGBB)", |s| parse_color(s).ok())
    }

    /// `0` or `1`, `default` when absent
    pub fn bool(&mut self, field: &'static str, presence: Presence, default: bool) -> bool {
        self.parse(field, presence, "a boolean (0 or 1)", |s| parse_bool(s).ok())
            .unwrap_or(default)
    }

    /// An enumerated code; an unknown code is reported and kept
    pub fn code_opt<E: GtfsCode>(&mut self, field: &'static str, presence: Presence) -> Option<E> {
        let code: i32 = self.number(field, presence, "an integer code")?;
        let value = E::from_code(code);
        if value.is_unknown() {
            self.report(
                ReportIssue::new(IssueKind::InvalidFieldValue, "unrecognized code")
                    .with_severity(Severity::Warning)
                    .field(field)
                    .value(code.to_string()),
            );
        }
        Some(value)
    }

    /// An enumerated code, the default variant when absent or malformed
    pub fn code<E: GtfsCode + Default>(&mut self, field: &'static str, presence: Presence) -> E {
        self.code_opt(field, presence).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::InMemoryReport;
    use gtfs_model::{LocationType, TableHeaders};

    fn row(headers: &[&str], fields: &[&str]) -> DataRow {
        DataRow {
            source_ref: SourceRef::new("stops.txt", 7),
            headers: Arc::new(TableHeaders::new(
                headers.iter().map(|h| h.to_string()).collect(),
            )),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            invalid_utf8: false,
        }
    }

    #[test]
    fn malformed_values_are_reported_with_their_column() {
        let ids = IdCache::new();
        let report = InMemoryReport::new();
        let row = row(
            &["stop_id", "stop_lat", "stop_lon", "location_type", "start_date", "start_time"],
            &["S1", "91.5", "abc", "9", "2024-01-01", "25:61:00"],
        );
        let mut converter = RowConverter::new(&row, &ids, &report);
        let id: Option<Id<gtfs_model::Stop>> = converter.id("stop_id", Mandatory);
        assert_eq!(Some("S1"), id.as_ref().map(Id::as_str));
        assert_eq!(None, converter.coordinate("stop_lat", Mandatory, 90.0));
        assert_eq!(None, converter.coordinate("stop_lon", Mandatory, 180.0));
        assert_eq!(
            LocationType::Unknown(9),
            converter.code::<LocationType>("location_type", Optional)
        );
        assert_eq!(None, converter.date("start_date", Optional));
        assert_eq!(None, converter.time("start_time", Optional));
        assert_eq!(None, converter.string("stop_name", Mandatory));

        let issues = report.sorted_issues();
        let found: Vec<_> = issues
            .iter()
            .map(|i| (i.kind, i.fields[0], i.source_refs[0].line))
            .collect();
        assert_eq!(
            vec![
                (IssueKind::InvalidFieldFormat, "start_date", 7),
                (IssueKind::InvalidFieldFormat, "start_time", 7),
                (IssueKind::InvalidFieldFormat, "stop_lon", 7),
                (IssueKind::InvalidFieldValue, "stop_lat", 7),
                (IssueKind::InvalidFieldValue, "location_type", 7),
            ],
            found
        );
        assert_eq!(Some("abc"), issues[2].value.as_deref());
        assert_eq!(("stop_id".to_owned(), "S1".to_owned()), issues[0].row[0]);
    }

    #[test]
    fn missing_mandatory_values() {
        let ids = IdCache::new();
        let report = InMemoryReport::new();
        let row = row(&["trip_id", "stop_sequence"], &["", "-1"]);
        let mut converter = RowConverter::new(&row, &ids, &report);
        assert_eq!(None, converter.id::<gtfs_model::Trip>("trip_id", Mandatory));
        assert_eq!(None, converter.sequence("stop_sequence"));
        assert_eq!(None, converter.sequence("absent_column"));
        assert_eq!(1, report.count(IssueKind::MissingMandatoryValue));
        assert_eq!(1, report.count(IssueKind::InvalidFieldFormat));
    }

    #[test]
    fn invalid_encoding() {
        let ids = IdCache::new();
        let report = InMemoryReport::new();
        let mut replaced = row(&["stop_id", "stop_name"], &["S1", "Gare du Nord\u{FFFD}"]);
        RowConverter::new(&replaced, &ids, &report).check_encoding();
        assert!(report.issues().is_empty());

        replaced.invalid_utf8 = true;
        RowConverter::new(&replaced, &ids, &report).check_encoding();
        let issues = report.issues();
        assert_eq!(1, issues.len());
        assert_eq!(IssueKind::InvalidEncoding, issues[0].kind);
        assert_eq!(vec![SourceRef::new("stops.txt", 7)], issues[0].source_refs);

        let nul = row(&["stop_id", "stop_name"], &["S2", "Nord\0"]);
        RowConverter::new(&nul, &ids, &report).check_encoding();
        assert_eq!(2, report.count(IssueKind::InvalidEncoding));
    }
}
