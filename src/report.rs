//! Issues found while loading and validating a feed
use gtfs_model::{SourceInfo, SourceRef};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::fmt;
use std::io::Write;

/// How bad an issue is, the worst first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    /// The feed could not be validated at all, or the validator itself failed
    Critical,
    /// The feed is not valid
    Error,
    /// The feed is valid but probably wrong
    Warning,
    /// Worth knowing
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Severity::Critical => "CRITICAL",
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::Info => "INFO",
        })
    }
}

/// Category of an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum IssueKind {
    UnreadableFeed,
    UnreadableTable,
    MissingMandatoryTable,
    MissingMandatoryColumn,
    MissingMandatoryValue,
    UnknownFile,
    UnknownColumn,
    InvalidEncoding,
    InvalidFieldFormat,
    InvalidFieldValue,
    UselessValue,
    DuplicatedObject,
    InvalidReference,
    UnusedObject,
    TripWithoutStopTimes,
    EmptyCalendar,
    NoService,
    TooManyDaysWithoutService,
    ExpiredFeed,
    FutureFeed,
    TooFewStops,
    DuplicatedStopSequence,
    MissingTimes,
    TimeTravel,
    InternalError,
}

impl IssueKind {
    /// Severity of the issues of this kind, unless a validator says otherwise
    pub fn default_severity(self) -> Severity {
        use IssueKind::*;
        match self {
            UnreadableFeed | InternalError => Severity::Critical,
            UnknownFile | UnknownColumn => Severity::Info,
            UselessValue | UnusedObject | TripWithoutStopTimes | EmptyCalendar
            | TooManyDaysWithoutService | ExpiredFeed | FutureFeed => Severity::Warning,
            UnreadableTable
            | MissingMandatoryTable
            | MissingMandatoryColumn
            | MissingMandatoryValue
            | InvalidEncoding
            | InvalidFieldFormat
            | InvalidFieldValue
            | DuplicatedObject
            | InvalidReference
            | NoService
            | TooFewStops
            | DuplicatedStopSequence
            | MissingTimes
            | TimeTravel => Severity::Error,
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One issue, with the rows it comes from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportIssue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub source_refs: Vec<SourceRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// `column=value` pairs of the first row
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub row: Vec<(String, String)>,
}

impl ReportIssue {
    pub fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            source_refs: Vec::new(),
            fields: Vec::new(),
            value: None,
            row: Vec::new(),
        }
    }

    pub fn at(mut self, source_ref: SourceRef) -> Self {
        self.source_refs.push(source_ref);
        self
    }

    pub fn field(mut self, field: &'static str) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: &[&'static str]) -> Self {
        self.fields.extend_from_slice(fields);
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_row(mut self, info: &SourceInfo) -> Self {
        self.row = info.pairs();
        self
    }

    fn sort_key(&self) -> (Severity, IssueKind, Option<SourceRef>, &[&'static str], &str) {
        (
            self.severity,
            self.kind,
            self.source_refs.first().copied(),
            self.fields.as_slice(),
            self.message.as_str(),
        )
    }
}

impl fmt::Display for ReportIssue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.kind, self.message)?;
        if !self.fields.is_empty() {
            write!(f, " ({})", self.fields.join(", "))?;
        }
        if let Some(value) = &self.value {
            write!(f, " value '{}'", value)?;
        }
        for source_ref in &self.source_refs {
            write!(f, " at {}", source_ref)?;
        }
        Ok(())
    }
}

/// Where loaders and validators send their issues; appending must be safe from several threads
pub trait ReportSink: Sync {
    fn report(&self, issue: ReportIssue);
}

#[derive(Default)]
struct Issues {
    kept: Vec<ReportIssue>,
    by_kind: FxHashMap<IssueKind, usize>,
    by_severity: FxHashMap<Severity, usize>,
    by_category: FxHashMap<(IssueKind, Severity), usize>,
}

/// The report sink keeping the issues in memory
///
/// With `max_issues_per_category`, the issues of a kind beyond the limit are counted, not kept.
#[derive(Default)]
pub struct InMemoryReport {
    issues: Mutex<Issues>,
    max_issues_per_category: Option<usize>,
}

/// Number of issues of a kind reported with a severity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub kind: IssueKind,
    pub severity: Severity,
    pub count: usize,
}

impl fmt::Display for CategoryCount {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:<8} {:<30} {}",
            self.severity.to_string(),
            self.kind.to_string(),
            self.count
        )
    }
}

#[derive(Serialize)]
struct ReportDump<'a> {
    feed: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha256: Option<&'a str>,
    summary: Vec<CategoryCount>,
    issues: Vec<ReportIssue>,
}

impl InMemoryReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(max_issues_per_category: usize) -> Self {
        Self {
            issues: Mutex::default(),
            max_issues_per_category: Some(max_issues_per_category),
        }
    }

    /// Issues in the order they were reported, which depends on the scheduling of the validators
    pub fn issues(&self) -> Vec<ReportIssue> {
        self.issues.lock().kept.clone()
    }

    /// Issues by severity, kind, then source
    pub fn sorted_issues(&self) -> Vec<ReportIssue> {
        let mut issues = self.issues();
        issues.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        issues
    }

    /// Issues of a kind, including those beyond the limit
    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.lock().by_kind.get(&kind).copied().unwrap_or_default()
    }

    /// Issues of a severity, including those beyond the limit
    pub fn count_severity(&self, severity: Severity) -> usize {
        self.issues
            .lock()
            .by_severity
            .get(&severity)
            .copied()
            .unwrap_or_default()
    }

    /// True if an issue is an error or worse
    pub fn has_errors(&self) -> bool {
        self.count_severity(Severity::Critical) + self.count_severity(Severity::Error) > 0
    }

    /// Count of each kind reported, by the severity the issues were reported with
    pub fn summary(&self) -> Vec<CategoryCount> {
        let mut summary: Vec<_> = self
            .issues
            .lock()
            .by_category
            .iter()
            .map(|(&(kind, severity), &count)| CategoryCount {
                kind,
                severity,
                count,
            })
            .collect();
        summary.sort_by_key(|c| (c.severity, c.kind));
        summary
    }

    /// Writes the summary and the sorted issues as JSON
    pub fn write_json<W: Write>(
        &self,
        writer: W,
        feed: &str,
        sha256: Option<&str>,
    ) -> serde_json::Result<()> {
        let dump = ReportDump {
            feed,
            sha256,
            summary: self.summary(),
            issues: self.sorted_issues(),
        };
        serde_json::to_writer_pretty(writer, &dump)
    }
}

impl ReportSink for InMemoryReport {
    fn report(&self, issue: ReportIssue) {
        log::trace!("{}", issue);
        let mut issues = self.issues.lock();
        let seen = issues.by_kind.entry(issue.kind).or_default();
        *seen += 1;
        let keep = self.max_issues_per_category.map_or(true, |max| *seen <= max);
        *issues.by_severity.entry(issue.severity).or_default() += 1;
        *issues
            .by_category
            .entry((issue.kind, issue.severity))
            .or_default() += 1;
        if keep {
            issues.kept.push(issue);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issues_beyond_the_limit_are_counted() {
        let report = InMemoryReport::with_limit(2);
        for line in 2..7 {
            report.report(
                ReportIssue::new(IssueKind::InvalidReference, "unknown stop")
                    .at(SourceRef::new("stop_times.txt", line))
                    .field("stop_id"),
            );
        }
        report.report(ReportIssue::new(IssueKind::ExpiredFeed, "expired"));
        assert_eq!(3, report.issues().len());
        assert_eq!(5, report.count(IssueKind::InvalidReference));
        assert_eq!(5, report.count_severity(Severity::Error));
        assert_eq!(1, report.count_severity(Severity::Warning));
        assert!(report.has_errors());
    }

    #[test]
    fn sorted_by_severity_then_source() {
        let report = InMemoryReport::new();
        let issue = |kind, table, line| ReportIssue::new(kind, "").at(SourceRef::new(table, line));
        report.report(issue(IssueKind::UnusedObject, "stops.txt", 4));
        report.report(issue(IssueKind::TimeTravel, "stop_times.txt", 9));
        report.report(issue(IssueKind::TimeTravel, "stop_times.txt", 3));
        report.report(
            ReportIssue::new(IssueKind::UnusedObject, "unused route")
                .with_severity(Severity::Info),
        );
        let lines: Vec<_> = report
            .sorted_issues()
            .iter()
            .map(|i| (i.severity, i.source_refs.first().map(|s| s.line)))
            .collect();
        assert_eq!(
            vec![
                (Severity::Error, Some(3)),
                (Severity::Error, Some(9)),
                (Severity::Warning, Some(4)),
                (Severity::Info, None)
            ],
            lines
        );
        assert!(!InMemoryReport::new().has_errors());
    }

    #[test]
    fn json_dump() {
        let report = InMemoryReport::new();
        report.report(
            ReportIssue::new(IssueKind::InvalidFieldFormat, "invalid date")
                .at(SourceRef::new("calendar.txt", 2))
                .field("start_date")
                .value("2024-01-01"),
        );
        let mut out = Vec::new();
        report.write_json(&mut out, "feed.zip", None).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!("feed.zip", json["feed"]);
        assert_eq!(1, json["summary"][0]["count"]);
        let issue = &json["issues"][0];
        assert_eq!("InvalidFieldFormat", issue["kind"]);
        assert_eq!("Error", issue["severity"]);
        assert_eq!("calendar.txt", issue["source_refs"][0]["table"]);
        assert_eq!(2, issue["source_refs"][0]["line"]);
        assert_eq!("2024-01-01", issue["value"]);
        assert!(issue.get("row").is_none());
    }

    #[test]
    fn summary_follows_the_reported_severity() {
        let report = InMemoryReport::new();
        let unknown_code = || {
            ReportIssue::new(IssueKind::InvalidFieldValue, "unknown code")
                .at(SourceRef::new("routes.txt", 2))
                .field("route_type")
        };
        report.report(unknown_code().with_severity(Severity::Warning));
        report.report(unknown_code().with_severity(Severity::Warning));
        report.report(unknown_code());
        assert_eq!(
            vec![
                CategoryCount {
                    kind: IssueKind::InvalidFieldValue,
                    severity: Severity::Error,
                    count: 1
                },
                CategoryCount {
                    kind: IssueKind::InvalidFieldValue,
                    severity: Severity::Warning,
                    count: 2
                },
            ],
            report.summary()
        );
        assert_eq!(3, report.count(IssueKind::InvalidFieldValue));
    }
}
