use crate::report::{IssueKind, ReportIssue, ReportSink, Severity};
use crate::validation::{
    DaoValidator, StopTimeValidator, StreamingContext, StreamingValidator, StreamingValidators,
};
use crate::{FeedValidation, Phase, ValidatorConfig};
use gtfs_model::{Id, SourceRef, StopTime, Trip};
use gtfs_store::{DaoOptions, IndexedReadOnlyDao, ReadOnlyDao, StoreMode};
use tempfile::TempDir;

const AGENCY: &str = "agency_id,agency_name,agency_url,agency_timezone
A1,Agency,http://agency.example,Europe/Paris
";

const STOPS: &str = "stop_id,stop_name,stop_lat,stop_lon
S1,One,48.85,2.35
S2,Two,48.86,2.36
S3,Three,48.87,2.37
";

const ROUTES: &str = "route_id,agency_id,route_short_name,route_type
R1,A1,1,3
";

const CALENDAR: &str =
    "service_id,monday,tuesday,wednesday,thursday,friday,saturday,sunday,start_date,end_date
WEEK,1,1,1,1,1,0,0,20240101,20241231
";

const TRIPS: &str = "route_id,service_id,trip_id
R1,WEEK,T1
";

/// T2 is not in trips.txt, and its rows are mixed with the ones of T1
const STOP_TIMES: &str = "trip_id,arrival_time,departure_time,stop_id,stop_sequence
T1,08:10:00,08:10:00,S2,2
T2,09:00:00,09:00:00,S1,1
T1,08:00:00,08:00:00,S1,1
T2,09:10:00,09:10:00,S2,2
T1,08:20:00,08:20:00,S3,3
";

fn write_feed(tables: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, content) in tables {
        std::fs::write(dir.path().join(name), content).unwrap();
    }
    dir
}

fn base_feed() -> Vec<(&'static str, &'static str)> {
    vec![
        ("agency.txt", AGENCY),
        ("stops.txt", STOPS),
        ("routes.txt", ROUTES),
        ("calendar.txt", CALENDAR),
        ("trips.txt", TRIPS),
        ("stop_times.txt", STOP_TIMES),
    ]
}

fn sequences(dao: &dyn IndexedReadOnlyDao, trip: &str) -> Vec<(Option<u32>, String)> {
    let trip_id: Id<Trip> = ReadOnlyDao::id_cache(dao).intern(trip).unwrap();
    dao.stop_times_of(&trip_id)
        .iter()
        .map(|st| {
            let stop = st.stop_id.as_ref().map(|s| s.to_string()).unwrap_or_default();
            (st.stop_sequence, stop)
        })
        .collect()
}

fn issue_set(issues: &[ReportIssue]) -> Vec<String> {
    let mut set: Vec<String> = issues.iter().map(|i| format!("{:?}", i)).collect();
    set.sort();
    set
}

#[test]
fn interleaved_stop_times_of_an_unknown_trip() {
    let dir = write_feed(&base_feed());
    let outcome = FeedValidation::new(ValidatorConfig::new()).run(dir.path());

    assert_eq!(Phase::Done, outcome.phase());
    let dao = outcome.dao.as_ref().unwrap();
    assert_eq!(
        vec![
            (Some(1), "S1".to_owned()),
            (Some(2), "S2".to_owned()),
            (Some(3), "S3".to_owned())
        ],
        sequences(dao, "T1")
    );

    let report = &outcome.report;
    assert_eq!(0, report.count_severity(Severity::Critical));
    assert_eq!(1, report.count(IssueKind::InvalidReference));
    let unknown_trip = report
        .issues()
        .into_iter()
        .find(|i| i.kind == IssueKind::InvalidReference)
        .unwrap();
    assert_eq!(Some("T2"), unknown_trip.value.as_deref());
    assert_eq!(vec![SourceRef::new("stop_times.txt", 3)], unknown_trip.source_refs);
    assert_eq!(0, report.count(IssueKind::TripWithoutStopTimes));
    assert_eq!(0, report.count(IssueKind::UnusedObject));
}

#[test]
fn store_layouts_give_the_same_result() {
    let dir = write_feed(&base_feed());
    let mut results = Vec::new();
    for mode in [StoreMode::Packed, StoreMode::Unsorted, StoreMode::Auto] {
        let mut options = DaoOptions::default();
        options.stop_times.mode = mode;
        options.stop_times.max_interleaving = 1;
        let outcome = FeedValidation::new(ValidatorConfig::new())
            .with_dao_options(options)
            .run(dir.path());
        let dao = outcome.dao.as_ref().unwrap();
        results.push((
            sequences(dao, "T1"),
            sequences(dao, "T2"),
            issue_set(&outcome.report.issues()),
        ));
    }
    assert_eq!(results[0], results[1]);
    assert_eq!(results[1], results[2]);
}

#[test]
fn same_issues_whatever_the_number_of_threads() {
    let mut tables = base_feed();
    tables.push((
        "transfers.txt",
        "from_stop_id,to_stop_id,transfer_type,min_transfer_time\nS1,S9,0,60\n",
    ));
    let dir = write_feed(&tables);
    let single = FeedValidation::new(ValidatorConfig::new()).run(dir.path());
    let several = FeedValidation::new(ValidatorConfig::new())
        .with_num_threads(4)
        .run(dir.path());
    assert_eq!(
        issue_set(&single.report.issues()),
        issue_set(&several.report.issues())
    );
    assert!(single.report.count(IssueKind::UselessValue) > 0);
}

#[test]
fn duplicated_stop_keeps_the_last_one() {
    let mut tables = base_feed();
    tables[1] = (
        "stops.txt",
        "stop_id,stop_name,stop_lat,stop_lon
S1,First,48.85,2.35
S1,Second,48.85,2.35
S2,Two,48.86,2.36
S3,Three,48.87,2.37
",
    );
    let dir = write_feed(&tables);
    let outcome = FeedValidation::new(ValidatorConfig::new()).run(dir.path());

    let dao = outcome.dao.as_ref().unwrap();
    let s1 = ReadOnlyDao::id_cache(dao).intern("S1").unwrap();
    assert_eq!(Some("Second"), dao.get_stop(&s1).and_then(|s| s.name.as_deref()));
    let duplicates: Vec<_> = outcome
        .report
        .issues()
        .into_iter()
        .filter(|i| i.kind == IssueKind::DuplicatedObject)
        .collect();
    assert_eq!(1, duplicates.len());
    assert_eq!(
        vec![SourceRef::new("stops.txt", 2), SourceRef::new("stops.txt", 3)],
        duplicates[0].source_refs
    );
}

struct Exploding;

impl DaoValidator for Exploding {
    fn name(&self) -> &'static str {
        "exploding"
    }

    fn validate(&self, dao: &dyn IndexedReadOnlyDao, _: &dyn ReportSink) -> anyhow::Result<()> {
        let first = dao.service_dates()[1000];
        anyhow::bail!("unreachable, {}", first)
    }
}

#[test]
fn a_failing_validator_does_not_stop_the_others() {
    let dir = write_feed(&base_feed());
    let outcome = FeedValidation::new(ValidatorConfig::new())
        .with_dao_validator(Box::new(Exploding))
        .with_num_threads(2)
        .run(dir.path());
    assert_eq!(Phase::Done, outcome.phase());
    let report = &outcome.report;
    assert_eq!(1, report.count(IssueKind::InternalError));
    assert_eq!(1, report.count_severity(Severity::Critical));
    // The references validator still ran
    assert_eq!(1, report.count(IssueKind::InvalidReference));
}

/// Gives up on the second stop time of T1
struct Fragile;

impl StreamingValidator<StopTime> for Fragile {
    fn name(&self) -> &'static str {
        "fragile"
    }

    fn validate(&self, stop_time: &StopTime, _: &StreamingContext<'_>) {
        if stop_time.trip_id.as_str() == "T1" && stop_time.stop_sequence == Some(2) {
            panic!("cannot handle {}", stop_time.trip_id);
        }
    }
}

#[test]
fn a_failing_streaming_validator_does_not_stop_the_load() {
    let dir = write_feed(&base_feed());
    let mut streaming = StreamingValidators::new(&ValidatorConfig::new());
    streaming.stop_times = vec![Box::new(Fragile), Box::new(StopTimeValidator)];
    let outcome = FeedValidation::new(ValidatorConfig::new())
        .with_streaming_validators(streaming)
        .run(dir.path());

    assert_eq!(Phase::Done, outcome.phase());
    let dao = outcome.dao.as_ref().unwrap();
    assert_eq!(3, sequences(dao, "T1").len());
    assert_eq!(5, dao.stop_time_count());

    let report = &outcome.report;
    assert_eq!(1, report.count(IssueKind::InternalError));
    let failure = report
        .issues()
        .into_iter()
        .find(|i| i.kind == IssueKind::InternalError)
        .unwrap();
    assert_eq!(vec![SourceRef::new("stop_times.txt", 2)], failure.source_refs);
    assert_eq!(Some("panicked: cannot handle T1"), failure.value.as_deref());
    // The batch validators still ran
    assert_eq!(1, report.count(IssueKind::InvalidReference));
}

#[test]
fn missing_feed() {
    let dir = tempfile::tempdir().unwrap();
    let outcome =
        FeedValidation::new(ValidatorConfig::new()).run(dir.path().join("nowhere.zip"));
    assert!(outcome.dao.is_none());
    let issues = outcome.report.issues();
    assert_eq!(1, issues.len());
    assert_eq!(IssueKind::UnreadableFeed, issues[0].kind);
    assert_eq!(Severity::Critical, issues[0].severity);
    assert!(outcome.report.has_errors());
}

#[test]
fn malformed_rows_and_missing_tables() {
    let dir = write_feed(&[
        ("agency.txt", AGENCY),
        (
            "stops.txt",
            "stop_id,stop_name,stop_lat,stop_lon,stop_color
S1,One,abc,2.35,red
S2,Two,48.86,2.36,blue
",
        ),
        ("calendar.txt", CALENDAR),
        ("trips.txt", TRIPS),
        ("notes.txt", "whatever\n"),
    ]);
    let mut config = ValidatorConfig::new();
    config.set("calendar_coverage.check_expired", false);
    let outcome = FeedValidation::new(config).run(dir.path());
    let report = &outcome.report;

    let bad_latitude = report
        .issues()
        .into_iter()
        .find(|i| i.kind == IssueKind::InvalidFieldFormat)
        .unwrap();
    assert_eq!(vec![SourceRef::new("stops.txt", 2)], bad_latitude.source_refs);
    assert_eq!(vec!["stop_lat"], bad_latitude.fields);
    assert_eq!(Some("abc"), bad_latitude.value.as_deref());

    // routes.txt and stop_times.txt
    assert_eq!(2, report.count(IssueKind::MissingMandatoryTable));
    assert_eq!(1, report.count(IssueKind::UnknownColumn));
    assert_eq!(1, report.count(IssueKind::UnknownFile));
    // R1 is not loaded
    assert_eq!(1, report.count(IssueKind::InvalidReference));
    assert_eq!(1, report.count(IssueKind::TripWithoutStopTimes));
    assert_eq!(0, report.count(IssueKind::ExpiredFeed));
}
