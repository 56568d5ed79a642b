//! Validators
//!
//! Streaming validators look at each record while it is loaded; they only see the tables loaded
//! before it. DAO validators run once the DAO is closed and see the whole feed.
use crate::configuration::{OptionSpec, ValidatorConfig};
use crate::report::{IssueKind, ReportIssue, ReportSink};
use gtfs_model::{Calendar, Frequency, Id, ShapePoint, SourceContext, StopTime, Transfer, Trip};
use gtfs_store::{IndexedReadOnlyDao, ReadOnlyDao};

mod coverage;
mod references;
mod runner;
mod streaming;
mod trip_times;

pub use coverage::{CalendarCoverageValidator, UnusedObjectsValidator};
pub use references::ReferencesValidator;
pub(crate) use runner::panic_message;
pub use runner::run_dao_validators;
pub use streaming::{
    CalendarValidator, FrequencyValidator, ShapePointValidator, StopTimeValidator,
    TransferValidator, TripValidator,
};
pub use trip_times::TripTimesValidator;

/// A reference to a record missing from `table`
fn invalid_reference<T>(field: &'static str, id: &Id<T>, table: &str) -> ReportIssue {
    ReportIssue::new(
        IssueKind::InvalidReference,
        format!("no record with this id in {}", table),
    )
    .field(field)
    .value(id.as_str())
}

/// What a streaming validator gets with the record
pub struct StreamingContext<'a> {
    pub source: &'a SourceContext<'a>,
    /// The tables loaded so far
    pub dao: &'a dyn ReadOnlyDao,
    pub report: &'a dyn ReportSink,
}

impl<'a> StreamingContext<'a> {
    /// Reports an issue on the row being loaded
    pub fn report(&self, issue: ReportIssue) {
        self.report.report(
            issue
                .at(self.source.source_ref)
                .with_row(&self.source.source_info()),
        );
    }
}

/// Checks one record of type `T` at a time
pub trait StreamingValidator<T>: Send + Sync {
    fn name(&self) -> &'static str;

    /// A panic is reported as an internal error, and the validator is skipped for the rest of the load
    fn validate(&self, record: &T, context: &StreamingContext<'_>);
}

/// Checks the whole feed
pub trait DaoValidator: Send + Sync {
    fn name(&self) -> &'static str;

    /// An `Err` is reported as an internal error, like a panic
    fn validate(&self, dao: &dyn IndexedReadOnlyDao, report: &dyn ReportSink)
        -> anyhow::Result<()>;
}

/// The streaming validators, by record type
#[derive(Default)]
pub struct StreamingValidators {
    pub calendars: Vec<Box<dyn StreamingValidator<Calendar>>>,
    pub trips: Vec<Box<dyn StreamingValidator<Trip>>>,
    pub stop_times: Vec<Box<dyn StreamingValidator<StopTime>>>,
    pub frequencies: Vec<Box<dyn StreamingValidator<Frequency>>>,
    pub transfers: Vec<Box<dyn StreamingValidator<Transfer>>>,
    pub shape_points: Vec<Box<dyn StreamingValidator<ShapePoint>>>,
}

impl StreamingValidators {
    /// Every streaming validator, configured
    pub fn new(config: &ValidatorConfig) -> Self {
        Self {
            calendars: vec![Box::new(CalendarValidator::new(config))],
            trips: vec![Box::new(TripValidator)],
            stop_times: vec![Box::new(StopTimeValidator)],
            frequencies: vec![Box::new(FrequencyValidator::new(config))],
            transfers: vec![Box::new(TransferValidator::new(config))],
            shape_points: vec![Box::new(ShapePointValidator)],
        }
    }
}

/// Every DAO validator, configured
pub fn dao_validators(config: &ValidatorConfig) -> Vec<Box<dyn DaoValidator>> {
    vec![
        Box::new(ReferencesValidator),
        Box::new(CalendarCoverageValidator::new(config)),
        Box::new(UnusedObjectsValidator::new(config)),
        Box::new(TripTimesValidator),
    ]
}

/// A validator and its options, for `--list-validators`
pub struct ValidatorDescription {
    pub name: &'static str,
    pub streaming: bool,
    pub description: &'static str,
    pub options: &'static [OptionSpec],
}

/// Every validator
pub fn validator_descriptions() -> Vec<ValidatorDescription> {
    vec![
        ValidatorDescription {
            name: CalendarValidator::NAME,
            streaming: true,
            description: "Date range and week days of calendar.txt",
            options: CalendarValidator::OPTIONS,
        },
        ValidatorDescription {
            name: TripValidator::NAME,
            streaming: true,
            description: "Routes, services and shapes of trips.txt",
            options: &[],
        },
        ValidatorDescription {
            name: StopTimeValidator::NAME,
            streaming: true,
            description: "Stops, times and distances of stop_times.txt",
            options: &[],
        },
        ValidatorDescription {
            name: FrequencyValidator::NAME,
            streaming: true,
            description: "Trips, periods and headways of frequencies.txt",
            options: FrequencyValidator::OPTIONS,
        },
        ValidatorDescription {
            name: TransferValidator::NAME,
            streaming: true,
            description: "References, types and times of transfers.txt",
            options: TransferValidator::OPTIONS,
        },
        ValidatorDescription {
            name: ShapePointValidator::NAME,
            streaming: true,
            description: "Coordinates and distances of shapes.txt",
            options: &[],
        },
        ValidatorDescription {
            name: "references",
            streaming: false,
            description: "References that can only be checked once everything is loaded",
            options: &[],
        },
        ValidatorDescription {
            name: CalendarCoverageValidator::NAME,
            streaming: false,
            description: "Dates covered by the services",
            options: CalendarCoverageValidator::OPTIONS,
        },
        ValidatorDescription {
            name: UnusedObjectsValidator::NAME,
            streaming: false,
            description: "Routes and stops never used",
            options: UnusedObjectsValidator::OPTIONS,
        },
        ValidatorDescription {
            name: "trip_times",
            streaming: false,
            description: "Sequence and times of the stop times of each trip",
            options: &[],
        },
    ]
}
