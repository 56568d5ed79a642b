//! Validators run on each record while the feed is loaded
use super::{invalid_reference, StreamingContext, StreamingValidator};
use crate::configuration::{OptionKind, OptionSpec, ValidatorConfig};
use crate::report::{IssueKind, ReportIssue, Severity};
use chrono::{Datelike, NaiveDate};
use gtfs_model::{
    Calendar, Frequency, Id, LocationType, PickupDropOffType, Record, Route, ShapePoint, Stop,
    StopTime, Transfer, TransferType, Trip,
};

fn option_key(component: &str, option: &str) -> String {
    format!("{}.{}", component, option)
}

/// Date range and week days of a calendar
pub struct CalendarValidator {
    min_year: i32,
    max_year: i32,
}

impl CalendarValidator {
    pub const NAME: &'static str = "calendar";
    pub const OPTIONS: &'static [OptionSpec] = &[
        OptionSpec {
            name: "min_year_in_the_past",
            kind: OptionKind::Integer,
            default: "1980",
            description: "Dates before this year are reported",
        },
        OptionSpec {
            name: "max_year_in_the_future",
            kind: OptionKind::Integer,
            default: "2100",
            description: "Dates after this year are reported",
        },
    ];

    pub fn new(config: &ValidatorConfig) -> Self {
        Self {
            min_year: config.integer(&option_key(Self::NAME, "min_year_in_the_past"), 1980) as i32,
            max_year: config.integer(&option_key(Self::NAME, "max_year_in_the_future"), 2100)
                as i32,
        }
    }

    fn check_year(&self, date: Option<NaiveDate>, field: &'static str, context: &StreamingContext) {
        let Some(date) = date else {
            return;
        };
        let message = if date.year() < self.min_year {
            "date too far in the past"
        } else if date.year() > self.max_year {
            "date too far in the future"
        } else {
            return;
        };
        context.report(
            ReportIssue::new(IssueKind::InvalidFieldValue, message)
                .field(field)
                .value(date.to_string()),
        );
    }
}

impl StreamingValidator<Calendar> for CalendarValidator {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, calendar: &Calendar, context: &StreamingContext<'_>) {
        if let (Some(start), Some(end)) = (calendar.start_date, calendar.end_date) {
            if start > end {
                context.report(
                    ReportIssue::new(
                        IssueKind::InvalidFieldValue,
                        "end date should be on or after the start date",
                    )
                    .field("end_date")
                    .value(end.to_string()),
                );
            }
        }
        self.check_year(calendar.start_date, "start_date", context);
        self.check_year(calendar.end_date, "end_date", context);

        // calendar_dates.txt is not loaded yet, it may still add dates
        if !calendar.has_active_weekday() {
            context.report(
                ReportIssue::new(
                    IssueKind::InvalidFieldValue,
                    "calendar is not active any day of the week",
                )
                .with_severity(Severity::Warning)
                .fields(&[
                    "monday",
                    "tuesday",
                    "wednesday",
                    "thursday",
                    "friday",
                    "saturday",
                    "sunday",
                ]),
            );
        }
    }
}

/// Route, service and shape of a trip
pub struct TripValidator;

impl TripValidator {
    pub const NAME: &'static str = "trip";
}

impl StreamingValidator<Trip> for TripValidator {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, trip: &Trip, context: &StreamingContext<'_>) {
        let dao = context.dao;
        if let Some(route_id) = &trip.route_id {
            if dao.get_route(route_id).is_none() {
                context.report(invalid_reference("route_id", route_id, Route::TABLE_NAME));
            }
        }
        if let Some(service_id) = &trip.service_id {
            if dao.get_calendar(service_id).is_none()
                && dao.calendar_dates_of(service_id).is_empty()
            {
                context.report(invalid_reference(
                    "service_id",
                    service_id,
                    "calendar.txt or calendar_dates.txt",
                ));
            }
        }
        if let Some(shape_id) = &trip.shape_id {
            if !dao.has_shape(shape_id) {
                context.report(invalid_reference("shape_id", shape_id, ShapePoint::TABLE_NAME));
            }
        }
    }
}

/// Stop, times and distance of a stop time
///
/// The trip is checked once everything is loaded, see the references validator.
pub struct StopTimeValidator;

impl StopTimeValidator {
    pub const NAME: &'static str = "stop_time";
}

impl StreamingValidator<StopTime> for StopTimeValidator {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, stop_time: &StopTime, context: &StreamingContext<'_>) {
        if let Some(stop_id) = &stop_time.stop_id {
            match context.dao.get_stop(stop_id) {
                None => context.report(invalid_reference("stop_id", stop_id, Stop::TABLE_NAME)),
                Some(stop)
                    if !matches!(
                        stop.location_type,
                        LocationType::StopPoint | LocationType::BoardingArea
                    ) =>
                {
                    context.report(
                        ReportIssue::new(
                            IssueKind::InvalidFieldValue,
                            "a stop time must be at a stop or a boarding area",
                        )
                        .field("stop_id")
                        .value(stop_id.as_str()),
                    )
                }
                Some(_) => {}
            }
        }

        match (stop_time.arrival_time, stop_time.departure_time) {
            (Some(arrival), Some(departure)) if arrival > departure => context.report(
                ReportIssue::new(IssueKind::TimeTravel, "departure before arrival")
                    .fields(&["arrival_time", "departure_time"])
                    .value(format!("{} > {}", arrival, departure)),
            ),
            (Some(_), None) => context.report(
                ReportIssue::new(IssueKind::MissingMandatoryValue, "arrival without departure")
                    .field("departure_time"),
            ),
            (None, Some(_)) => context.report(
                ReportIssue::new(IssueKind::MissingMandatoryValue, "departure without arrival")
                    .field("arrival_time"),
            ),
            (None, None) if context.source.get("timepoint") == Some("1") => context
                .report(
                    ReportIssue::new(
                        IssueKind::MissingMandatoryValue,
                        "an exact timepoint needs its times",
                    )
                    .fields(&["arrival_time", "departure_time"]),
                ),
            _ => {}
        }

        if stop_time.pickup_type == PickupDropOffType::NotAvailable
            && stop_time.drop_off_type == PickupDropOffType::NotAvailable
        {
            context.report(
                ReportIssue::new(IssueKind::InvalidFieldValue, "neither pickup nor drop off")
                    .with_severity(Severity::Warning)
                    .fields(&["pickup_type", "drop_off_type"]),
            );
        }

        if let Some(distance) = stop_time.shape_dist_traveled {
            if distance < 0.0 {
                context.report(
                    ReportIssue::new(IssueKind::InvalidFieldValue, "negative distance")
                        .field("shape_dist_traveled")
                        .value(distance.to_string()),
                );
            }
        }
    }
}

/// Trip, period and headway of a frequency
pub struct FrequencyValidator {
    min_headway_secs: u32,
    max_headway_secs: u32,
}

impl FrequencyValidator {
    pub const NAME: &'static str = "frequency";
    pub const OPTIONS: &'static [OptionSpec] = &[
        OptionSpec {
            name: "min_headway_secs",
            kind: OptionKind::Integer,
            default: "60",
            description: "Headways below this number of seconds are reported",
        },
        OptionSpec {
            name: "max_headway_secs",
            kind: OptionKind::Integer,
            default: "21600",
            description: "Headways above this number of seconds are reported",
        },
    ];

    pub fn new(config: &ValidatorConfig) -> Self {
        Self {
            min_headway_secs: config
                .integer(&option_key(Self::NAME, "min_headway_secs"), 60)
                .max(0) as u32,
            max_headway_secs: config
                .integer(&option_key(Self::NAME, "max_headway_secs"), 6 * 3600)
                .max(0) as u32,
        }
    }
}

impl StreamingValidator<Frequency> for FrequencyValidator {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, frequency: &Frequency, context: &StreamingContext<'_>) {
        if context.dao.get_trip(&frequency.trip_id).is_none() {
            context.report(invalid_reference(
                "trip_id",
                &frequency.trip_id,
                Trip::TABLE_NAME,
            ));
        }
        if let (Some(start), Some(end)) = (frequency.start_time, frequency.end_time) {
            if start >= end {
                context.report(
                    ReportIssue::new(IssueKind::InvalidFieldValue, "end time should be after start time")
                        .fields(&["start_time", "end_time"])
                        .value(format!("{} - {}", start, end)),
                );
            }
        }
        if let Some(headway) = frequency.headway_secs {
            if headway < self.min_headway_secs || headway > self.max_headway_secs {
                context.report(
                    ReportIssue::new(
                        IssueKind::InvalidFieldValue,
                        format!(
                            "headway out of [{}, {}] seconds",
                            self.min_headway_secs, self.max_headway_secs
                        ),
                    )
                    .with_severity(Severity::Warning)
                    .field("headway_secs")
                    .value(headway.to_string()),
                );
            }
        }
    }
}

/// References, type and time of a transfer
pub struct TransferValidator {
    max_time_warning: u32,
    max_time_error: u32,
}

impl TransferValidator {
    pub const NAME: &'static str = "transfer";
    pub const OPTIONS: &'static [OptionSpec] = &[
        OptionSpec {
            name: "max_transfer_time_warning",
            kind: OptionKind::Integer,
            default: "10800",
            description: "Minimum transfer time, in seconds, above which a warning is reported (0 to disable)",
        },
        OptionSpec {
            name: "max_transfer_time_error",
            kind: OptionKind::Integer,
            default: "86400",
            description: "Minimum transfer time, in seconds, above which an error is reported (0 to disable)",
        },
    ];

    pub fn new(config: &ValidatorConfig) -> Self {
        Self {
            max_time_warning: config
                .integer(&option_key(Self::NAME, "max_transfer_time_warning"), 3 * 3600)
                .max(0) as u32,
            max_time_error: config
                .integer(&option_key(Self::NAME, "max_transfer_time_error"), 24 * 3600)
                .max(0) as u32,
        }
    }

    fn check_stop(&self, field: &'static str, stop_id: Option<&Id<Stop>>, context: &StreamingContext) {
        let Some(stop_id) = stop_id else {
            return;
        };
        match context.dao.get_stop(stop_id) {
            None => context.report(invalid_reference(field, stop_id, Stop::TABLE_NAME)),
            Some(stop)
                if !matches!(
                    stop.location_type,
                    LocationType::StopPoint | LocationType::StopArea
                ) =>
            {
                context.report(
                    ReportIssue::new(
                        IssueKind::InvalidFieldValue,
                        "a transfer must be between stops or stations",
                    )
                    .field(field)
                    .value(stop_id.as_str()),
                )
            }
            Some(_) => {}
        }
    }
}

impl StreamingValidator<Transfer> for TransferValidator {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, transfer: &Transfer, context: &StreamingContext<'_>) {
        let dao = context.dao;
        self.check_stop("from_stop_id", transfer.from_stop_id.as_ref(), context);
        self.check_stop("to_stop_id", transfer.to_stop_id.as_ref(), context);
        for (field, route_id) in [
            ("from_route_id", &transfer.from_route_id),
            ("to_route_id", &transfer.to_route_id),
        ] {
            if let Some(route_id) = route_id {
                if dao.get_route(route_id).is_none() {
                    context.report(invalid_reference(field, route_id, Route::TABLE_NAME));
                }
            }
        }
        for (field, trip_id) in [
            ("from_trip_id", &transfer.from_trip_id),
            ("to_trip_id", &transfer.to_trip_id),
        ] {
            if let Some(trip_id) = trip_id {
                if dao.get_trip(trip_id).is_none() {
                    context.report(invalid_reference(field, trip_id, Trip::TABLE_NAME));
                }
            }
        }

        if matches!(
            transfer.transfer_type,
            TransferType::StayOnBoard | TransferType::MustAlight
        ) && (transfer.from_trip_id.is_none() || transfer.to_trip_id.is_none())
        {
            context.report(
                ReportIssue::new(
                    IssueKind::MissingMandatoryValue,
                    "in-seat transfers need both trips",
                )
                .fields(&["from_trip_id", "to_trip_id"]),
            );
        }

        match (transfer.transfer_type, transfer.min_transfer_time) {
            (TransferType::MinTime, None) => context.report(
                ReportIssue::new(
                    IssueKind::MissingMandatoryValue,
                    "a minimum time transfer needs its time",
                )
                .field("min_transfer_time"),
            ),
            (TransferType::MinTime, Some(time)) => {
                let severity = if self.max_time_error > 0 && time > self.max_time_error {
                    Some(Severity::Error)
                } else if self.max_time_warning > 0 && time > self.max_time_warning {
                    Some(Severity::Warning)
                } else {
                    None
                };
                if let Some(severity) = severity {
                    context.report(
                        ReportIssue::new(IssueKind::InvalidFieldValue, "suspiciously large time")
                            .with_severity(severity)
                            .field("min_transfer_time")
                            .value(time.to_string()),
                    );
                }
            }
            (_, Some(time)) => context.report(
                ReportIssue::new(
                    IssueKind::UselessValue,
                    "only used with transfer_type=2",
                )
                .field("min_transfer_time")
                .value(time.to_string()),
            ),
            (_, None) => {}
        }
    }
}

/// Coordinates and distance of a shape point
pub struct ShapePointValidator;

impl ShapePointValidator {
    pub const NAME: &'static str = "shape_point";
}

impl StreamingValidator<ShapePoint> for ShapePointValidator {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, point: &ShapePoint, context: &StreamingContext<'_>) {
        for (field, value, limit) in [
            ("shape_pt_lat", point.latitude, 90.0),
            ("shape_pt_lon", point.longitude, 180.0),
        ] {
            if let Some(value) = value {
                if value.abs() > limit {
                    context.report(
                        ReportIssue::new(
                            IssueKind::InvalidFieldValue,
                            format!("coordinate out of [-{}, {}]", limit, limit),
                        )
                        .field(field)
                        .value(value.to_string()),
                    );
                }
            }
        }
        if point.latitude == Some(0.0) && point.longitude == Some(0.0) {
            context.report(
                ReportIssue::new(IssueKind::InvalidFieldValue, "point at (0, 0)")
                    .with_severity(Severity::Warning)
                    .fields(&["shape_pt_lat", "shape_pt_lon"]),
            );
        }
        if let Some(distance) = point.dist_traveled {
            if distance < 0.0 {
                context.report(
                    ReportIssue::new(IssueKind::InvalidFieldValue, "negative distance")
                        .field("shape_dist_traveled")
                        .value(distance.to_string()),
                );
            }
        }
    }
}
