//! Dates covered by the services, and objects nothing uses
use super::DaoValidator;
use crate::configuration::{OptionKind, OptionSpec, ValidatorConfig};
use crate::report::{IssueKind, ReportIssue, ReportSink};
use chrono::NaiveDate;
use gtfs_model::fields::format_date;
use gtfs_model::{Exception, Id, LocationType, Record, Route, Stop};
use gtfs_store::IndexedReadOnlyDao;
use rustc_hash::FxHashSet;

/// Empty calendars, days without service, expired or future feed
pub struct CalendarCoverageValidator {
    check_empty_calendars: bool,
    check_expired: bool,
    expired_cutoff: Option<NaiveDate>,
    check_future: bool,
    future_cutoff: Option<NaiveDate>,
    max_days_without_service: i64,
}

impl CalendarCoverageValidator {
    pub const NAME: &'static str = "calendar_coverage";
    pub const OPTIONS: &'static [OptionSpec] = &[
        OptionSpec {
            name: "check_empty_calendars",
            kind: OptionKind::Bool,
            default: "true",
            description: "Report the services running on no date",
        },
        OptionSpec {
            name: "check_expired",
            kind: OptionKind::Bool,
            default: "true",
            description: "Report a feed whose last service date is past",
        },
        OptionSpec {
            name: "expired_cutoff_date",
            kind: OptionKind::Date,
            default: "today",
            description: "Date before which the last service date is expired",
        },
        OptionSpec {
            name: "check_future",
            kind: OptionKind::Bool,
            default: "true",
            description: "Report a feed whose first service date is to come",
        },
        OptionSpec {
            name: "future_cutoff_date",
            kind: OptionKind::Date,
            default: "today",
            description: "Date after which the first service date is in the future",
        },
        OptionSpec {
            name: "max_days_without_service",
            kind: OptionKind::Integer,
            default: "7",
            description: "Consecutive days without any trip before they are reported",
        },
    ];

    pub fn new(config: &ValidatorConfig) -> Self {
        let key = |option: &str| format!("{}.{}", Self::NAME, option);
        Self {
            check_empty_calendars: config.bool(&key("check_empty_calendars"), true),
            check_expired: config.bool(&key("check_expired"), true),
            expired_cutoff: config.date(&key("expired_cutoff_date")),
            check_future: config.bool(&key("check_future"), true),
            future_cutoff: config.date(&key("future_cutoff_date")),
            max_days_without_service: config.integer(&key("max_days_without_service"), 7),
        }
    }

    fn check_empty_calendars(&self, dao: &dyn IndexedReadOnlyDao, report: &dyn ReportSink) {
        let mut service_ids: Vec<_> = dao.calendar_index().service_ids().cloned().collect();
        service_ids.sort();
        for service_id in service_ids {
            if !dao.active_dates_of(&service_id).is_empty() {
                continue;
            }
            let mut issue = ReportIssue::new(IssueKind::EmptyCalendar, "service never running")
                .value(service_id.as_str());
            if let Some(calendar) = dao.get_calendar(&service_id) {
                issue = issue.at(calendar.source_ref());
            }
            for date in dao.calendar_dates_of(&service_id) {
                issue = issue.at(date.source_ref());
            }
            report.report(issue);
        }
    }

    /// Runs of days without trips between the first and the last service date
    fn check_days_without_service(
        &self,
        dates: &[NaiveDate],
        dao: &dyn IndexedReadOnlyDao,
        report: &dyn ReportSink,
    ) {
        let (Some(&first), Some(&last)) = (dates.first(), dates.last()) else {
            return;
        };
        let mut first_without_service = None;
        let mut days_without_service = 0;
        for date in first.iter_days().take_while(|d| *d <= last) {
            if dao.trip_count_on(date) == 0 {
                first_without_service.get_or_insert(date);
                days_without_service += 1;
                continue;
            }
            if let Some(from) = first_without_service.take() {
                if days_without_service > self.max_days_without_service {
                    report.report(
                        ReportIssue::new(
                            IssueKind::TooManyDaysWithoutService,
                            format!("{} days without service", days_without_service),
                        )
                        .value(format!(
                            "{} - {}",
                            format_date(from),
                            format_date(date.pred_opt().unwrap_or(date))
                        )),
                    );
                }
            }
            days_without_service = 0;
        }
    }

    fn check_never_active(&self, dao: &dyn IndexedReadOnlyDao, report: &dyn ReportSink) {
        for calendar in dao.calendars() {
            let added = dao
                .calendar_dates_of(&calendar.id)
                .iter()
                .any(|d| d.exception_type == Exception::Added);
            if !calendar.has_active_weekday() && !added {
                report.report(
                    ReportIssue::new(
                        IssueKind::InvalidFieldValue,
                        "calendar is not active any day of the week and no date is added",
                    )
                    .at(calendar.source_ref())
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
}

impl DaoValidator for CalendarCoverageValidator {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(
        &self,
        dao: &dyn IndexedReadOnlyDao,
        report: &dyn ReportSink,
    ) -> anyhow::Result<()> {
        if self.check_empty_calendars {
            self.check_empty_calendars(dao, report);
        }

        let dates = dao.service_dates();
        if dates.is_empty() {
            report.report(ReportIssue::new(IssueKind::NoService, "no trip runs on any date"));
        }
        self.check_days_without_service(dates, dao, report);

        let feed_info = dao.feed_info();
        let first = feed_info
            .and_then(|f| f.start_date)
            .or_else(|| dates.first().copied());
        let last = feed_info
            .and_then(|f| f.end_date)
            .or_else(|| dates.last().copied());
        let today = chrono::Local::now().date_naive();
        if let (Some(last), true) = (last, self.check_expired) {
            let cutoff = self.expired_cutoff.unwrap_or(today);
            if last < cutoff {
                report.report(
                    ReportIssue::new(
                        IssueKind::ExpiredFeed,
                        format!("last service date before {}", format_date(cutoff)),
                    )
                    .value(format_date(last)),
                );
            }
        }
        if let (Some(first), true) = (first, self.check_future) {
            let cutoff = self.future_cutoff.unwrap_or(today);
            if first > cutoff {
                report.report(
                    ReportIssue::new(
                        IssueKind::FutureFeed,
                        format!("first service date after {}", format_date(cutoff)),
                    )
                    .value(format_date(first)),
                );
            }
        }

        self.check_never_active(dao, report);
        Ok(())
    }
}

/// Routes without trips, stops without stop times nor children
pub struct UnusedObjectsValidator {
    check_routes: bool,
    check_stops: bool,
}

impl UnusedObjectsValidator {
    pub const NAME: &'static str = "unused_objects";
    pub const OPTIONS: &'static [OptionSpec] = &[
        OptionSpec {
            name: "check_routes",
            kind: OptionKind::Bool,
            default: "true",
            description: "Report the routes without trips",
        },
        OptionSpec {
            name: "check_stops",
            kind: OptionKind::Bool,
            default: "true",
            description: "Report the stops without stop times and the stations without stops",
        },
    ];

    pub fn new(config: &ValidatorConfig) -> Self {
        Self {
            check_routes: config.bool(&format!("{}.check_routes", Self::NAME), true),
            check_stops: config.bool(&format!("{}.check_stops", Self::NAME), true),
        }
    }

    fn unused(id: &str, at: gtfs_model::SourceRef, message: &str) -> ReportIssue {
        ReportIssue::new(IssueKind::UnusedObject, message)
            .at(at)
            .value(id)
    }
}

impl DaoValidator for UnusedObjectsValidator {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(
        &self,
        dao: &dyn IndexedReadOnlyDao,
        report: &dyn ReportSink,
    ) -> anyhow::Result<()> {
        if self.check_routes {
            let used: FxHashSet<&Id<Route>> =
                dao.trips().filter_map(|t| t.route_id.as_ref()).collect();
            for route in dao.routes().filter(|r| !used.contains(&r.id)) {
                report.report(Self::unused(
                    route.id.as_str(),
                    route.source_ref(),
                    "route without trips",
                ));
            }
        }

        if self.check_stops {
            let mut used: FxHashSet<Id<Stop>> = dao
                .stops()
                .filter_map(|s| s.parent_station.clone())
                .collect();
            for trip_id in dao.trip_ids_with_stop_times() {
                used.extend(
                    dao.stop_times_of(&trip_id)
                        .iter()
                        .filter_map(|st| st.stop_id.clone()),
                );
            }
            for stop in dao.stops().filter(|s| !used.contains(&s.id)) {
                let message = match stop.location_type {
                    LocationType::StopPoint => "stop without stop times",
                    LocationType::StopArea => "station without stops",
                    _ => continue,
                };
                report.report(Self::unused(stop.id.as_str(), stop.source_ref(), message));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::InMemoryReport;
    use gtfs_model::{Calendar, SourceContext, SourceRef, Trip};
    use gtfs_store::{AppendableDao, InMemoryDao};

    fn context(table: &'static str, line: u64) -> SourceContext<'static> {
        SourceContext::new(SourceRef::new(table, line))
    }

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    /// Two weekend services in January 2024 and one service without any day
    fn dao() -> InMemoryDao {
        let mut dao = InMemoryDao::default();
        let ids = dao.shared_id_cache();
        let calendar = |id: &str, weekend: bool, line| Calendar {
            id: ids.intern(id).unwrap(),
            monday: false,
            tuesday: false,
            wednesday: false,
            thursday: false,
            friday: false,
            saturday: weekend,
            sunday: weekend,
            start_date: date(2024, 1, 1),
            end_date: date(2024, 1, 31),
            line,
        };
        dao.add_calendar(calendar("WE", true, 2), &context("calendar.txt", 2));
        dao.add_calendar(calendar("NEVER", false, 3), &context("calendar.txt", 3));
        let trip = Trip {
            id: ids.intern("T1").unwrap(),
            service_id: ids.intern("WE"),
            route_id: ids.intern("R1"),
            shape_id: None,
            trip_headsign: None,
            trip_short_name: None,
            direction_id: None,
            block_id: None,
            wheelchair_accessible: Default::default(),
            bikes_allowed: Default::default(),
            line: 2,
        };
        dao.add_trip(trip, &context("trips.txt", 2));
        dao.close();
        dao
    }

    #[test]
    fn weekend_service_in_the_past() {
        let dao = dao();
        let report = InMemoryReport::new();
        let mut config = ValidatorConfig::new();
        config.set("calendar_coverage.max_days_without_service", 4);
        CalendarCoverageValidator::new(&config)
            .validate(&dao, &report)
            .unwrap();

        // January 2024 ends long before today
        assert_eq!(1, report.count(IssueKind::ExpiredFeed));
        assert_eq!(0, report.count(IssueKind::FutureFeed));
        assert_eq!(1, report.count(IssueKind::EmptyCalendar));
        assert_eq!(1, report.count(IssueKind::InvalidFieldValue));
        // Five weekdays between two weekends
        assert_eq!(3, report.count(IssueKind::TooManyDaysWithoutService));
        assert_eq!(0, report.count(IssueKind::NoService));
    }

    #[test]
    fn cutoff_dates_from_the_configuration() {
        let dao = dao();
        let report = InMemoryReport::new();
        let mut config = ValidatorConfig::new();
        config.set("calendar_coverage.expired_cutoff_date", "20240101");
        config.set("calendar_coverage.future_cutoff_date", "20231231");
        config.set("calendar_coverage.check_empty_calendars", false);
        CalendarCoverageValidator::new(&config)
            .validate(&dao, &report)
            .unwrap();
        assert_eq!(0, report.count(IssueKind::ExpiredFeed));
        assert_eq!(1, report.count(IssueKind::FutureFeed));
        assert_eq!(0, report.count(IssueKind::EmptyCalendar));
    }

    #[test]
    fn route_without_trips() {
        let mut dao = InMemoryDao::default();
        let ids = dao.shared_id_cache();
        for (line, id) in [(2, "R1"), (3, "R2")] {
            let route = gtfs_model::Route {
                id: ids.intern(id).unwrap(),
                short_name: Some(id.to_owned()),
                long_name: None,
                desc: None,
                route_type: Default::default(),
                url: None,
                agency_id: None,
                order: None,
                color: Default::default(),
                text_color: Default::default(),
                line,
            };
            dao.add_route(route, &context("routes.txt", line));
        }
        let trip = Trip {
            id: ids.intern("T1").unwrap(),
            service_id: None,
            route_id: ids.intern("R1"),
            shape_id: None,
            trip_headsign: None,
            trip_short_name: None,
            direction_id: None,
            block_id: None,
            wheelchair_accessible: Default::default(),
            bikes_allowed: Default::default(),
            line: 2,
        };
        dao.add_trip(trip, &context("trips.txt", 2));
        dao.close();

        let report = InMemoryReport::new();
        UnusedObjectsValidator::new(&ValidatorConfig::new())
            .validate(&dao, &report)
            .unwrap();
        let issues = report.issues();
        assert_eq!(1, issues.len());
        assert_eq!(Some("R2"), issues[0].value.as_deref());
        assert_eq!(SourceRef::new("routes.txt", 3), issues[0].source_refs[0]);
    }
}
