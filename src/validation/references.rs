//! References that can only be checked once the whole feed is loaded
use super::{invalid_reference, DaoValidator};
use crate::report::{IssueKind, ReportIssue, ReportSink};
use gtfs_model::{Agency, Id, Record, SourceRef, Stop, Trip, Zone};
use gtfs_store::IndexedReadOnlyDao;
use rustc_hash::FxHashSet;

pub struct ReferencesValidator;

impl ReferencesValidator {
    fn check_stops(&self, dao: &dyn IndexedReadOnlyDao, report: &dyn ReportSink) {
        for stop in dao.stops() {
            if let Some(parent_id) = &stop.parent_station {
                if dao.get_stop(parent_id).is_none() {
                    report.report(
                        invalid_reference("parent_station", parent_id, Stop::TABLE_NAME)
                            .at(stop.source_ref()),
                    );
                }
            }
            if let Some(level_id) = &stop.level_id {
                if dao.get_level(level_id).is_none() {
                    report.report(
                        invalid_reference("level_id", level_id, "levels.txt").at(stop.source_ref()),
                    );
                }
            }
        }
    }

    /// Stop times are loaded after trips, but their trip is only checked here, once per trip
    fn check_stop_times(&self, dao: &dyn IndexedReadOnlyDao, report: &dyn ReportSink) {
        let mut with_stop_times = FxHashSet::default();
        for trip_id in dao.trip_ids_with_stop_times() {
            if dao.get_trip(&trip_id).is_none() {
                let stop_times = dao.stop_times_of(&trip_id);
                let mut issue = invalid_reference("trip_id", &trip_id, Trip::TABLE_NAME);
                if let Some(first) = stop_times.iter().min_by_key(|st| st.line) {
                    issue = issue.at(first.source_ref());
                }
                report.report(issue);
            }
            with_stop_times.insert(trip_id);
        }
        for trip in dao.trips() {
            if !with_stop_times.contains(&trip.id) {
                report.report(
                    ReportIssue::new(IssueKind::TripWithoutStopTimes, "trip without stop times")
                        .at(trip.source_ref())
                        .value(trip.id.as_str()),
                );
            }
        }
    }

    fn check_agencies(&self, dao: &dyn IndexedReadOnlyDao, report: &dyn ReportSink) {
        let several = dao.agencies().nth(1).is_some();
        let check = |agency_id: Option<&Id<Agency>>, at: SourceRef| match agency_id {
            Some(agency_id) if dao.get_agency(Some(agency_id)).is_none() => report.report(
                invalid_reference("agency_id", agency_id, Agency::TABLE_NAME).at(at),
            ),
            None if several => report.report(
                ReportIssue::new(
                    IssueKind::MissingMandatoryValue,
                    "agency_id is mandatory when there are several agencies",
                )
                .at(at)
                .field("agency_id"),
            ),
            _ => {}
        };
        for route in dao.routes() {
            check(route.agency_id.as_ref(), route.source_ref());
        }
        for fare in dao.fare_attributes() {
            check(fare.agency_id.as_ref(), fare.source_ref());
        }
    }

    fn check_fare_rules(&self, dao: &dyn IndexedReadOnlyDao, report: &dyn ReportSink) {
        let zones: FxHashSet<Id<Zone>> = dao.stops().filter_map(|s| s.zone_id.clone()).collect();
        for rule in dao.fare_rules() {
            if let Some(fare_id) = &rule.fare_id {
                if dao.get_fare_attribute(fare_id).is_none() {
                    report.report(
                        invalid_reference("fare_id", fare_id, "fare_attributes.txt")
                            .at(rule.source_ref()),
                    );
                }
            }
            if let Some(route_id) = &rule.route_id {
                if dao.get_route(route_id).is_none() {
                    report.report(
                        invalid_reference("route_id", route_id, "routes.txt").at(rule.source_ref()),
                    );
                }
            }
            for (field, zone_id) in [
                ("origin_id", &rule.origin_id),
                ("destination_id", &rule.destination_id),
                ("contains_id", &rule.contains_id),
            ] {
                if let Some(zone_id) = zone_id {
                    if !zones.contains(zone_id) {
                        report.report(
                            invalid_reference(field, zone_id, "the zone_id of stops.txt")
                                .at(rule.source_ref()),
                        );
                    }
                }
            }
        }
    }

    fn check_attributions(&self, dao: &dyn IndexedReadOnlyDao, report: &dyn ReportSink) {
        for attribution in dao.attributions() {
            let at = attribution.source_ref();
            if let Some(agency_id) = &attribution.agency_id {
                if dao.get_agency(Some(agency_id)).is_none() {
                    report.report(invalid_reference("agency_id", agency_id, "agency.txt").at(at));
                }
            }
            if let Some(route_id) = &attribution.route_id {
                if dao.get_route(route_id).is_none() {
                    report.report(invalid_reference("route_id", route_id, "routes.txt").at(at));
                }
            }
            if let Some(trip_id) = &attribution.trip_id {
                if dao.get_trip(trip_id).is_none() {
                    report.report(invalid_reference("trip_id", trip_id, "trips.txt").at(at));
                }
            }
        }
    }

    fn check_pathways(&self, dao: &dyn IndexedReadOnlyDao, report: &dyn ReportSink) {
        for pathway in dao.pathways() {
            for (field, stop_id) in [
                ("from_stop_id", &pathway.from_stop_id),
                ("to_stop_id", &pathway.to_stop_id),
            ] {
                if let Some(stop_id) = stop_id {
                    if dao.get_stop(stop_id).is_none() {
                        report.report(
                            invalid_reference(field, stop_id, Stop::TABLE_NAME)
                                .at(pathway.source_ref()),
                        );
                    }
                }
            }
        }
    }
}

impl DaoValidator for ReferencesValidator {
    fn name(&self) -> &'static str {
        "references"
    }

    fn validate(
        &self,
        dao: &dyn IndexedReadOnlyDao,
        report: &dyn ReportSink,
    ) -> anyhow::Result<()> {
        self.check_stops(dao, report);
        self.check_stop_times(dao, report);
        self.check_agencies(dao, report);
        self.check_fare_rules(dao, report);
        self.check_attributions(dao, report);
        self.check_pathways(dao, report);
        Ok(())
    }
}
