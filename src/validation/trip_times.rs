use super::DaoValidator;
use crate::report::{IssueKind, ReportIssue, ReportSink};
use gtfs_model::{Id, LogicalTime, Record, StopTime, Trip};
use gtfs_store::IndexedReadOnlyDao;

/// Walks the stop times of every trip, in sequence order
pub struct TripTimesValidator;

impl TripTimesValidator {
    fn check_trip(&self, trip_id: &Id<Trip>, stop_times: &[StopTime], report: &dyn ReportSink) {
        let (Some(first), Some(last)) = (stop_times.first(), stop_times.last()) else {
            return;
        };
        if stop_times.len() < 2 {
            report.report(
                ReportIssue::new(IssueKind::TooFewStops, "a trip needs at least two stops")
                    .at(first.source_ref())
                    .value(trip_id.as_str()),
            );
        }

        // A single stop time is both ends
        for stop_time in [first, last].into_iter().take(stop_times.len()) {
            if stop_time.arrival_time.is_none() || stop_time.departure_time.is_none() {
                report.report(
                    ReportIssue::new(
                        IssueKind::MissingTimes,
                        "first and last stops of a trip need their times",
                    )
                    .at(stop_time.source_ref())
                    .fields(&["arrival_time", "departure_time"])
                    .value(trip_id.as_str()),
                );
            }
        }

        for pair in stop_times.windows(2) {
            let (previous, current) = (&pair[0], &pair[1]);
            if previous.stop_sequence.is_some() && previous.stop_sequence == current.stop_sequence {
                report.report(
                    ReportIssue::new(IssueKind::DuplicatedStopSequence, "same stop sequence twice")
                        .at(previous.source_ref())
                        .at(current.source_ref())
                        .field("stop_sequence")
                        .value(format!(
                            "{} {}",
                            trip_id,
                            current.stop_sequence.unwrap_or_default()
                        )),
                );
            }
        }

        // The last time known before each stop time
        let mut reached: Option<(LogicalTime, &StopTime)> = None;
        for stop_time in stop_times {
            let arrival = stop_time.arrival_time.or(stop_time.departure_time);
            if let (Some(arrival), Some((previous_time, previous))) = (arrival, reached) {
                if arrival < previous_time {
                    report.report(
                        ReportIssue::new(IssueKind::TimeTravel, "going back in time")
                            .at(previous.source_ref())
                            .at(stop_time.source_ref())
                            .fields(&["arrival_time", "departure_time"])
                            .value(format!("{} < {}", arrival, previous_time)),
                    );
                }
            }
            if let Some(time) = stop_time.departure_time.or(stop_time.arrival_time) {
                reached = Some((time, stop_time));
            }
        }
    }
}

impl DaoValidator for TripTimesValidator {
    fn name(&self) -> &'static str {
        "trip_times"
    }

    fn validate(
        &self,
        dao: &dyn IndexedReadOnlyDao,
        report: &dyn ReportSink,
    ) -> anyhow::Result<()> {
        let trip_ids = dao.trip_ids_with_stop_times();
        log::debug!("checking the times of {} trips", trip_ids.len());
        for trip_id in &trip_ids {
            let stop_times = dao.stop_times_of(trip_id);
            self.check_trip(trip_id, &stop_times, report);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::InMemoryReport;
    use gtfs_model::IdCache;

    fn stop_time(
        ids: &IdCache,
        line: u64,
        sequence: u32,
        arrival: Option<(u32, u32)>,
        departure: Option<(u32, u32)>,
    ) -> StopTime {
        StopTime {
            trip_id: ids.intern("T1").unwrap(),
            arrival_time: arrival.map(|(h, m)| LogicalTime::from_hms(h, m, 0)),
            departure_time: departure.map(|(h, m)| LogicalTime::from_hms(h, m, 0)),
            stop_id: ids.intern(&format!("S{}", sequence)),
            stop_sequence: Some(sequence),
            stop_headsign: None,
            pickup_type: Default::default(),
            drop_off_type: Default::default(),
            shape_dist_traveled: None,
            timepoint: Default::default(),
            line,
        }
    }

    #[test]
    fn well_formed_trip() {
        let ids = IdCache::new();
        let report = InMemoryReport::new();
        let stop_times = vec![
            stop_time(&ids, 2, 1, Some((8, 0)), Some((8, 0))),
            stop_time(&ids, 3, 2, None, None),
            stop_time(&ids, 4, 3, Some((8, 10)), Some((8, 12))),
            stop_time(&ids, 5, 4, Some((25, 0)), Some((25, 0))),
        ];
        TripTimesValidator.check_trip(&ids.intern("T1").unwrap(), &stop_times, &report);
        assert!(report.issues().is_empty());
    }

    #[test]
    fn every_problem_of_a_trip() {
        let ids = IdCache::new();
        let report = InMemoryReport::new();
        let stop_times = vec![
            stop_time(&ids, 2, 1, None, Some((8, 0))),
            stop_time(&ids, 3, 2, Some((8, 20)), Some((8, 20))),
            stop_time(&ids, 4, 2, Some((8, 10)), Some((8, 10))),
            stop_time(&ids, 5, 3, Some((8, 30)), None),
        ];
        TripTimesValidator.check_trip(&ids.intern("T1").unwrap(), &stop_times, &report);

        assert_eq!(2, report.count(IssueKind::MissingTimes));
        assert_eq!(1, report.count(IssueKind::DuplicatedStopSequence));
        assert_eq!(1, report.count(IssueKind::TimeTravel));
        let time_travel = report
            .issues()
            .into_iter()
            .find(|i| i.kind == IssueKind::TimeTravel)
            .unwrap();
        let lines: Vec<u64> = time_travel.source_refs.iter().map(|r| r.line).collect();
        assert_eq!(vec![3, 4], lines);
    }

    #[test]
    fn single_stop() {
        let ids = IdCache::new();
        let report = InMemoryReport::new();
        let stop_times = vec![stop_time(&ids, 2, 1, None, None)];
        TripTimesValidator.check_trip(&ids.intern("T1").unwrap(), &stop_times, &report);
        assert_eq!(1, report.count(IssueKind::TooFewStops));
        assert_eq!(1, report.count(IssueKind::MissingTimes));
    }
}
