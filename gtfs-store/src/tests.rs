use crate::*;
use chrono::NaiveDate;
use gtfs_model::*;

fn context(table: &'static str, line: u64) -> SourceContext<'static> {
    SourceContext::new(SourceRef::new(table, line))
}

fn stop_time(dao: &InMemoryDao, trip: &str, seq: u32, line: u64) -> StopTime {
    let ids = AppendableDao::id_cache(dao);
    StopTime {
        trip_id: ids.intern(trip).unwrap(),
        arrival_time: Some(LogicalTime::from_hms(8, seq, 0)),
        departure_time: Some(LogicalTime::from_hms(8, seq, 30)),
        stop_id: ids.intern(&format!("S{}", seq)),
        stop_sequence: Some(seq),
        stop_headsign: None,
        pickup_type: PickupDropOffType::Regular,
        drop_off_type: PickupDropOffType::Regular,
        shape_dist_traveled: None,
        timepoint: TimepointType::Exact,
        line,
    }
}

fn trip(dao: &InMemoryDao, id: &str) -> Trip {
    let ids = AppendableDao::id_cache(dao);
    Trip {
        id: ids.intern(id).unwrap(),
        service_id: ids.intern("WEEK"),
        route_id: ids.intern("R1"),
        shape_id: None,
        trip_headsign: None,
        trip_short_name: None,
        direction_id: None,
        block_id: None,
        wheelchair_accessible: Availability::InformationNotAvailable,
        bikes_allowed: BikesAllowedType::NoBikeInfo,
        line: 2,
    }
}

fn calendar_date(dao: &InMemoryDao, day: u32, exception_type: Exception, line: u64) -> CalendarDate {
    CalendarDate {
        service_id: AppendableDao::id_cache(dao).intern("WEEK").unwrap(),
        date: NaiveDate::from_ymd_opt(2024, 3, day),
        exception_type,
        line,
    }
}

#[test]
fn interleaved_stop_times_are_grouped_at_close() {
    let mut dao = InMemoryDao::default();
    let t1 = trip(&dao, "T1");
    dao.add_trip(t1, &context("trips.txt", 2));
    let rows = [("T1", 3), ("T2", 2), ("T1", 1), ("T2", 1), ("T1", 2)];
    for (line, (trip_id, seq)) in rows.into_iter().enumerate() {
        let st = stop_time(&dao, trip_id, seq, line as u64 + 2);
        dao.add_stop_time(st, &context("stop_times.txt", line as u64 + 2));
    }

    let t1: Id<Trip> = Id::detached("T1");
    assert!(!dao.is_closed());
    assert!(dao.stop_times_of(&t1).is_empty());
    assert!(dao.get_trip(&t1).is_some());

    dao.close();
    assert!(dao.is_closed());
    let sequences: Vec<_> = dao
        .stop_times_of(&t1)
        .iter()
        .map(|st| st.stop_sequence)
        .collect();
    assert_eq!(vec![Some(1), Some(2), Some(3)], sequences);
    assert_eq!(5, dao.stop_time_count());
    let mut parents = dao.trip_ids_with_stop_times();
    parents.sort();
    assert_eq!(vec![t1.clone(), Id::detached("T2")], parents);
    assert!(dao.get_trip(&Id::detached("T2")).is_none());
    assert!(dao.stop_times_of(&Id::detached("T3")).is_empty());
}

#[test]
fn duplicated_exceptions_keep_the_last_one() {
    let mut dao = InMemoryDao::default();
    let first = calendar_date(&dao, 4, Exception::Added, 2);
    dao.add_calendar_date(first, &context("calendar_dates.txt", 2));
    let other = calendar_date(&dao, 5, Exception::Added, 3);
    dao.add_calendar_date(other, &context("calendar_dates.txt", 3));
    let again = calendar_date(&dao, 4, Exception::Deleted, 4);
    dao.add_calendar_date(again, &context("calendar_dates.txt", 4));
    dao.close();

    let week = Id::detached("WEEK");
    let dates = dao.calendar_dates_of(&week);
    assert_eq!(2, dates.len());
    assert_eq!(Exception::Deleted, dates[0].exception_type);
    assert_eq!(4, dates[0].line);
    assert_eq!(
        &[NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()],
        dao.active_dates_of(&week)
    );
}

#[test]
fn closing_twice_changes_nothing() {
    let mut dao = InMemoryDao::default();
    let t1 = trip(&dao, "T1");
    dao.add_trip(t1, &context("trips.txt", 2));
    let st = stop_time(&dao, "T1", 1, 2);
    dao.add_stop_time(st, &context("stop_times.txt", 2));
    dao.close();
    dao.close();
    assert_eq!(1, dao.stop_times_of(&Id::detached("T1")).len());

    // ignored once closed
    let late = stop_time(&dao, "T1", 2, 3);
    dao.add_stop_time(late, &context("stop_times.txt", 3));
    let t2 = trip(&dao, "T2");
    dao.add_trip(t2, &context("trips.txt", 3));
    assert_eq!(1, dao.stop_time_count());
    assert!(dao.get_trip(&Id::detached("T2")).is_none());
}

#[test]
fn closed_dao_is_shared_between_threads() {
    let mut dao = InMemoryDao::new(DaoOptions {
        stop_times: StoreOptions {
            mode: StoreMode::Packed,
            max_interleaving: 2,
            max_late_recurrences: 10,
        },
        ..DaoOptions::default()
    });
    for t in 0..10 {
        for seq in (0..4).rev() {
            let st = stop_time(&dao, &format!("T{}", t), seq, 2);
            dao.add_stop_time(st, &context("stop_times.txt", 2));
        }
    }
    dao.close();
    assert_eq!(8, dao.stop_times_stats().forced_flushes);

    let view: &dyn IndexedReadOnlyDao = &dao;
    let totals: Vec<usize> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(move || {
                    view.trip_ids_with_stop_times()
                        .iter()
                        .map(|t| view.stop_times_of(t).len())
                        .sum::<usize>()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(vec![40; 4], totals);
}
