use chrono::NaiveDate;
use gtfs_model::{Calendar, CalendarDate, Exception, Id, Trip};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

/// Dates on which each service runs, computed once every calendar table is loaded
#[derive(Debug, Default)]
pub struct CalendarIndex {
    active_dates: FxHashMap<Id<Calendar>, Vec<NaiveDate>>,
    trips: FxHashMap<Id<Calendar>, Vec<Id<Trip>>>,
    trips_by_date: FxHashMap<NaiveDate, usize>,
    service_dates: Vec<NaiveDate>,
}

impl CalendarIndex {
    /// Applies the exceptions of `calendar_dates.txt` on the weekdays of `calendar.txt`
    ///
    /// A service can be defined by either of the tables or both. Exceptions are applied in
    /// file order, so the last one wins for a given date.
    pub fn build<'a>(
        calendars: impl Iterator<Item = &'a Calendar>,
        calendar_dates: impl Iterator<Item = (&'a Id<Calendar>, &'a [CalendarDate])>,
        trips: impl Iterator<Item = &'a Trip>,
    ) -> Self {
        let mut dates: FxHashMap<Id<Calendar>, BTreeSet<NaiveDate>> = FxHashMap::default();
        for calendar in calendars {
            dates
                .entry(calendar.id.clone())
                .or_default()
                .extend(calendar.weekday_dates());
        }
        for (service_id, exceptions) in calendar_dates {
            let active = dates.entry(service_id.clone()).or_default();
            for exception in exceptions {
                match (exception.exception_type, exception.date) {
                    (Exception::Added, Some(date)) => {
                        active.insert(date);
                    }
                    (Exception::Deleted, Some(date)) => {
                        active.remove(&date);
                    }
                    _ => {}
                }
            }
        }

        let mut trips_of_service: FxHashMap<Id<Calendar>, Vec<Id<Trip>>> = FxHashMap::default();
        for trip in trips {
            if let Some(service_id) = &trip.service_id {
                trips_of_service
                    .entry(service_id.clone())
                    .or_default()
                    .push(trip.id.clone());
            }
        }

        let mut trips_by_date: FxHashMap<NaiveDate, usize> = FxHashMap::default();
        let mut all_dates = BTreeSet::new();
        for (service_id, active) in &dates {
            let trip_count = trips_of_service.get(service_id).map_or(0, Vec::len);
            for date in active {
                all_dates.insert(*date);
                *trips_by_date.entry(*date).or_default() += trip_count;
            }
        }

        Self {
            active_dates: dates
                .into_iter()
                .map(|(id, active)| (id, active.into_iter().collect()))
                .collect(),
            trips: trips_of_service,
            trips_by_date,
            service_dates: all_dates.into_iter().collect(),
        }
    }

    /// Every service id of `calendar.txt` and `calendar_dates.txt`
    pub fn service_ids(&self) -> impl Iterator<Item = &Id<Calendar>> {
        self.active_dates.keys()
    }

    /// True if the service is defined by one of the calendar tables
    pub fn has_service(&self, service_id: &Id<Calendar>) -> bool {
        self.active_dates.contains_key(service_id)
    }

    /// Sorted dates on which the service runs
    pub fn active_dates(&self, service_id: &Id<Calendar>) -> &[NaiveDate] {
        self.active_dates
            .get(service_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns true if the service runs on that date
    pub fn runs_on_date(&self, service_id: &Id<Calendar>, date: NaiveDate) -> bool {
        self.active_dates(service_id).binary_search(&date).is_ok()
    }

    /// Trips using the service
    pub fn trips_of(&self, service_id: &Id<Calendar>) -> &[Id<Trip>] {
        self.trips
            .get(service_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of trips running on a date
    pub fn trip_count_on(&self, date: NaiveDate) -> usize {
        self.trips_by_date.get(&date).copied().unwrap_or_default()
    }

    /// Sorted dates with at least one active service
    pub fn service_dates(&self) -> &[NaiveDate] {
        &self.service_dates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gtfs_model::{Availability, BikesAllowedType, IdCache};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn trip(cache: &IdCache, id: &str, service: &str) -> Trip {
        Trip {
            id: cache.intern(id).unwrap(),
            service_id: cache.intern(service),
            route_id: cache.intern("R1"),
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

    #[test]
    fn exceptions_are_applied() {
        let cache = IdCache::new();
        // 2024-01-01 is a monday
        let weekdays = Calendar {
            id: cache.intern("WEEK").unwrap(),
            monday: true,
            tuesday: true,
            wednesday: true,
            thursday: true,
            friday: true,
            saturday: false,
            sunday: false,
            start_date: Some(date(1)),
            end_date: Some(date(7)),
            line: 2,
        };
        let exception = |service: &str, d, exception_type| CalendarDate {
            service_id: cache.intern(service).unwrap(),
            date: Some(date(d)),
            exception_type,
            line: 2,
        };
        let week_exceptions = vec![
            exception("WEEK", 2, Exception::Deleted),
            exception("WEEK", 6, Exception::Added),
        ];
        let special = vec![exception("SPECIAL", 7, Exception::Added)];
        let week_id = weekdays.id.clone();
        let special_id: Id<Calendar> = cache.intern("SPECIAL").unwrap();
        let trips = vec![
            trip(&cache, "T1", "WEEK"),
            trip(&cache, "T2", "WEEK"),
            trip(&cache, "T3", "SPECIAL"),
        ];

        let index = CalendarIndex::build(
            std::iter::once(&weekdays),
            vec![
                (&week_id, week_exceptions.as_slice()),
                (&special_id, special.as_slice()),
            ]
            .into_iter(),
            trips.iter(),
        );

        assert_eq!(
            &[date(1), date(3), date(4), date(5), date(6)],
            index.active_dates(&week_id)
        );
        assert!(index.runs_on_date(&special_id, date(7)));
        assert!(!index.runs_on_date(&week_id, date(2)));
        assert_eq!(2, index.trips_of(&week_id).len());
        assert_eq!(2, index.trip_count_on(date(3)));
        assert_eq!(1, index.trip_count_on(date(7)));
        assert_eq!(0, index.trip_count_on(date(2)));
        assert_eq!(6, index.service_dates().len());
        assert_eq!(2, index.service_ids().count());
        assert!(index.active_dates(&cache.intern("NONE").unwrap()).is_empty());
    }
}
