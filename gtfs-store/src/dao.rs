//! Data access objects: what the loader writes into and what the validators read from
//!
//! The DAO is written by a single thread while loading, then [AppendableDao::close] freezes it.
//! After that, nothing mutates it and it can be read from any number of threads.
use crate::calendar::CalendarIndex;
use crate::grouped::{GroupedStore, StoreOptions, StoreStats};
use crate::SequenceStore;
use chrono::NaiveDate;
use gtfs_model::{
    Agency, Area, Attribution, Calendar, CalendarDate, FareAttribute, FareRule, FareRuleKey,
    FeedInfo, Frequency, Id, IdCache, Level, Pathway, Route, Shape, ShapePoint, SourceContext,
    Stop, StopTime, Transfer, TransferKey, Translation, TranslationKey, Trip,
};
use rustc_hash::{FxHashMap, FxHashSet};
use std::borrow::Cow;
use std::sync::Arc;

/// Settings of the DAO
#[derive(Debug, Clone, Copy, Default)]
pub struct DaoOptions {
    /// Store of the stop times, grouped by trip
    pub stop_times: StoreOptions,
    /// Store of the shape points, grouped by shape
    pub shape_points: StoreOptions,
    /// Logs more statistics when closing
    pub verbose: bool,
}

/// Write side of the DAO, used while loading
///
/// Adding a record with an existing key replaces the previous one. Whoever wants to report the
/// duplicate must look it up before adding.
pub trait AppendableDao {
    /// Interning of the identifiers of this load
    fn id_cache(&self) -> &IdCache;
    /// Sets the single row of `feed_info.txt`
    fn set_feed_info(&mut self, feed_info: FeedInfo, context: &SourceContext);
    /// Adds an agency
    fn add_agency(&mut self, agency: Agency, context: &SourceContext);
    /// Adds a level
    fn add_level(&mut self, level: Level, context: &SourceContext);
    /// Adds a stop
    fn add_stop(&mut self, stop: Stop, context: &SourceContext);
    /// Adds a route
    fn add_route(&mut self, route: Route, context: &SourceContext);
    /// Adds a calendar
    fn add_calendar(&mut self, calendar: Calendar, context: &SourceContext);
    /// Adds a calendar exception, replacing the one of the same service at the same date
    fn add_calendar_date(&mut self, calendar_date: CalendarDate, context: &SourceContext);
    /// Adds a point to its shape
    fn add_shape_point(&mut self, shape_point: ShapePoint, context: &SourceContext);
    /// Adds a trip
    fn add_trip(&mut self, trip: Trip, context: &SourceContext);
    /// Adds a stop time to its trip
    fn add_stop_time(&mut self, stop_time: StopTime, context: &SourceContext);
    /// Adds a frequency, replacing the one of the same trip with the same start time
    fn add_frequency(&mut self, frequency: Frequency, context: &SourceContext);
    /// Adds a transfer
    fn add_transfer(&mut self, transfer: Transfer, context: &SourceContext);
    /// Adds a pathway
    fn add_pathway(&mut self, pathway: Pathway, context: &SourceContext);
    /// Adds a fare
    fn add_fare_attribute(&mut self, fare_attribute: FareAttribute, context: &SourceContext);
    /// Adds a fare rule
    fn add_fare_rule(&mut self, fare_rule: FareRule, context: &SourceContext);
    /// Adds an area
    fn add_area(&mut self, area: Area, context: &SourceContext);
    /// Adds a translation
    fn add_translation(&mut self, translation: Translation, context: &SourceContext);
    /// Adds an attribution
    fn add_attribution(&mut self, attribution: Attribution, context: &SourceContext);
    /// Seals the grouped stores and builds the indices; to be called once, after the last table
    fn close(&mut self);
}

/// Read side of the DAO
///
/// While loading, only the tables already loaded are visible and the children of the grouped
/// stores are empty.
pub trait ReadOnlyDao {
    /// Interning of the identifiers of this load
    fn id_cache(&self) -> &IdCache;
    /// True once the DAO is closed
    fn is_closed(&self) -> bool;

    /// The row of `feed_info.txt`
    fn feed_info(&self) -> Option<&FeedInfo>;

    /// Agency by id, `None` being the agency without id
    fn get_agency(&self, id: Option<&Id<Agency>>) -> Option<&Agency>;
    /// All agencies
    fn agencies(&self) -> Box<dyn Iterator<Item = &Agency> + '_>;

    /// Level by id
    fn get_level(&self, id: &Id<Level>) -> Option<&Level>;
    /// All levels
    fn levels(&self) -> Box<dyn Iterator<Item = &Level> + '_>;

    /// Stop by id
    fn get_stop(&self, id: &Id<Stop>) -> Option<&Stop>;
    /// All stops
    fn stops(&self) -> Box<dyn Iterator<Item = &Stop> + '_>;

    /// Route by id
    fn get_route(&self, id: &Id<Route>) -> Option<&Route>;
    /// All routes
    fn routes(&self) -> Box<dyn Iterator<Item = &Route> + '_>;

    /// Calendar by service id
    fn get_calendar(&self, id: &Id<Calendar>) -> Option<&Calendar>;
    /// All calendars
    fn calendars(&self) -> Box<dyn Iterator<Item = &Calendar> + '_>;
    /// Exceptions of a service, in file order
    fn calendar_dates_of(&self, service_id: &Id<Calendar>) -> &[CalendarDate];
    /// Services having exceptions
    fn calendar_date_service_ids(&self) -> Box<dyn Iterator<Item = &Id<Calendar>> + '_>;

    /// Points of a shape, sorted by sequence
    fn shape_points_of(&self, shape_id: &Id<Shape>) -> Cow<'_, [ShapePoint]>;
    /// Shapes having points
    fn shape_ids(&self) -> Vec<Id<Shape>>;
    /// True if the shape has points; unlike [ReadOnlyDao::shape_points_of], also valid while loading
    fn has_shape(&self, shape_id: &Id<Shape>) -> bool;
    /// Number of shape points
    fn shape_point_count(&self) -> usize;

    /// Trip by id
    fn get_trip(&self, id: &Id<Trip>) -> Option<&Trip>;
    /// All trips
    fn trips(&self) -> Box<dyn Iterator<Item = &Trip> + '_>;

    /// Stop times of a trip, sorted by sequence
    fn stop_times_of(&self, trip_id: &Id<Trip>) -> Cow<'_, [StopTime]>;
    /// Trips having stop times, declared in `trips.txt` or not
    fn trip_ids_with_stop_times(&self) -> Vec<Id<Trip>>;
    /// Number of stop times
    fn stop_time_count(&self) -> usize;

    /// Frequencies of a trip, in file order
    fn frequencies_of(&self, trip_id: &Id<Trip>) -> &[Frequency];
    /// All frequencies
    fn frequencies(&self) -> Box<dyn Iterator<Item = &Frequency> + '_>;

    /// Transfer by key
    fn get_transfer(&self, key: &TransferKey) -> Option<&Transfer>;
    /// All transfers
    fn transfers(&self) -> Box<dyn Iterator<Item = &Transfer> + '_>;

    /// Pathway by id
    fn get_pathway(&self, id: &Id<Pathway>) -> Option<&Pathway>;
    /// All pathways
    fn pathways(&self) -> Box<dyn Iterator<Item = &Pathway> + '_>;

    /// Fare by id
    fn get_fare_attribute(&self, id: &Id<FareAttribute>) -> Option<&FareAttribute>;
    /// All fares
    fn fare_attributes(&self) -> Box<dyn Iterator<Item = &FareAttribute> + '_>;

    /// Fare rule by key
    fn get_fare_rule(&self, key: &FareRuleKey) -> Option<&FareRule>;
    /// All fare rules
    fn fare_rules(&self) -> Box<dyn Iterator<Item = &FareRule> + '_>;

    /// Area by id
    fn get_area(&self, id: &Id<Area>) -> Option<&Area>;
    /// All areas
    fn areas(&self) -> Box<dyn Iterator<Item = &Area> + '_>;

    /// Translation by key
    fn get_translation(&self, key: &TranslationKey) -> Option<&Translation>;
    /// All translations
    fn translations(&self) -> Box<dyn Iterator<Item = &Translation> + '_>;

    /// Attributions, in file order
    fn attributions(&self) -> &[Attribution];
}

/// Read side of a closed DAO, with the indices computed at close
pub trait IndexedReadOnlyDao: ReadOnlyDao + Sync {
    /// Dates of the services
    fn calendar_index(&self) -> &CalendarIndex;

    /// Statistics of the stop times store
    fn stop_times_stats(&self) -> &StoreStats;

    /// Statistics of the shape points store
    fn shape_points_stats(&self) -> &StoreStats;

    /// Sorted dates on which the service runs
    fn active_dates_of(&self, service_id: &Id<Calendar>) -> &[NaiveDate] {
        self.calendar_index().active_dates(service_id)
    }

    /// Number of trips running on a date
    fn trip_count_on(&self, date: NaiveDate) -> usize {
        self.calendar_index().trip_count_on(date)
    }

    /// Sorted dates with at least one active service
    fn service_dates(&self) -> &[NaiveDate] {
        self.calendar_index().service_dates()
    }
}

/// The DAO keeping everything in memory
pub struct InMemoryDao {
    ids: Arc<IdCache>,
    options: DaoOptions,
    closed: bool,
    feed_info: Option<FeedInfo>,
    agencies: FxHashMap<Option<Id<Agency>>, Agency>,
    levels: FxHashMap<Id<Level>, Level>,
    stops: FxHashMap<Id<Stop>, Stop>,
    routes: FxHashMap<Id<Route>, Route>,
    calendars: FxHashMap<Id<Calendar>, Calendar>,
    calendar_dates: FxHashMap<Id<Calendar>, Vec<CalendarDate>>,
    shape_points: SequenceStore<Id<Shape>, ShapePoint>,
    shapes: FxHashSet<Id<Shape>>,
    trips: FxHashMap<Id<Trip>, Trip>,
    stop_times: SequenceStore<Id<Trip>, StopTime>,
    frequencies: FxHashMap<Id<Trip>, Vec<Frequency>>,
    transfers: FxHashMap<TransferKey, Transfer>,
    pathways: FxHashMap<Id<Pathway>, Pathway>,
    fare_attributes: FxHashMap<Id<FareAttribute>, FareAttribute>,
    fare_rules: FxHashMap<FareRuleKey, FareRule>,
    areas: FxHashMap<Id<Area>, Area>,
    translations: FxHashMap<TranslationKey, Translation>,
    attributions: Vec<Attribution>,
    calendar_index: CalendarIndex,
}

impl Default for InMemoryDao {
    fn default() -> Self {
        Self::new(DaoOptions::default())
    }
}

impl InMemoryDao {
    /// Creates an empty DAO
    pub fn new(options: DaoOptions) -> Self {
        Self {
            ids: Arc::new(IdCache::new()),
            options,
            closed: false,
            feed_info: None,
            agencies: FxHashMap::default(),
            levels: FxHashMap::default(),
            stops: FxHashMap::default(),
            routes: FxHashMap::default(),
            calendars: FxHashMap::default(),
            calendar_dates: FxHashMap::default(),
            shape_points: SequenceStore::new("shapes.txt", options.shape_points),
            shapes: FxHashSet::default(),
            trips: FxHashMap::default(),
            stop_times: SequenceStore::new("stop_times.txt", options.stop_times),
            frequencies: FxHashMap::default(),
            transfers: FxHashMap::default(),
            pathways: FxHashMap::default(),
            fare_attributes: FxHashMap::default(),
            fare_rules: FxHashMap::default(),
            areas: FxHashMap::default(),
            translations: FxHashMap::default(),
            attributions: Vec::new(),
            calendar_index: CalendarIndex::default(),
        }
    }

    /// Options the DAO was created with
    pub fn options(&self) -> &DaoOptions {
        &self.options
    }

    /// The identifier cache, for whoever builds records while the DAO is borrowed mutably
    pub fn shared_id_cache(&self) -> Arc<IdCache> {
        Arc::clone(&self.ids)
    }

    fn writable(&self, context: &SourceContext) -> bool {
        if self.closed {
            log::error!("{} added to a closed DAO, ignored", context.source_ref);
        }
        !self.closed
    }
}

impl AppendableDao for InMemoryDao {
    fn id_cache(&self) -> &IdCache {
        &self.ids
    }

    fn set_feed_info(&mut self, feed_info: FeedInfo, context: &SourceContext) {
        if self.writable(context) {
            self.feed_info = Some(feed_info);
        }
    }

    fn add_agency(&mut self, agency: Agency, context: &SourceContext) {
        if self.writable(context) {
            self.agencies.insert(agency.id.clone(), agency);
        }
    }

    fn add_level(&mut self, level: Level, context: &SourceContext) {
        if self.writable(context) {
            self.levels.insert(level.id.clone(), level);
        }
    }

    fn add_stop(&mut self, stop: Stop, context: &SourceContext) {
        if self.writable(context) {
            self.stops.insert(stop.id.clone(), stop);
        }
    }

    fn add_route(&mut self, route: Route, context: &SourceContext) {
        if self.writable(context) {
            self.routes.insert(route.id.clone(), route);
        }
    }

    fn add_calendar(&mut self, calendar: Calendar, context: &SourceContext) {
        if self.writable(context) {
            self.calendars.insert(calendar.id.clone(), calendar);
        }
    }

    fn add_calendar_date(&mut self, calendar_date: CalendarDate, context: &SourceContext) {
        if !self.writable(context) {
            return;
        }
        let dates = self
            .calendar_dates
            .entry(calendar_date.service_id.clone())
            .or_default();
        match dates.iter_mut().find(|d| d.date == calendar_date.date) {
            Some(existing) => *existing = calendar_date,
            None => dates.push(calendar_date),
        }
    }

    fn add_shape_point(&mut self, shape_point: ShapePoint, context: &SourceContext) {
        if self.writable(context) {
            if !self.shapes.contains(&shape_point.shape_id) {
                self.shapes.insert(shape_point.shape_id.clone());
            }
            self.shape_points
                .append(shape_point.shape_id.clone(), shape_point);
        }
    }

    fn add_trip(&mut self, trip: Trip, context: &SourceContext) {
        if self.writable(context) {
            self.trips.insert(trip.id.clone(), trip);
        }
    }

    fn add_stop_time(&mut self, stop_time: StopTime, context: &SourceContext) {
        if self.writable(context) {
            self.stop_times.append(stop_time.trip_id.clone(), stop_time);
        }
    }

    fn add_frequency(&mut self, frequency: Frequency, context: &SourceContext) {
        if !self.writable(context) {
            return;
        }
        let frequencies = self
            .frequencies
            .entry(frequency.trip_id.clone())
            .or_default();
        match frequencies
            .iter_mut()
            .find(|f| f.start_time == frequency.start_time)
        {
            Some(existing) => *existing = frequency,
            None => frequencies.push(frequency),
        }
    }

    fn add_transfer(&mut self, transfer: Transfer, context: &SourceContext) {
        if self.writable(context) {
            self.transfers.insert(transfer.key(), transfer);
        }
    }

    fn add_pathway(&mut self, pathway: Pathway, context: &SourceContext) {
        if self.writable(context) {
            self.pathways.insert(pathway.id.clone(), pathway);
        }
    }

    fn add_fare_attribute(&mut self, fare_attribute: FareAttribute, context: &SourceContext) {
        if self.writable(context) {
            self.fare_attributes
                .insert(fare_attribute.id.clone(), fare_attribute);
        }
    }

    fn add_fare_rule(&mut self, fare_rule: FareRule, context: &SourceContext) {
        if self.writable(context) {
            self.fare_rules.insert(fare_rule.key(), fare_rule);
        }
    }

    fn add_area(&mut self, area: Area, context: &SourceContext) {
        if self.writable(context) {
            self.areas.insert(area.id.clone(), area);
        }
    }

    fn add_translation(&mut self, translation: Translation, context: &SourceContext) {
        if self.writable(context) {
            self.translations.insert(translation.key(), translation);
        }
    }

    fn add_attribution(&mut self, attribution: Attribution, context: &SourceContext) {
        if self.writable(context) {
            self.attributions.push(attribution);
        }
    }

    fn close(&mut self) {
        if self.closed {
            log::warn!("DAO closed twice, ignored");
            return;
        }
        self.stop_times.seal();
        self.shape_points.seal();
        self.calendar_index = CalendarIndex::build(
            self.calendars.values(),
            self.calendar_dates
                .iter()
                .map(|(id, dates)| (id, dates.as_slice())),
            self.trips.values(),
        );
        self.closed = true;
        log::info!(
            "DAO closed: {} stops, {} routes, {} trips, {} stop times, {} shape points, {} service dates",
            self.stops.len(),
            self.routes.len(),
            self.trips.len(),
            self.stop_times.count(),
            self.shape_points.count(),
            self.calendar_index.service_dates().len()
        );
        if self.options.verbose {
            log::info!("{} distinct identifiers interned", self.ids.len());
        }
    }
}

impl ReadOnlyDao for InMemoryDao {
    fn id_cache(&self) -> &IdCache {
        &self.ids
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn feed_info(&self) -> Option<&FeedInfo> {
        self.feed_info.as_ref()
    }

    fn get_agency(&self, id: Option<&Id<Agency>>) -> Option<&Agency> {
        self.agencies.get(&id.cloned())
    }

    fn agencies(&self) -> Box<dyn Iterator<Item = &Agency> + '_> {
        Box::new(self.agencies.values())
    }

    fn get_level(&self, id: &Id<Level>) -> Option<&Level> {
        self.levels.get(id)
    }

    fn levels(&self) -> Box<dyn Iterator<Item = &Level> + '_> {
        Box::new(self.levels.values())
    }

    fn get_stop(&self, id: &Id<Stop>) -> Option<&Stop> {
        self.stops.get(id)
    }

    fn stops(&self) -> Box<dyn Iterator<Item = &Stop> + '_> {
        Box::new(self.stops.values())
    }

    fn get_route(&self, id: &Id<Route>) -> Option<&Route> {
        self.routes.get(id)
    }

    fn routes(&self) -> Box<dyn Iterator<Item = &Route> + '_> {
        Box::new(self.routes.values())
    }

    fn get_calendar(&self, id: &Id<Calendar>) -> Option<&Calendar> {
        self.calendars.get(id)
    }

    fn calendars(&self) -> Box<dyn Iterator<Item = &Calendar> + '_> {
        Box::new(self.calendars.values())
    }

    fn calendar_dates_of(&self, service_id: &Id<Calendar>) -> &[CalendarDate] {
        self.calendar_dates
            .get(service_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn calendar_date_service_ids(&self) -> Box<dyn Iterator<Item = &Id<Calendar>> + '_> {
        Box::new(self.calendar_dates.keys())
    }

    fn shape_points_of(&self, shape_id: &Id<Shape>) -> Cow<'_, [ShapePoint]> {
        self.shape_points.children_of(shape_id)
    }

    fn shape_ids(&self) -> Vec<Id<Shape>> {
        self.shape_points.parent_keys()
    }

    fn has_shape(&self, shape_id: &Id<Shape>) -> bool {
        self.shapes.contains(shape_id)
    }

    fn shape_point_count(&self) -> usize {
        self.shape_points.count()
    }

    fn get_trip(&self, id: &Id<Trip>) -> Option<&Trip> {
        self.trips.get(id)
    }

    fn trips(&self) -> Box<dyn Iterator<Item = &Trip> + '_> {
        Box::new(self.trips.values())
    }

    fn stop_times_of(&self, trip_id: &Id<Trip>) -> Cow<'_, [StopTime]> {
        self.stop_times.children_of(trip_id)
    }

    fn trip_ids_with_stop_times(&self) -> Vec<Id<Trip>> {
        self.stop_times.parent_keys()
    }

    fn stop_time_count(&self) -> usize {
        self.stop_times.count()
    }

    fn frequencies_of(&self, trip_id: &Id<Trip>) -> &[Frequency] {
        self.frequencies
            .get(trip_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn frequencies(&self) -> Box<dyn Iterator<Item = &Frequency> + '_> {
        Box::new(self.frequencies.values().flatten())
    }

    fn get_transfer(&self, key: &TransferKey) -> Option<&Transfer> {
        self.transfers.get(key)
    }

    fn transfers(&self) -> Box<dyn Iterator<Item = &Transfer> + '_> {
        Box::new(self.transfers.values())
    }

    fn get_pathway(&self, id: &Id<Pathway>) -> Option<&Pathway> {
        self.pathways.get(id)
    }

    fn pathways(&self) -> Box<dyn Iterator<Item = &Pathway> + '_> {
        Box::new(self.pathways.values())
    }

    fn get_fare_attribute(&self, id: &Id<FareAttribute>) -> Option<&FareAttribute> {
        self.fare_attributes.get(id)
    }

    fn fare_attributes(&self) -> Box<dyn Iterator<Item = &FareAttribute> + '_> {
        Box::new(self.fare_attributes.values())
    }

    fn get_fare_rule(&self, key: &FareRuleKey) -> Option<&FareRule> {
        self.fare_rules.get(key)
    }

    fn fare_rules(&self) -> Box<dyn Iterator<Item = &FareRule> + '_> {
        Box::new(self.fare_rules.values())
    }

    fn get_area(&self, id: &Id<Area>) -> Option<&Area> {
        self.areas.get(id)
    }

    fn areas(&self) -> Box<dyn Iterator<Item = &Area> + '_> {
        Box::new(self.areas.values())
    }

    fn get_translation(&self, key: &TranslationKey) -> Option<&Translation> {
        self.translations.get(key)
    }

    fn translations(&self) -> Box<dyn Iterator<Item = &Translation> + '_> {
        Box::new(self.translations.values())
    }

    fn attributions(&self) -> &[Attribution] {
        &self.attributions
    }
}

impl IndexedReadOnlyDao for InMemoryDao {
    fn calendar_index(&self) -> &CalendarIndex {
        &self.calendar_index
    }

    fn stop_times_stats(&self) -> &StoreStats {
        self.stop_times.stats()
    }

    fn shape_points_stats(&self) -> &StoreStats {
        self.shape_points.stats()
    }
}
