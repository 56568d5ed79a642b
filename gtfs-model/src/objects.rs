pub use crate::enums::*;
use crate::fields::LogicalTime;
use crate::ids::Id;
use crate::source::SourceRef;
use chrono::{Datelike, NaiveDate, Weekday};
use rgb::RGB8;

use std::fmt;

/// A record read from one line of one table of the feed
///
/// Records are immutable once built: a reload replaces them wholesale.
pub trait Record {
    /// File name of the table, e.g. `stops.txt`
    const TABLE_NAME: &'static str;

    /// Line of the table where the record was read
    fn line(&self) -> u64;

    /// Table and line of the record
    fn source_ref(&self) -> SourceRef {
        SourceRef::new(Self::TABLE_NAME, self.line())
    }
}

macro_rules! record {
    ($type:ty, $table:expr) => {
        impl Record for $type {
            const TABLE_NAME: &'static str = $table;

            fn line(&self) -> u64 {
                self.line
            }
        }
    };
}

/// Marker for the `shape_id` of the [ShapePoint]s, there is no shape record
pub enum Shape {}

/// Marker for the fare zones (`zone_id` of a [Stop], `origin_id` of a [FareRule]…)
pub enum Zone {}

/// A calender describes on which days the vehicle runs. See <https://gtfs.org/reference/static/#calendartxt>
#[derive(Debug, Clone)]
pub struct Calendar {
    /// Unique technical identifier (not for the traveller) of this calendar
    pub id: Id<Calendar>,
    /// Does the service run on mondays
    pub monday: bool,
    /// Does the service run on tuesdays
    pub tuesday: bool,
    /// Does the service run on wednesdays
    pub wednesday: bool,
    /// Does the service run on thursdays
    pub thursday: bool,
    /// Does the service run on fridays
    pub friday: bool,
    /// Does the service run on saturdays
    pub saturday: bool,
    /// Does the service run on sundays
    pub sunday: bool,
    /// Start service day for the service interval
    pub start_date: Option<NaiveDate>,
    /// End service day for the service interval. This service day is included in the interval
    pub end_date: Option<NaiveDate>,
    /// Line in `calendar.txt`
    pub line: u64,
}

record!(Calendar, "calendar.txt");

impl fmt::Display for Calendar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => write!(f, "{}—{}", start, end),
            _ => write!(f, "{}", self.id),
        }
    }
}

impl Calendar {
    /// Returns true if there is a service running on that day of the week
    pub fn valid_weekday(&self, date: NaiveDate) -> bool {
        match date.weekday() {
            Weekday::Mon => self.monday,
            Weekday::Tue => self.tuesday,
            Weekday::Wed => self.wednesday,
            Weekday::Thu => self.thursday,
            Weekday::Fri => self.friday,
            Weekday::Sat => self.saturday,
            Weekday::Sun => self.sunday,
        }
    }

    /// True if at least one day of the week is active
    pub fn has_active_weekday(&self) -> bool {
        self.monday
            || self.tuesday
            || self.wednesday
            || self.thursday
            || self.friday
            || self.saturday
            || self.sunday
    }

    /// Days of the interval matching the weekdays, ignoring the exceptions
    pub fn weekday_dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        let range = match (self.start_date, self.end_date) {
            (Some(start), Some(end)) if start <= end => Some((start, end)),
            _ => None,
        };
        range
            .into_iter()
            .flat_map(|(start, end)| start.iter_days().take_while(move |d| *d <= end))
            .filter(move |d| self.valid_weekday(*d))
    }
}

/// Defines a specific date that can be added or removed from a [Calendar]. See <https://gtfs.org/reference/static/#calendar_datestxt>
#[derive(Debug, Clone)]
pub struct CalendarDate {
    /// Identifier of the service that is modified at this date
    pub service_id: Id<Calendar>,
    /// Date where the service will be added or deleted
    pub date: Option<NaiveDate>,
    /// Is the service added or deleted
    pub exception_type: Exception,
    /// Line in `calendar_dates.txt`
    pub line: u64,
}

record!(CalendarDate, "calendar_dates.txt");

/// A physical stop, station or area. See <https://gtfs.org/reference/static/#stopstxt>
#[derive(Debug, Clone)]
pub struct Stop {
    /// Unique technical identifier (not for the traveller) of the stop
    pub id: Id<Stop>,
    /// Short text or a number that identifies the location for riders
    pub code: Option<String>,
    ///Name of the location. Use a name that people will understand in the local and tourist vernacular
    pub name: Option<String>,
    /// Description of the location that provides useful, quality information
    pub description: Option<String>,
    /// Type of the location
    pub location_type: LocationType,
    /// Defines hierarchy between the different locations
    pub parent_station: Option<Id<Stop>>,
    /// Identifies the fare zone for a stop
    pub zone_id: Option<Id<Zone>>,
    /// URL of a web page about the location
    pub url: Option<String>,
    /// Longitude of the stop
    pub longitude: Option<f64>,
    /// Latitude of the stop
    pub latitude: Option<f64>,
    /// Timezone of the location
    pub timezone: Option<String>,
    /// Indicates whether wheelchair boardings are possible from the location
    pub wheelchair_boarding: Availability,
    /// Level of the location. The same level can be used by multiple unlinked stations
    pub level_id: Option<Id<Level>>,
    /// Platform identifier for a platform stop (a stop belonging to a station)
    pub platform_code: Option<String>,
    /// Line in `stops.txt`
    pub line: u64,
}

record!(Stop, "stops.txt");

impl fmt::Display for Stop {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "{}", self.id),
        }
    }
}

/// The moment where a vehicle, running on [Trip] stops at a [Stop]. See <https://gtfs.org/reference/static/#stop_timestxt>
#[derive(Debug, Clone, PartialEq)]
pub struct StopTime {
    /// [Trip] to which this stop time belongs to
    pub trip_id: Id<Trip>,
    /// Arrival time of the stop time.
    /// It's an option since the intermediate stops can have have no arrival
    /// and this arrival needs to be interpolated
    pub arrival_time: Option<LogicalTime>,
    /// Departure time of the stop time.
    /// It's an option since the intermediate stops can have have no departure
    /// and this departure needs to be interpolated
    pub departure_time: Option<LogicalTime>,
    /// Identifier of the [Stop] where the vehicle stops
    pub stop_id: Option<Id<Stop>>,
    /// Order of stops for a particular trip. The values must increase along the trip but do not need to be consecutive
    pub stop_sequence: Option<u32>,
    /// Text that appears on signage identifying the trip's destination to riders
    pub stop_headsign: Option<String>,
    /// Indicates pickup method
    pub pickup_type: PickupDropOffType,
    /// Indicates drop off method
    pub drop_off_type: PickupDropOffType,
    /// Actual distance traveled along the associated shape, from the first stop to the stop specified in this record. This field specifies how much of the shape to draw between any two stops during a trip
    pub shape_dist_traveled: Option<f32>,
    /// Indicates if arrival and departure times for a stop are strictly adhered to by the vehicle or if they are instead approximate and/or interpolated times
    pub timepoint: TimepointType,
    /// Line in `stop_times.txt`
    pub line: u64,
}

record!(StopTime, "stop_times.txt");

/// A route is a commercial line (there can be various stop sequences for a same line). See <https://gtfs.org/reference/static/#routestxt>
#[derive(Debug, Clone)]
pub struct Route {
    /// Unique technical (not for the traveller) identifier for the route
    pub id: Id<Route>,
    /// Short name of a route. This will often be a short, abstract identifier like "32", "100X", or "Green" that riders use to identify a route, but which doesn't give any indication of what places the route serves
    pub short_name: Option<String>,
    /// Full name of a route. This name is generally more descriptive than the [Route::short_name]] and often includes the route's destination or stop
    pub long_name: Option<String>,
    /// Description of a route that provides useful, quality information
    pub desc: Option<String>,
    /// Indicates the type of transportation used on a route
    pub route_type: RouteType,
    /// URL of a web page about the particular route
    pub url: Option<String>,
    /// Agency for the specified route
    pub agency_id: Option<Id<Agency>>,
    /// Orders the routes in a way which is ideal for presentation to customers. Routes with smaller route_sort_order values should be displayed first.
    pub order: Option<u32>,
    /// Route color designation that matches public facing material
    pub color: RGB8,
    /// Legible color to use for text drawn against a background of [Route::color]
    pub text_color: RGB8,
    /// Line in `routes.txt`
    pub line: u64,
}

record!(Route, "routes.txt");

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (&self.long_name, &self.short_name) {
            (Some(long), _) if !long.is_empty() => write!(f, "{}", long),
            (_, Some(short)) => write!(f, "{}", short),
            _ => write!(f, "{}", self.id),
        }
    }
}

/// A Trip is a vehicle that follows a sequence of [StopTime] on certain days. See <https://gtfs.org/reference/static/#tripstxt>
#[derive(Debug, Clone)]
pub struct Trip {
    /// Unique technical identifier (not for the traveller) for the Trip
    pub id: Id<Trip>,
    /// References the [Calendar] on which this trip runs
    pub service_id: Option<Id<Calendar>>,
    /// References along which [Route] this trip runs
    pub route_id: Option<Id<Route>>,
    /// Shape of the trip
    pub shape_id: Option<Id<Shape>>,
    /// Text that appears on signage identifying the trip's destination to riders
    pub trip_headsign: Option<String>,
    /// Public facing text used to identify the trip to riders, for instance, to identify train numbers for commuter rail trips
    pub trip_short_name: Option<String>,
    /// Indicates the direction of travel for a trip. This field is not used in routing; it provides a way to separate trips by direction when publishing time tables
    pub direction_id: Option<DirectionType>,
    /// Identifies the block to which the trip belongs. A block consists of a single trip or many sequential trips made using the same vehicle
    pub block_id: Option<String>,
    /// Indicates wheelchair accessibility
    pub wheelchair_accessible: Availability,
    /// Indicates whether bikes are allowed
    pub bikes_allowed: BikesAllowedType,
    /// Line in `trips.txt`
    pub line: u64,
}

record!(Trip, "trips.txt");

impl fmt::Display for Trip {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "route id: {}, service id: {}",
            self.route_id.as_ref().map(Id::as_str).unwrap_or_default(),
            self.service_id.as_ref().map(Id::as_str).unwrap_or_default()
        )
    }
}

/// General informations about the agency running the network. See <https://gtfs.org/reference/static/#agencytxt>
#[derive(Debug, Clone)]
pub struct Agency {
    /// Unique technical (not for the traveller) identifier for the Agency
    pub id: Option<Id<Agency>>,
    ///Full name of the transit agency
    pub name: Option<String>,
    /// Full name of the transit agency.
    pub url: Option<String>,
    /// Timezone where the transit agency is located
    pub timezone: Option<String>,
    /// Primary language used by this transit agency
    pub lang: Option<String>,
    /// A voice telephone number for the specified agency
    pub phone: Option<String>,
    /// URL of a web page that allows a rider to purchase tickets or other fare instruments for that agency online
    pub fare_url: Option<String>,
    /// Email address actively monitored by the agency’s customer service department
    pub email: Option<String>,
    /// Line in `agency.txt`
    pub line: u64,
}

record!(Agency, "agency.txt");

impl fmt::Display for Agency {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name.as_deref().unwrap_or_default())
    }
}

/// A single geographical point decribing the shape of a [Trip]. See <https://gtfs.org/reference/static/#shapestxt>
#[derive(Debug, Clone, PartialEq)]
pub struct ShapePoint {
    /// Identifier of the shape the point belongs to
    pub shape_id: Id<Shape>,
    /// Latitude of a shape point
    pub latitude: Option<f64>,
    /// Longitude of a shape point
    pub longitude: Option<f64>,
    /// Sequence in which the shape points connect to form the shape. Values increase along the trip but do not need to be consecutive.
    pub sequence: Option<u32>,
    /// Actual distance traveled along the shape from the first shape point to the point specified in this record
    pub dist_traveled: Option<f32>,
    /// Line in `shapes.txt`
    pub line: u64,
}

record!(ShapePoint, "shapes.txt");

/// Defines one possible fare. See <https://gtfs.org/reference/static/#fare_attributestxt>
#[derive(Debug, Clone)]
pub struct FareAttribute {
    /// Unique technical (not for the traveller) identifier for the FareAttribute
    pub id: Id<FareAttribute>,
    /// Fare price, in the unit specified by [FareAttribute::currency]
    pub price: Option<f64>,
    /// Currency used to pay the fare.
    pub currency: Option<String>,
    ///Indicates when the fare must be paid
    pub payment_method: PaymentMethod,
    /// Indicates the number of transfers permitted on this fare
    pub transfers: Transfers,
    /// Identifies the relevant agency for a fare
    pub agency_id: Option<Id<Agency>>,
    /// Length of time in seconds before a transfer expires
    pub transfer_duration: Option<u32>,
    /// Line in `fare_attributes.txt`
    pub line: u64,
}

record!(FareAttribute, "fare_attributes.txt");

/// Natural key of a [FareRule]: all its columns
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FareRuleKey {
    /// The fare
    pub fare_id: Option<Id<FareAttribute>>,
    /// The route
    pub route_id: Option<Id<Route>>,
    /// Origin zone
    pub origin_id: Option<Id<Zone>>,
    /// Destination zone
    pub destination_id: Option<Id<Zone>>,
    /// Zone traversed
    pub contains_id: Option<Id<Zone>>,
}

/// Specifies how fares in [FareAttribute] apply to an itinerary. See <https://gtfs.org/reference/static/#fare_rulestxt>
#[derive(Debug, Clone)]
pub struct FareRule {
    /// The fare the rule applies to
    pub fare_id: Option<Id<FareAttribute>>,
    /// The fare applies to this route
    pub route_id: Option<Id<Route>>,
    /// The fare applies to trips starting in this zone
    pub origin_id: Option<Id<Zone>>,
    /// The fare applies to trips ending in this zone
    pub destination_id: Option<Id<Zone>>,
    /// The fare applies to trips passing through this zone
    pub contains_id: Option<Id<Zone>>,
    /// Line in `fare_rules.txt`
    pub line: u64,
}

record!(FareRule, "fare_rules.txt");

impl FareRule {
    /// Key identifying the rule in the feed
    pub fn key(&self) -> FareRuleKey {
        FareRuleKey {
            fare_id: self.fare_id.clone(),
            route_id: self.route_id.clone(),
            origin_id: self.origin_id.clone(),
            destination_id: self.destination_id.clone(),
            contains_id: self.contains_id.clone(),
        }
    }
}

/// Timetables can be defined by the frequency of their vehicles. See <<https://gtfs.org/reference/static/#frequenciestxt>>
#[derive(Debug, Clone)]
pub struct Frequency {
    /// References the [Trip] that uses frequency
    pub trip_id: Id<Trip>,
    /// Time at which the first vehicle departs from the first stop of the trip
    pub start_time: Option<LogicalTime>,
    /// Time at which service changes to a different headway (or ceases) at the first stop in the trip
    pub end_time: Option<LogicalTime>,
    /// Time, in seconds, between departures from the same stop (headway) for the trip, during the time interval specified by start_time and end_time
    pub headway_secs: Option<u32>,
    /// Indicates the type of service for a trip
    pub exact_times: ExactTimes,
    /// Line in `frequencies.txt`
    pub line: u64,
}

record!(Frequency, "frequencies.txt");

/// Natural key of a [Transfer]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransferKey {
    /// Stop from which to leave
    pub from_stop_id: Option<Id<Stop>>,
    /// Stop which to transfer to
    pub to_stop_id: Option<Id<Stop>>,
    /// Route from which to leave
    pub from_route_id: Option<Id<Route>>,
    /// Route which to transfer to
    pub to_route_id: Option<Id<Route>>,
    /// Trip from which to leave
    pub from_trip_id: Option<Id<Trip>>,
    /// Trip which to transfer to
    pub to_trip_id: Option<Id<Trip>>,
}

/// Transfer information between stops, routes or trips. See <https://gtfs.org/reference/static/#transferstxt>
#[derive(Debug, Clone)]
pub struct Transfer {
    /// Stop from which to leave
    pub from_stop_id: Option<Id<Stop>>,
    /// Stop which to transfer to
    pub to_stop_id: Option<Id<Stop>>,
    /// Route from which to leave
    pub from_route_id: Option<Id<Route>>,
    /// Route which to transfer to
    pub to_route_id: Option<Id<Route>>,
    /// Trip from which to leave
    pub from_trip_id: Option<Id<Trip>>,
    /// Trip which to transfer to
    pub to_trip_id: Option<Id<Trip>>,
    /// Type of the transfer
    pub transfer_type: TransferType,
    /// Minimum time needed to make the transfer in seconds
    pub min_transfer_time: Option<u32>,
    /// Line in `transfers.txt`
    pub line: u64,
}

record!(Transfer, "transfers.txt");

impl Transfer {
    /// Key identifying the transfer in the feed
    pub fn key(&self) -> TransferKey {
        TransferKey {
            from_stop_id: self.from_stop_id.clone(),
            to_stop_id: self.to_stop_id.clone(),
            from_route_id: self.from_route_id.clone(),
            to_route_id: self.to_route_id.clone(),
            from_trip_id: self.from_trip_id.clone(),
            to_trip_id: self.to_trip_id.clone(),
        }
    }
}

/// Meta-data about the feed. See <https://gtfs.org/reference/static/#feed_infotxt>
#[derive(Debug, Clone)]
pub struct FeedInfo {
    /// Full name of the organization that publishes the dataset.
    pub name: Option<String>,
    /// URL of the dataset publishing organization's website
    pub url: Option<String>,
    /// Default language used for the text in this dataset
    pub lang: Option<String>,
    /// Defines the language that should be used when the data consumer doesn’t know the language of the rider
    pub default_lang: Option<String>,
    /// The dataset provides complete and reliable schedule information for service in the period from this date
    pub start_date: Option<NaiveDate>,
    ///The dataset provides complete and reliable schedule information for service in the period until this date
    pub end_date: Option<NaiveDate>,
    /// String that indicates the current version of their GTFS dataset
    pub version: Option<String>,
    /// Email address for communication regarding the GTFS dataset and data publishing practices
    pub contact_email: Option<String>,
    /// URL for contact information, a web-form, support desk, or other tools for communication regarding the GTFS dataset and data publishing practices
    pub contact_url: Option<String>,
    /// Line in `feed_info.txt`
    pub line: u64,
}

record!(FeedInfo, "feed_info.txt");

impl fmt::Display for FeedInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name.as_deref().unwrap_or_default())
    }
}

/// A graph representation to describe subway or train, with nodes (the locations) and edges (the pathways).
#[derive(Debug, Clone)]
pub struct Pathway {
    /// Uniquely identifies the pathway
    pub id: Id<Pathway>,
    /// Location at which the pathway begins
    pub from_stop_id: Option<Id<Stop>>,
    /// Location at which the pathway ends
    pub to_stop_id: Option<Id<Stop>>,
    /// Type of pathway between the specified (from_stop_id, to_stop_id) pair
    pub mode: PathwayMode,
    /// Indicates in which direction the pathway can be used
    pub is_bidirectional: PathwayDirectionType,
    /// Horizontal length in meters of the pathway from the origin location to the destination location
    pub length: Option<f32>,
    /// Average time in seconds needed to walk through the pathway from the origin location to the destination location
    pub traversal_time: Option<u32>,
    /// Number of stairs of the pathway
    pub stair_count: Option<i32>,
    /// Maximum slope ratio of the pathway
    pub max_slope: Option<f32>,
    /// Minimum width of the pathway in meters
    pub min_width: Option<f32>,
    /// String of text from physical signage visible to transit riders
    pub signposted_as: Option<String>,
    /// Same than the signposted_as field, but when the pathways is used backward
    pub reversed_signposted_as: Option<String>,
    /// Line in `pathways.txt`
    pub line: u64,
}

record!(Pathway, "pathways.txt");

/// A level of a station. See <https://gtfs.org/reference/static/#levelstxt>
#[derive(Debug, Clone)]
pub struct Level {
    /// Identifies the level
    pub id: Id<Level>,
    /// Numeric index of the level that indicates relative position of this level in relation to other levels
    pub index: Option<f64>,
    /// Name of the level as seen by the rider inside the building or station
    pub name: Option<String>,
    /// Line in `levels.txt`
    pub line: u64,
}

record!(Level, "levels.txt");

/// A group of stops, used by the fare rules. See <https://gtfs.org/reference/static/#areastxt>
#[derive(Debug, Clone)]
pub struct Area {
    /// Identifies the area
    pub id: Id<Area>,
    /// Name of the area as displayed to the rider
    pub name: Option<String>,
    /// Line in `areas.txt`
    pub line: u64,
}

record!(Area, "areas.txt");

/// Natural key of a [Translation]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TranslationKey {
    /// Table of the translated field
    pub table_name: String,
    /// Name of the translated field
    pub field_name: String,
    /// Language of the translation
    pub language: String,
    /// Record holding the translated field
    pub record_id: Option<String>,
    /// Second part of the record key, for tables without a single key
    pub record_sub_id: Option<String>,
    /// Translated value, when the translation applies to every record with that value
    pub field_value: Option<String>,
}

/// A translated text. See <https://gtfs.org/reference/static/#translationstxt>
#[derive(Debug, Clone)]
pub struct Translation {
    /// Table of the translated field
    pub table_name: String,
    /// Name of the translated field
    pub field_name: String,
    /// Language of the translation
    pub language: String,
    /// The translated text
    pub translation: String,
    /// Record holding the translated field
    pub record_id: Option<String>,
    /// Second part of the record key, for tables without a single key
    pub record_sub_id: Option<String>,
    /// Translated value, when the translation applies to every record with that value
    pub field_value: Option<String>,
    /// Line in `translations.txt`
    pub line: u64,
}

record!(Translation, "translations.txt");

impl Translation {
    /// Key identifying the translation in the feed
    pub fn key(&self) -> TranslationKey {
        TranslationKey {
            table_name: self.table_name.clone(),
            field_name: self.field_name.clone(),
            language: self.language.clone(),
            record_id: self.record_id.clone(),
            record_sub_id: self.record_sub_id.clone(),
            field_value: self.field_value.clone(),
        }
    }
}

/// Who contributed to the dataset. See <https://gtfs.org/reference/static/#attributionstxt>
#[derive(Debug, Clone)]
pub struct Attribution {
    /// Identifies the attribution
    pub id: Option<Id<Attribution>>,
    /// Agency the attribution applies to
    pub agency_id: Option<Id<Agency>>,
    /// Route the attribution applies to
    pub route_id: Option<Id<Route>>,
    /// Trip the attribution applies to
    pub trip_id: Option<Id<Trip>>,
    /// Name of the organization that the dataset is attributed to
    pub organization_name: Option<String>,
    /// The organization produced the dataset
    pub is_producer: bool,
    /// The organization operates the service
    pub is_operator: bool,
    /// The organization has the authority on the service
    pub is_authority: bool,
    /// URL of the organization
    pub url: Option<String>,
    /// Email of the organization
    pub email: Option<String>,
    /// Phone number of the organization
    pub phone: Option<String>,
    /// Line in `attributions.txt`
    pub line: u64,
}

record!(Attribution, "attributions.txt");
