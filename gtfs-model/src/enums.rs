/// Integer-coded GTFS enumerations
///
/// A code outside of the reference is kept as an `Unknown`/`Other` variant instead of being
/// rejected: the loader reports it and the record is still stored.
pub trait GtfsCode: Sized + Copy {
    /// Converts the integer written in the feed
    fn from_code(code: i32) -> Self;
    /// Integer value of the variant, as written in the feed
    fn code(&self) -> i32;
    /// True if the code is not part of the reference
    fn is_unknown(&self) -> bool;
}

/// Describes the kind of [crate::Stop]. See <https://gtfs.org/reference/static/#stopstxt> `location_type`
#[derive(Derivative, Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[derivative(Default(bound = ""))]
pub enum LocationType {
    /// Stop (or Platform). A location where passengers board or disembark from a transit vehicle. Is called a platform when defined within a parent_station
    #[derivative(Default)]
    StopPoint,
    /// Station. A physical structure or area that contains one or more platform
    StopArea,
    /// A location where passengers can enter or exit a station from the street
    StationEntrance,
    /// A location within a station, not matching any other location type, used to link pathways together
    GenericNode,
    /// A specific location on a platform, where passengers can board and/or alight vehicles
    BoardingArea,
    /// An unknown value
    Unknown(i32),
}

impl GtfsCode for LocationType {
    fn from_code(code: i32) -> Self {
        match code {
            0 => LocationType::StopPoint,
            1 => LocationType::StopArea,
            2 => LocationType::StationEntrance,
            3 => LocationType::GenericNode,
            4 => LocationType::BoardingArea,
            i => LocationType::Unknown(i),
        }
    }

    fn code(&self) -> i32 {
        match self {
            LocationType::StopPoint => 0,
            LocationType::StopArea => 1,
            LocationType::StationEntrance => 2,
            LocationType::GenericNode => 3,
            LocationType::BoardingArea => 4,
            LocationType::Unknown(i) => *i,
        }
    }

    fn is_unknown(&self) -> bool {
        matches!(self, LocationType::Unknown(_))
    }
}

/// Describes the kind of [crate::Route]. See <https://gtfs.org/reference/static/#routestxt> `route_type`
///
/// Some route types are extended GTFS (<https://developers.google.com/transit/gtfs/reference/extended-route-types>)
#[derive(Debug, Derivative, Copy, Clone, PartialEq, Eq, Hash)]
#[derivative(Default(bound = ""))]
pub enum RouteType {
    /// Tram, Streetcar, Light rail. Any light rail or street level system within a metropolitan area
    Tramway,
    /// Subway, Metro. Any underground rail system within a metropolitan area
    Subway,
    /// Used for intercity or long-distance travel
    Rail,
    /// Used for short- and long-distance bus routes
    #[derivative(Default)]
    Bus,
    /// Used for short- and long-distance boat service
    Ferry,
    /// Used for street-level rail cars where the cable runs beneath the vehicle
    CableCar,
    /// Aerial lift, suspended cable car
    Gondola,
    /// Any rail system designed for steep inclines
    Funicular,
    /// Trolleybus. Electric buses that draw power from overhead wires using poles
    Trolleybus,
    /// Monorail. Railway in which the track consists of a single rail or a beam
    Monorail,
    /// (extended) Used for intercity bus services
    Coach,
    /// (extended) Airplanes
    Air,
    /// (extended) Taxi, Cab
    Taxi,
    /// (extended) any other value
    Other(i32),
}

impl GtfsCode for RouteType {
    fn from_code(code: i32) -> Self {
        let hundreds = code / 100;
        match (code, hundreds) {
            (0, _) | (_, 9) => RouteType::Tramway,
            (1, _) | (_, 4) => RouteType::Subway,
            (2, _) | (_, 1) => RouteType::Rail,
            (3, _) | (_, 7) | (_, 8) => RouteType::Bus,
            (4, _) | (_, 10) | (_, 12) => RouteType::Ferry,
            (5, _) => RouteType::CableCar,
            (6, _) | (_, 13) => RouteType::Gondola,
            (7, _) | (_, 14) => RouteType::Funicular,
            (11, _) => RouteType::Trolleybus,
            (12, _) => RouteType::Monorail,
            (_, 2) => RouteType::Coach,
            (_, 11) => RouteType::Air,
            (_, 15) => RouteType::Taxi,
            _ => RouteType::Other(code),
        }
    }

    // Note: for extended route types, we loose the initial precise route type
    fn code(&self) -> i32 {
        match self {
            RouteType::Tramway => 0,
            RouteType::Subway => 1,
            RouteType::Rail => 2,
            RouteType::Bus => 3,
            RouteType::Ferry => 4,
            RouteType::CableCar => 5,
            RouteType::Gondola => 6,
            RouteType::Funicular => 7,
            RouteType::Trolleybus => 11,
            RouteType::Monorail => 12,
            RouteType::Coach => 200,
            RouteType::Air => 1100,
            RouteType::Taxi => 1500,
            RouteType::Other(i) => *i,
        }
    }

    fn is_unknown(&self) -> bool {
        matches!(self, RouteType::Other(_))
    }
}

/// Describes if and how a traveller can board or alight the vehicle. See <https://gtfs.org/reference/static/#stop_timestxt> `pickup_type` and `drop_off_type`
#[derive(Debug, Derivative, Copy, Clone, PartialEq, Eq, Hash)]
#[derivative(Default(bound = ""))]
pub enum PickupDropOffType {
    /// Regularly scheduled pickup or drop off (default when empty).
    #[derivative(Default)]
    Regular,
    /// No pickup or drop off available.
    NotAvailable,
    /// Must phone agency to arrange pickup or drop off.
    ArrangeByPhone,
    /// Must coordinate with driver to arrange pickup or drop off.
    CoordinateWithDriver,
    /// An unknown value not in the specification
    Unknown(i32),
}

impl GtfsCode for PickupDropOffType {
    fn from_code(code: i32) -> Self {
        match code {
            0 => PickupDropOffType::Regular,
            1 => PickupDropOffType::NotAvailable,
            2 => PickupDropOffType::ArrangeByPhone,
            3 => PickupDropOffType::CoordinateWithDriver,
            i => PickupDropOffType::Unknown(i),
        }
    }

    fn code(&self) -> i32 {
        match self {
            PickupDropOffType::Regular => 0,
            PickupDropOffType::NotAvailable => 1,
            PickupDropOffType::ArrangeByPhone => 2,
            PickupDropOffType::CoordinateWithDriver => 3,
            PickupDropOffType::Unknown(i) => *i,
        }
    }

    fn is_unknown(&self) -> bool {
        matches!(self, PickupDropOffType::Unknown(_))
    }
}

/// Describes if the stop time is exact or not. See <https://gtfs.org/reference/static/#stop_timestxt> `timepoint`
#[derive(Debug, Derivative, Copy, Clone, PartialEq, Eq, Hash)]
#[derivative(Default)]
pub enum TimepointType {
    /// Times are considered approximate
    Approximate,
    /// Times are considered exact
    #[derivative(Default)]
    Exact,
    /// An unknown value not in the specification
    Unknown(i32),
}

impl GtfsCode for TimepointType {
    fn from_code(code: i32) -> Self {
        match code {
            0 => TimepointType::Approximate,
            1 => TimepointType::Exact,
            i => TimepointType::Unknown(i),
        }
    }

    fn code(&self) -> i32 {
        match self {
            TimepointType::Approximate => 0,
            TimepointType::Exact => 1,
            TimepointType::Unknown(i) => *i,
        }
    }

    fn is_unknown(&self) -> bool {
        matches!(self, TimepointType::Unknown(_))
    }
}

/// Generic enum to define if a service (like wheelchair boarding) is available
#[derive(Debug, Derivative, PartialEq, Eq, Hash, Clone, Copy)]
#[derivative(Default)]
pub enum Availability {
    /// No information if the service is available
    #[derivative(Default)]
    InformationNotAvailable,
    /// The service is available
    Available,
    /// The service is not available
    NotAvailable,
    /// An unknown value not in the specification
    Unknown(i32),
}

impl GtfsCode for Availability {
    fn from_code(code: i32) -> Self {
        match code {
            0 => Availability::InformationNotAvailable,
            1 => Availability::Available,
            2 => Availability::NotAvailable,
            i => Availability::Unknown(i),
        }
    }

    fn code(&self) -> i32 {
        match self {
            Availability::InformationNotAvailable => 0,
            Availability::Available => 1,
            Availability::NotAvailable => 2,
            Availability::Unknown(i) => *i,
        }
    }

    fn is_unknown(&self) -> bool {
        matches!(self, Availability::Unknown(_))
    }
}

/// Defines if a [crate::CalendarDate] is added or deleted from a [crate::Calendar]
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Exception {
    /// There will be a service on that day
    Added,
    /// There won’t be a service on that day
    Deleted,
    /// An unknown value not in the specification
    Unknown(i32),
}

impl GtfsCode for Exception {
    fn from_code(code: i32) -> Self {
        match code {
            1 => Exception::Added,
            2 => Exception::Deleted,
            i => Exception::Unknown(i),
        }
    }

    fn code(&self) -> i32 {
        match self {
            Exception::Added => 1,
            Exception::Deleted => 2,
            Exception::Unknown(i) => *i,
        }
    }

    fn is_unknown(&self) -> bool {
        matches!(self, Exception::Unknown(_))
    }
}

/// Defines the direction of a [crate::Trip], only for display, not for routing. See <https://gtfs.org/reference/static/#tripstxt> `direction_id`
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DirectionType {
    /// Travel in one direction (e.g. outbound travel).
    Outbound,
    /// Travel in the opposite direction (e.g. inbound travel).
    Inbound,
    /// An unknown value not in the specification
    Unknown(i32),
}

impl GtfsCode for DirectionType {
    fn from_code(code: i32) -> Self {
        match code {
            0 => DirectionType::Outbound,
            1 => DirectionType::Inbound,
            i => DirectionType::Unknown(i),
        }
    }

    fn code(&self) -> i32 {
        match self {
            DirectionType::Outbound => 0,
            DirectionType::Inbound => 1,
            DirectionType::Unknown(i) => *i,
        }
    }

    fn is_unknown(&self) -> bool {
        matches!(self, DirectionType::Unknown(_))
    }
}

/// Is the [crate::Trip] accessible with a bike. See <https://gtfs.org/reference/static/#tripstxt> `bikes_allowed`
#[derive(Debug, Derivative, Copy, Clone, PartialEq, Eq, Hash)]
#[derivative(Default)]
pub enum BikesAllowedType {
    /// No bike information for the trip
    #[derivative(Default)]
    NoBikeInfo,
    /// Vehicle being used on this particular trip can accommodate at least one bicycle
    AtLeastOneBike,
    /// No bicycles are allowed on this trip
    NoBikesAllowed,
    /// An unknown value not in the specification
    Unknown(i32),
}

impl GtfsCode for BikesAllowedType {
    fn from_code(code: i32) -> Self {
        match code {
            0 => BikesAllowedType::NoBikeInfo,
            1 => BikesAllowedType::AtLeastOneBike,
            2 => BikesAllowedType::NoBikesAllowed,
            i => BikesAllowedType::Unknown(i),
        }
    }

    fn code(&self) -> i32 {
        match self {
            BikesAllowedType::NoBikeInfo => 0,
            BikesAllowedType::AtLeastOneBike => 1,
            BikesAllowedType::NoBikesAllowed => 2,
            BikesAllowedType::Unknown(i) => *i,
        }
    }

    fn is_unknown(&self) -> bool {
        matches!(self, BikesAllowedType::Unknown(_))
    }
}

/// Defines where a [crate::FareAttribute] can be paid
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PaymentMethod {
    /// Fare is paid on board
    Aboard,
    /// Fare must be paid before boarding
    PreBoarding,
    /// An unknown value not in the specification
    Unknown(i32),
}

impl GtfsCode for PaymentMethod {
    fn from_code(code: i32) -> Self {
        match code {
            0 => PaymentMethod::Aboard,
            1 => PaymentMethod::PreBoarding,
            i => PaymentMethod::Unknown(i),
        }
    }

    fn code(&self) -> i32 {
        match self {
            PaymentMethod::Aboard => 0,
            PaymentMethod::PreBoarding => 1,
            PaymentMethod::Unknown(i) => *i,
        }
    }

    fn is_unknown(&self) -> bool {
        matches!(self, PaymentMethod::Unknown(_))
    }
}

/// Defines if the [crate::Frequency] is exact (the vehicle runs exactly every n minutes) or not
#[derive(Debug, Derivative, Copy, Clone, PartialEq, Eq, Hash)]
#[derivative(Default)]
pub enum ExactTimes {
    /// Frequency-based trips
    #[derivative(Default)]
    FrequencyBased,
    /// Schedule-based trips with the exact same headway throughout the day
    ScheduleBased,
    /// An unknown value not in the specification
    Unknown(i32),
}

impl GtfsCode for ExactTimes {
    fn from_code(code: i32) -> Self {
        match code {
            0 => ExactTimes::FrequencyBased,
            1 => ExactTimes::ScheduleBased,
            i => ExactTimes::Unknown(i),
        }
    }

    fn code(&self) -> i32 {
        match self {
            ExactTimes::FrequencyBased => 0,
            ExactTimes::ScheduleBased => 1,
            ExactTimes::Unknown(i) => *i,
        }
    }

    fn is_unknown(&self) -> bool {
        matches!(self, ExactTimes::Unknown(_))
    }
}

/// Defines how many transfers can be done with on [crate::FareAttribute]
///
/// The column is mandatory but its value can be empty, meaning unlimited transfers.
#[derive(Debug, Derivative, Copy, Clone, PartialEq, Eq, Hash)]
#[derivative(Default)]
pub enum Transfers {
    /// Unlimited transfers are permitted
    #[derivative(Default)]
    Unlimited,
    /// No transfers permitted on this fare
    NoTransfer,
    /// Riders may transfer once
    UniqueTransfer,
    /// Riders may transfer twice
    TwoTransfers,
    /// Other transfer values
    Other(i32),
}

impl GtfsCode for Transfers {
    fn from_code(code: i32) -> Self {
        match code {
            0 => Transfers::NoTransfer,
            1 => Transfers::UniqueTransfer,
            2 => Transfers::TwoTransfers,
            i => Transfers::Other(i),
        }
    }

    fn code(&self) -> i32 {
        match self {
            Transfers::Unlimited => -1,
            Transfers::NoTransfer => 0,
            Transfers::UniqueTransfer => 1,
            Transfers::TwoTransfers => 2,
            Transfers::Other(i) => *i,
        }
    }

    fn is_unknown(&self) -> bool {
        matches!(self, Transfers::Other(_))
    }
}

/// Defines the type of a [crate::Transfer]. See <https://gtfs.org/reference/static/#transferstxt> `transfer_type`
#[derive(Debug, Derivative, Copy, Clone, PartialEq, Eq, Hash)]
#[derivative(Default)]
pub enum TransferType {
    /// Recommended transfer point between routes
    #[derivative(Default)]
    Recommended,
    /// Departing vehicle waits for arriving one
    Timed,
    /// Transfer requires a minimum amount of time between arrival and departure to ensure a connection.
    MinTime,
    /// Transfer is not possible at this location
    Impossible,
    /// Passengers can stay onboard the same vehicle to transfer from one trip to another
    StayOnBoard,
    /// In-seat transfers are not allowed, passengers must alight and re-board
    MustAlight,
    /// An unknown value not in the specification
    Unknown(i32),
}

impl GtfsCode for TransferType {
    fn from_code(code: i32) -> Self {
        match code {
            0 => TransferType::Recommended,
            1 => TransferType::Timed,
            2 => TransferType::MinTime,
            3 => TransferType::Impossible,
            4 => TransferType::StayOnBoard,
            5 => TransferType::MustAlight,
            i => TransferType::Unknown(i),
        }
    }

    fn code(&self) -> i32 {
        match self {
            TransferType::Recommended => 0,
            TransferType::Timed => 1,
            TransferType::MinTime => 2,
            TransferType::Impossible => 3,
            TransferType::StayOnBoard => 4,
            TransferType::MustAlight => 5,
            TransferType::Unknown(i) => *i,
        }
    }

    fn is_unknown(&self) -> bool {
        matches!(self, TransferType::Unknown(_))
    }
}

/// Type of pathway between [crate::Pathway::from_stop_id] and [crate::Pathway::to_stop_id]
#[derive(Debug, Derivative, Copy, Clone, PartialEq, Eq, Hash)]
#[derivative(Default)]
pub enum PathwayMode {
    /// A walkway
    #[derivative(Default)]
    Walkway,
    /// Stairs
    Stairs,
    /// Moving sidewalk / travelator
    MovingSidewalk,
    /// Escalator
    Escalator,
    /// Elevator
    Elevator,
    /// A pathway that crosses into an area of the station where a proof of payment is required
    FareGate,
    /// A pathway exiting an area where proof-of-payment is required into an area where proof-of-payment is no longer required
    ExitGate,
    /// An unknown value not in the specification
    Unknown(i32),
}

impl GtfsCode for PathwayMode {
    fn from_code(code: i32) -> Self {
        match code {
            1 => PathwayMode::Walkway,
            2 => PathwayMode::Stairs,
            3 => PathwayMode::MovingSidewalk,
            4 => PathwayMode::Escalator,
            5 => PathwayMode::Elevator,
            6 => PathwayMode::FareGate,
            7 => PathwayMode::ExitGate,
            i => PathwayMode::Unknown(i),
        }
    }

    fn code(&self) -> i32 {
        match self {
            PathwayMode::Walkway => 1,
            PathwayMode::Stairs => 2,
            PathwayMode::MovingSidewalk => 3,
            PathwayMode::Escalator => 4,
            PathwayMode::Elevator => 5,
            PathwayMode::FareGate => 6,
            PathwayMode::ExitGate => 7,
            PathwayMode::Unknown(i) => *i,
        }
    }

    fn is_unknown(&self) -> bool {
        matches!(self, PathwayMode::Unknown(_))
    }
}

/// Indicates in which direction the pathway can be used
#[derive(Debug, Derivative, Copy, Clone, PartialEq, Eq, Hash)]
#[derivative(Default)]
pub enum PathwayDirectionType {
    /// Unidirectional pathway, it can only be used from [crate::Pathway::from_stop_id] to [crate::Pathway::to_stop_id].
    #[derivative(Default)]
    Unidirectional,
    /// Bidirectional pathway, it can be used in the two directions.
    Bidirectional,
    /// An unknown value not in the specification
    Unknown(i32),
}

impl GtfsCode for PathwayDirectionType {
    fn from_code(code: i32) -> Self {
        match code {
            0 => PathwayDirectionType::Unidirectional,
            1 => PathwayDirectionType::Bidirectional,
            i => PathwayDirectionType::Unknown(i),
        }
    }

    fn code(&self) -> i32 {
        match self {
            PathwayDirectionType::Unidirectional => 0,
            PathwayDirectionType::Bidirectional => 1,
            PathwayDirectionType::Unknown(i) => *i,
        }
    }

    fn is_unknown(&self) -> bool {
        matches!(self, PathwayDirectionType::Unknown(_))
    }
}

#[test]
fn extended_route_types_fold_into_basic_ones() {
    assert_eq!(RouteType::Bus, RouteType::from_code(3));
    assert_eq!(RouteType::Bus, RouteType::from_code(702));
    assert_eq!(RouteType::Coach, RouteType::from_code(200));
    assert_eq!(RouteType::Other(42), RouteType::from_code(42));
    assert!(RouteType::from_code(42).is_unknown());
    assert_eq!(LocationType::Unknown(9), LocationType::from_code(9));
}
