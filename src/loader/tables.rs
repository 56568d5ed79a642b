//! One descriptor per table: its columns and how a row becomes a record
use super::converter::{Mandatory, Optional};
use super::{report_duplicate, LoadContext, RowConverter, TableDescriptor};
use crate::report::{IssueKind, ReportIssue};
use gtfs_model::fields::default_route_color;
use gtfs_model::*;
use gtfs_store::{AppendableDao, ReadOnlyDao};

fn id_or_empty<T>(id: &Option<Id<T>>) -> &str {
    id.as_ref().map(Id::as_str).unwrap_or_default()
}

macro_rules! descriptor {
    (
        $descriptor:ident, $record:ty, mandatory: $mandatory:expr,
        columns: [$($column:literal),* $(,)?],
        required: [$($required:literal),* $(,)?],
        |$row:ident, $context:ident| $body:block
    ) => {
        pub struct $descriptor;

        impl TableDescriptor for $descriptor {
            fn table_name(&self) -> &'static str {
                <$record as Record>::TABLE_NAME
            }

            fn mandatory(&self) -> bool {
                $mandatory
            }

            fn columns(&self) -> &'static [&'static str] {
                &[$($column),*]
            }

            fn mandatory_columns(&self) -> &'static [&'static str] {
                &[$($required),*]
            }

            fn parse_and_save(&self, $row: &mut RowConverter<'_>, $context: &mut LoadContext<'_>) $body
        }
    };
}

descriptor!(FeedInfoTable, FeedInfo, mandatory: false,
    columns: ["feed_publisher_name", "feed_publisher_url", "feed_lang", "default_lang",
        "feed_start_date", "feed_end_date", "feed_version", "feed_contact_email", "feed_contact_url"],
    required: ["feed_publisher_name", "feed_publisher_url", "feed_lang"],
    |row, context| {
        let feed_info = FeedInfo {
            name: row.string("feed_publisher_name", Mandatory),
            url: row.string("feed_publisher_url", Mandatory),
            lang: row.string("feed_lang", Mandatory),
            default_lang: row.string("default_lang", Optional),
            start_date: row.date("feed_start_date", Optional),
            end_date: row.date("feed_end_date", Optional),
            version: row.string("feed_version", Optional),
            contact_email: row.string("feed_contact_email", Optional),
            contact_url: row.string("feed_contact_url", Optional),
            line: row.line(),
        };
        if let Some(previous) = context.dao.feed_info() {
            report_duplicate(row, previous.source_ref(), &[], "feed_info.txt has a single row");
        }
        let source = row.source_context();
        context.dao.set_feed_info(feed_info, &source);
    }
);

descriptor!(AgencyTable, Agency, mandatory: true,
    columns: ["agency_id", "agency_name", "agency_url", "agency_timezone", "agency_lang",
        "agency_phone", "agency_fare_url", "agency_email"],
    required: ["agency_name", "agency_url", "agency_timezone"],
    |row, context| {
        let agency = Agency {
            id: row.id("agency_id", Optional),
            name: row.string("agency_name", Mandatory),
            url: row.string("agency_url", Mandatory),
            timezone: row.string("agency_timezone", Mandatory),
            lang: row.string("agency_lang", Optional),
            phone: row.string("agency_phone", Optional),
            fare_url: row.string("agency_fare_url", Optional),
            email: row.string("agency_email", Optional),
            line: row.line(),
        };
        if let Some(previous) = context.dao.get_agency(agency.id.as_ref()) {
            report_duplicate(row, previous.source_ref(), &["agency_id"], id_or_empty(&agency.id));
        }
        let source = row.source_context();
        context.dao.add_agency(agency, &source);
    }
);

descriptor!(LevelTable, Level, mandatory: false,
    columns: ["level_id", "level_index", "level_name"],
    required: ["level_id", "level_index"],
    |row, context| {
        let Some(id) = row.id("level_id", Mandatory) else {
            return;
        };
        let level = Level {
            id,
            index: row.f64("level_index", Mandatory),
            name: row.string("level_name", Optional),
            line: row.line(),
        };
        if let Some(previous) = context.dao.get_level(&level.id) {
            report_duplicate(row, previous.source_ref(), &["level_id"], level.id.as_str());
        }
        let source = row.source_context();
        context.dao.add_level(level, &source);
    }
);

descriptor!(StopTable, Stop, mandatory: true,
    columns: ["stop_id", "stop_code", "stop_name", "tts_stop_name", "stop_desc", "stop_lat",
        "stop_lon", "zone_id", "stop_url", "location_type", "parent_station", "stop_timezone",
        "wheelchair_boarding", "level_id", "platform_code"],
    required: ["stop_id"],
    |row, context| {
        let Some(id) = row.id("stop_id", Mandatory) else {
            return;
        };
        let location_type: LocationType = row.code("location_type", Optional);
        // Generic nodes and boarding areas may have neither name nor position
        let positioned = if matches!(
            location_type,
            LocationType::StopPoint | LocationType::StopArea | LocationType::StationEntrance
        ) {
            Mandatory
        } else {
            Optional
        };
        let stop = Stop {
            id,
            code: row.string("stop_code", Optional),
            name: row.string("stop_name", positioned),
            description: row.string("stop_desc", Optional),
            location_type,
            parent_station: row.id("parent_station", Optional),
            zone_id: row.id("zone_id", Optional),
            url: row.string("stop_url", Optional),
            latitude: row.coordinate("stop_lat", positioned, 90.0),
            longitude: row.coordinate("stop_lon", positioned, 180.0),
            timezone: row.string("stop_timezone", Optional),
            wheelchair_boarding: row.code("wheelchair_boarding", Optional),
            level_id: row.id("level_id", Optional),
            platform_code: row.string("platform_code", Optional),
            line: row.line(),
        };
        if let Some(previous) = context.dao.get_stop(&stop.id) {
            report_duplicate(row, previous.source_ref(), &["stop_id"], stop.id.as_str());
        }
        let source = row.source_context();
        context.dao.add_stop(stop, &source);
    }
);

descriptor!(RouteTable, Route, mandatory: true,
    columns: ["route_id", "agency_id", "route_short_name", "route_long_name", "route_desc",
        "route_type", "route_url", "route_color", "route_text_color", "route_sort_order",
        "continuous_pickup", "continuous_drop_off", "network_id"],
    required: ["route_id", "route_type"],
    |row, context| {
        let Some(id) = row.id("route_id", Mandatory) else {
            return;
        };
        let route = Route {
            id,
            short_name: row.string("route_short_name", Optional),
            long_name: row.string("route_long_name", Optional),
            desc: row.string("route_desc", Optional),
            route_type: row.code("route_type", Mandatory),
            url: row.string("route_url", Optional),
            agency_id: row.id("agency_id", Optional),
            order: row.u32("route_sort_order", Optional),
            color: row.color("route_color").unwrap_or_else(default_route_color),
            text_color: row.color("route_text_color").unwrap_or_default(),
            line: row.line(),
        };
        if route.short_name.is_none() && route.long_name.is_none() {
            row.report(
                ReportIssue::new(IssueKind::MissingMandatoryValue, "a route needs a short or a long name")
                    .fields(&["route_short_name", "route_long_name"]),
            );
        }
        if let Some(previous) = context.dao.get_route(&route.id) {
            report_duplicate(row, previous.source_ref(), &["route_id"], route.id.as_str());
        }
        let source = row.source_context();
        context.dao.add_route(route, &source);
    }
);

descriptor!(CalendarTable, Calendar, mandatory: false,
    columns: ["service_id", "monday", "tuesday", "wednesday", "thursday", "friday", "saturday",
        "sunday", "start_date", "end_date"],
    required: ["service_id", "monday", "tuesday", "wednesday", "thursday", "friday", "saturday",
        "sunday", "start_date", "end_date"],
    |row, context| {
        let Some(id) = row.id("service_id", Mandatory) else {
            return;
        };
        let calendar = Calendar {
            id,
            monday: row.bool("monday", Mandatory, false),
            tuesday: row.bool("tuesday", Mandatory, false),
            wednesday: row.bool("wednesday", Mandatory, false),
            thursday: row.bool("thursday", Mandatory, false),
            friday: row.bool("friday", Mandatory, false),
            saturday: row.bool("saturday", Mandatory, false),
            sunday: row.bool("sunday", Mandatory, false),
            start_date: row.date("start_date", Mandatory),
            end_date: row.date("end_date", Mandatory),
            line: row.line(),
        };
        if let Some(previous) = context.dao.get_calendar(&calendar.id) {
            report_duplicate(row, previous.source_ref(), &["service_id"], calendar.id.as_str());
        }
        let source = row.source_context();
        context.validate(&context.validators.calendars, &calendar, &source);
        context.dao.add_calendar(calendar, &source);
    }
);

descriptor!(CalendarDateTable, CalendarDate, mandatory: false,
    columns: ["service_id", "date", "exception_type"],
    required: ["service_id", "date", "exception_type"],
    |row, context| {
        let Some(service_id) = row.id("service_id", Mandatory) else {
            return;
        };
        let calendar_date = CalendarDate {
            service_id,
            date: row.date("date", Mandatory),
            // Absent: neither added nor removed
            exception_type: row
                .code_opt("exception_type", Mandatory)
                .unwrap_or(Exception::Unknown(0)),
            line: row.line(),
        };
        if calendar_date.date.is_some() {
            let previous = context
                .dao
                .calendar_dates_of(&calendar_date.service_id)
                .iter()
                .find(|d| d.date == calendar_date.date);
            if let Some(previous) = previous {
                let key = format!(
                    "{} {}",
                    calendar_date.service_id,
                    row.source_info().get("date").unwrap_or_default()
                );
                report_duplicate(row, previous.source_ref(), &["service_id", "date"], key);
            }
        }
        let source = row.source_context();
        context.dao.add_calendar_date(calendar_date, &source);
    }
);

descriptor!(ShapeTable, ShapePoint, mandatory: false,
    columns: ["shape_id", "shape_pt_lat", "shape_pt_lon", "shape_pt_sequence", "shape_dist_traveled"],
    required: ["shape_id", "shape_pt_lat", "shape_pt_lon", "shape_pt_sequence"],
    |row, context| {
        let Some(shape_id) = row.id("shape_id", Mandatory) else {
            return;
        };
        let shape_point = ShapePoint {
            shape_id,
            latitude: row.f64("shape_pt_lat", Mandatory),
            longitude: row.f64("shape_pt_lon", Mandatory),
            sequence: row.sequence("shape_pt_sequence"),
            dist_traveled: row.f32("shape_dist_traveled", Optional),
            line: row.line(),
        };
        let source = row.source_context();
        context.validate(&context.validators.shape_points, &shape_point, &source);
        context.dao.add_shape_point(shape_point, &source);
    }
);

descriptor!(TripTable, Trip, mandatory: true,
    columns: ["route_id", "service_id", "trip_id", "trip_headsign", "trip_short_name",
        "direction_id", "block_id", "shape_id", "wheelchair_accessible", "bikes_allowed"],
    required: ["route_id", "service_id", "trip_id"],
    |row, context| {
        let Some(id) = row.id("trip_id", Mandatory) else {
            return;
        };
        let trip = Trip {
            id,
            service_id: row.id("service_id", Mandatory),
            route_id: row.id("route_id", Mandatory),
            shape_id: row.id("shape_id", Optional),
            trip_headsign: row.string("trip_headsign", Optional),
            trip_short_name: row.string("trip_short_name", Optional),
            direction_id: row.code_opt("direction_id", Optional),
            block_id: row.string("block_id", Optional),
            wheelchair_accessible: row.code("wheelchair_accessible", Optional),
            bikes_allowed: row.code("bikes_allowed", Optional),
            line: row.line(),
        };
        if let Some(previous) = context.dao.get_trip(&trip.id) {
            report_duplicate(row, previous.source_ref(), &["trip_id"], trip.id.as_str());
        }
        let source = row.source_context();
        context.validate(&context.validators.trips, &trip, &source);
        context.dao.add_trip(trip, &source);
    }
);

descriptor!(StopTimeTable, StopTime, mandatory: true,
    columns: ["trip_id", "arrival_time", "departure_time", "stop_id", "stop_sequence",
        "stop_headsign", "pickup_type", "drop_off_type", "continuous_pickup",
        "continuous_drop_off", "shape_dist_traveled", "timepoint"],
    required: ["trip_id", "stop_id", "stop_sequence"],
    |row, context| {
        let Some(trip_id) = row.id("trip_id", Mandatory) else {
            return;
        };
        let stop_time = StopTime {
            trip_id,
            arrival_time: row.time("arrival_time", Optional),
            departure_time: row.time("departure_time", Optional),
            stop_id: row.id("stop_id", Mandatory),
            stop_sequence: row.sequence("stop_sequence"),
            stop_headsign: row.string("stop_headsign", Optional),
            pickup_type: row.code("pickup_type", Optional),
            drop_off_type: row.code("drop_off_type", Optional),
            shape_dist_traveled: row.f32("shape_dist_traveled", Optional),
            timepoint: row.code("timepoint", Optional),
            line: row.line(),
        };
        let source = row.source_context();
        context.validate(&context.validators.stop_times, &stop_time, &source);
        context.dao.add_stop_time(stop_time, &source);
    }
);

descriptor!(FrequencyTable, Frequency, mandatory: false,
    columns: ["trip_id", "start_time", "end_time", "headway_secs", "exact_times"],
    required: ["trip_id", "start_time", "end_time", "headway_secs"],
    |row, context| {
        let Some(trip_id) = row.id("trip_id", Mandatory) else {
            return;
        };
        let frequency = Frequency {
            trip_id,
            start_time: row.time("start_time", Mandatory),
            end_time: row.time("end_time", Mandatory),
            headway_secs: row.u32("headway_secs", Mandatory),
            exact_times: row.code("exact_times", Optional),
            line: row.line(),
        };
        if let Some(start_time) = frequency.start_time {
            let previous = context
                .dao
                .frequencies_of(&frequency.trip_id)
                .iter()
                .find(|f| f.start_time == Some(start_time));
            if let Some(previous) = previous {
                let key = format!("{} {}", frequency.trip_id, start_time);
                report_duplicate(row, previous.source_ref(), &["trip_id", "start_time"], key);
            }
        }
        let source = row.source_context();
        context.validate(&context.validators.frequencies, &frequency, &source);
        context.dao.add_frequency(frequency, &source);
    }
);

descriptor!(TransferTable, Transfer, mandatory: false,
    columns: ["from_stop_id", "to_stop_id", "from_route_id", "to_route_id", "from_trip_id",
        "to_trip_id", "transfer_type", "min_transfer_time"],
    required: ["transfer_type"],
    |row, context| {
        let transfer = Transfer {
            from_stop_id: row.id("from_stop_id", Optional),
            to_stop_id: row.id("to_stop_id", Optional),
            from_route_id: row.id("from_route_id", Optional),
            to_route_id: row.id("to_route_id", Optional),
            from_trip_id: row.id("from_trip_id", Optional),
            to_trip_id: row.id("to_trip_id", Optional),
            transfer_type: row.code("transfer_type", Optional),
            min_transfer_time: row.u32("min_transfer_time", Optional),
            line: row.line(),
        };
        if let Some(previous) = context.dao.get_transfer(&transfer.key()) {
            let key = format!(
                "{} -> {}",
                id_or_empty(&transfer.from_stop_id),
                id_or_empty(&transfer.to_stop_id)
            );
            report_duplicate(
                row,
                previous.source_ref(),
                &["from_stop_id", "to_stop_id", "from_route_id", "to_route_id", "from_trip_id", "to_trip_id"],
                key,
            );
        }
        let source = row.source_context();
        context.validate(&context.validators.transfers, &transfer, &source);
        context.dao.add_transfer(transfer, &source);
    }
);

descriptor!(PathwayTable, Pathway, mandatory: false,
    columns: ["pathway_id", "from_stop_id", "to_stop_id", "pathway_mode", "is_bidirectional",
        "length", "traversal_time", "stair_count", "max_slope", "min_width", "signposted_as",
        "reversed_signposted_as"],
    required: ["pathway_id", "from_stop_id", "to_stop_id", "pathway_mode", "is_bidirectional"],
    |row, context| {
        let Some(id) = row.id("pathway_id", Mandatory) else {
            return;
        };
        let pathway = Pathway {
            id,
            from_stop_id: row.id("from_stop_id", Mandatory),
            to_stop_id: row.id("to_stop_id", Mandatory),
            mode: row.code("pathway_mode", Mandatory),
            is_bidirectional: row.code("is_bidirectional", Mandatory),
            length: row.f32("length", Optional),
            traversal_time: row.u32("traversal_time", Optional),
            stair_count: row.number("stair_count", Optional, "an integer"),
            max_slope: row.f32("max_slope", Optional),
            min_width: row.f32("min_width", Optional),
            signposted_as: row.string("signposted_as", Optional),
            reversed_signposted_as: row.string("reversed_signposted_as", Optional),
            line: row.line(),
        };
        if let Some(previous) = context.dao.get_pathway(&pathway.id) {
            report_duplicate(row, previous.source_ref(), &["pathway_id"], pathway.id.as_str());
        }
        let source = row.source_context();
        context.dao.add_pathway(pathway, &source);
    }
);

descriptor!(FareAttributeTable, FareAttribute, mandatory: false,
    columns: ["fare_id", "price", "currency_type", "payment_method", "transfers", "agency_id",
        "transfer_duration"],
    required: ["fare_id", "price", "currency_type", "payment_method", "transfers"],
    |row, context| {
        let Some(id) = row.id("fare_id", Mandatory) else {
            return;
        };
        let fare_attribute = FareAttribute {
            id,
            price: row.f64("price", Mandatory),
            currency: row.string("currency_type", Mandatory),
            payment_method: row
                .code_opt("payment_method", Mandatory)
                .unwrap_or(PaymentMethod::Aboard),
            // Empty means unlimited
            transfers: row.code("transfers", Optional),
            agency_id: row.id("agency_id", Optional),
            transfer_duration: row.u32("transfer_duration", Optional),
            line: row.line(),
        };
        if let Some(previous) = context.dao.get_fare_attribute(&fare_attribute.id) {
            report_duplicate(row, previous.source_ref(), &["fare_id"], fare_attribute.id.as_str());
        }
        let source = row.source_context();
        context.dao.add_fare_attribute(fare_attribute, &source);
    }
);

descriptor!(FareRuleTable, FareRule, mandatory: false,
    columns: ["fare_id", "route_id", "origin_id", "destination_id", "contains_id"],
    required: ["fare_id"],
    |row, context| {
        let fare_rule = FareRule {
            fare_id: row.id("fare_id", Mandatory),
            route_id: row.id("route_id", Optional),
            origin_id: row.id("origin_id", Optional),
            destination_id: row.id("destination_id", Optional),
            contains_id: row.id("contains_id", Optional),
            line: row.line(),
        };
        if let Some(previous) = context.dao.get_fare_rule(&fare_rule.key()) {
            report_duplicate(
                row,
                previous.source_ref(),
                &["fare_id", "route_id", "origin_id", "destination_id", "contains_id"],
                id_or_empty(&fare_rule.fare_id),
            );
        }
        let source = row.source_context();
        context.dao.add_fare_rule(fare_rule, &source);
    }
);

descriptor!(AreaTable, Area, mandatory: false,
    columns: ["area_id", "area_name"],
    required: ["area_id"],
    |row, context| {
        let Some(id) = row.id("area_id", Mandatory) else {
            return;
        };
        let area = Area {
            id,
            name: row.string("area_name", Optional),
            line: row.line(),
        };
        if let Some(previous) = context.dao.get_area(&area.id) {
            report_duplicate(row, previous.source_ref(), &["area_id"], area.id.as_str());
        }
        let source = row.source_context();
        context.dao.add_area(area, &source);
    }
);

descriptor!(TranslationTable, Translation, mandatory: false,
    columns: ["table_name", "field_name", "language", "translation", "record_id",
        "record_sub_id", "field_value"],
    required: ["table_name", "field_name", "language", "translation"],
    |row, context| {
        let table_name = row.string("table_name", Mandatory);
        let field_name = row.string("field_name", Mandatory);
        let language = row.string("language", Mandatory);
        let translated = row.string("translation", Mandatory);
        let (Some(table_name), Some(field_name), Some(language), Some(translated)) =
            (table_name, field_name, language, translated)
        else {
            return;
        };
        let translation = Translation {
            table_name,
            field_name,
            language,
            translation: translated,
            record_id: row.string("record_id", Optional),
            record_sub_id: row.string("record_sub_id", Optional),
            field_value: row.string("field_value", Optional),
            line: row.line(),
        };
        if let Some(previous) = context.dao.get_translation(&translation.key()) {
            let key = format!(
                "{}.{} {}",
                translation.table_name, translation.field_name, translation.language
            );
            report_duplicate(
                row,
                previous.source_ref(),
                &["table_name", "field_name", "language", "record_id", "record_sub_id", "field_value"],
                key,
            );
        }
        let source = row.source_context();
        context.dao.add_translation(translation, &source);
    }
);

descriptor!(AttributionTable, Attribution, mandatory: false,
    columns: ["attribution_id", "agency_id", "route_id", "trip_id", "organization_name",
        "is_producer", "is_operator", "is_authority", "attribution_url", "attribution_email",
        "attribution_phone"],
    required: ["organization_name"],
    |row, context| {
        let attribution = Attribution {
            id: row.id("attribution_id", Optional),
            agency_id: row.id("agency_id", Optional),
            route_id: row.id("route_id", Optional),
            trip_id: row.id("trip_id", Optional),
            organization_name: row.string("organization_name", Mandatory),
            is_producer: row.bool("is_producer", Optional, false),
            is_operator: row.bool("is_operator", Optional, false),
            is_authority: row.bool("is_authority", Optional, false),
            url: row.string("attribution_url", Optional),
            email: row.string("attribution_email", Optional),
            phone: row.string("attribution_phone", Optional),
            line: row.line(),
        };
        if !(attribution.is_producer || attribution.is_operator || attribution.is_authority) {
            row.report(
                ReportIssue::new(
                    IssueKind::InvalidFieldValue,
                    "an attribution needs at least one role",
                )
                .fields(&["is_producer", "is_operator", "is_authority"]),
            );
        }
        let source = row.source_context();
        context.dao.add_attribution(attribution, &source);
    }
);

const TABLES: &[&dyn TableDescriptor] = &[
    &FeedInfoTable,
    &AgencyTable,
    &LevelTable,
    &StopTable,
    &RouteTable,
    &CalendarTable,
    &CalendarDateTable,
    &ShapeTable,
    &TripTable,
    &StopTimeTable,
    &FrequencyTable,
    &TransferTable,
    &PathwayTable,
    &FareAttributeTable,
    &FareRuleTable,
    &AreaTable,
    &TranslationTable,
    &AttributionTable,
];

/// Descriptors of the known tables, referenced tables first
pub fn table_descriptors() -> &'static [&'static dyn TableDescriptor] {
    TABLES
}
