use std::collections::HashMap;

use csv::StringRecord;

/// Header-keyed view over one CSV row.
///
/// GTFS treats an empty field the same as an absent one, so both read back
/// as `None`.
pub struct Row<'a> {
    headers: &'a HashMap<String, usize>,
    record: &'a StringRecord,
}

impl<'a> Row<'a> {
    pub fn new(headers: &'a HashMap<String, usize>, record: &'a StringRecord) -> Self {
        Self { headers, record }
    }

    pub fn field(&self, name: &str) -> Option<&'a str> {
        let index = *self.headers.get(name)?;
        match self.record.get(index).map(str::trim) {
            None | Some("") => None,
            Some(value) => Some(value),
        }
    }

    fn text(&self, name: &str) -> Option<String> {
        self.field(name).map(str::to_string)
    }

    /// Numeric GTFS fields default to 0 when absent, empty, or unparseable.
    fn int_or_zero(&self, name: &str) -> i64 {
        self.field(name).and_then(|v| v.parse().ok()).unwrap_or(0)
    }

    fn flag(&self, name: &str) -> bool {
        self.int_or_zero(name) != 0
    }
}

/// A typed record parsed from one table of a GTFS feed.
pub trait FeedRecord: Sized {
    /// File name inside the archive, e.g. `stops.txt`.
    const TABLE: &'static str;

    /// Parse one CSV row. `None` drops the record, which happens when a
    /// required field is missing or unusable.
    fn parse(row: &Row<'_>) -> Option<Self>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct StopRecord {
    pub stop_id: String,
    pub name: String,
    pub description: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub location_type: i64,
    pub parent_station: Option<String>,
    pub wheelchair_boarding: i64,
}

impl FeedRecord for StopRecord {
    const TABLE: &'static str = "stops.txt";

    fn parse(row: &Row<'_>) -> Option<Self> {
        Some(Self {
            stop_id: row.text("stop_id")?,
            name: row.text("stop_name").unwrap_or_default(),
            description: row.text("stop_desc"),
            // Stops without a usable position are dropped.
            lat: row.field("stop_lat")?.parse().ok()?,
            lon: row.field("stop_lon")?.parse().ok()?,
            location_type: row.int_or_zero("location_type"),
            parent_station: row.text("parent_station"),
            wheelchair_boarding: row.int_or_zero("wheelchair_boarding"),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteRecord {
    pub route_id: String,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    /// `None` when the feed does not declare a mode; such routes never
    /// contribute to the stop route-type index.
    pub route_type: Option<i64>,
}

impl FeedRecord for RouteRecord {
    const TABLE: &'static str = "routes.txt";

    fn parse(row: &Row<'_>) -> Option<Self> {
        Some(Self {
            route_id: row.text("route_id")?,
            short_name: row.text("route_short_name"),
            long_name: row.text("route_long_name"),
            route_type: row.field("route_type").and_then(|v| v.parse().ok()),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TripRecord {
    pub trip_id: String,
    pub route_id: String,
    pub service_id: String,
    pub headsign: Option<String>,
    pub direction_id: i64,
    pub shape_id: Option<String>,
}

impl FeedRecord for TripRecord {
    const TABLE: &'static str = "trips.txt";

    fn parse(row: &Row<'_>) -> Option<Self> {
        Some(Self {
            trip_id: row.text("trip_id")?,
            route_id: row.text("route_id")?,
            service_id: row.text("service_id")?,
            headsign: row.text("trip_headsign"),
            direction_id: row.int_or_zero("direction_id"),
            shape_id: row.text("shape_id"),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StopTimeRecord {
    pub trip_id: String,
    /// Free-text `HH:MM:SS`, allowed to exceed 24:00:00 for trips crossing
    /// midnight. Stored verbatim.
    pub arrival_time: Option<String>,
    pub departure_time: Option<String>,
    pub stop_id: String,
    pub stop_sequence: i64,
    pub pickup_type: i64,
    pub drop_off_type: i64,
}

impl FeedRecord for StopTimeRecord {
    const TABLE: &'static str = "stop_times.txt";

    fn parse(row: &Row<'_>) -> Option<Self> {
        Some(Self {
            trip_id: row.text("trip_id")?,
            arrival_time: row.text("arrival_time"),
            departure_time: row.text("departure_time"),
            stop_id: row.text("stop_id")?,
            stop_sequence: row.int_or_zero("stop_sequence"),
            pickup_type: row.int_or_zero("pickup_type"),
            drop_off_type: row.int_or_zero("drop_off_type"),
        })
    }
}

/// A weekly recurrence rule from `calendar.txt`.
///
/// The date strings are kept raw; validation happens during service-day
/// expansion so a malformed rule only loses its weekly contribution.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarRecord {
    pub service_id: String,
    pub monday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub thursday: bool,
    pub friday: bool,
    pub saturday: bool,
    pub sunday: bool,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl FeedRecord for CalendarRecord {
    const TABLE: &'static str = "calendar.txt";

    fn parse(row: &Row<'_>) -> Option<Self> {
        Some(Self {
            service_id: row.text("service_id")?,
            monday: row.flag("monday"),
            tuesday: row.flag("tuesday"),
            wednesday: row.flag("wednesday"),
            thursday: row.flag("thursday"),
            friday: row.flag("friday"),
            saturday: row.flag("saturday"),
            sunday: row.flag("sunday"),
            start_date: row.text("start_date"),
            end_date: row.text("end_date"),
        })
    }
}

/// A per-date service exception from `calendar_dates.txt`.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarDateRecord {
    pub service_id: String,
    pub date: String,
    /// 1 adds service on the date, 2 removes it. Anything else is ignored
    /// by the expansion.
    pub exception_type: i64,
}

impl FeedRecord for CalendarDateRecord {
    const TABLE: &'static str = "calendar_dates.txt";

    fn parse(row: &Row<'_>) -> Option<Self> {
        Some(Self {
            service_id: row.text("service_id")?,
            date: row.text("date")?,
            exception_type: row.int_or_zero("exception_type"),
        })
    }
}
