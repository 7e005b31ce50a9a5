//! Typed static feed records.
//!
//! These are the validated tables the graph is built from. Parsing raw feed
//! files into them is the job of [`crate::feed`]; the graph only ever sees
//! these types.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::{LatLon, ServiceTime};

/// A stop or station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopRecord {
    pub stop_id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// 0 or absent for a boarding point, 1 for a parent station.
    #[serde(default)]
    pub location_type: Option<u8>,
    #[serde(default)]
    pub parent_station: Option<String>,
}

impl StopRecord {
    /// Returns the stop position.
    pub fn position(&self) -> LatLon {
        LatLon::new(self.lat, self.lon)
    }

    /// Returns true for boarding points ("quays") as opposed to parent
    /// stations, which are usually absent from stop times.
    pub fn is_quay(&self) -> bool {
        self.location_type != Some(1) && !self.stop_id.contains(":StopPlace:")
    }
}

/// Vehicle category of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteMode {
    Tram,
    Metro,
    Rail,
    Bus,
    Ferry,
    CableCar,
    Gondola,
    Funicular,
}

impl RouteMode {
    /// Map a feed `route_type` code. Unknown codes are treated as buses.
    pub fn from_route_type(code: u16) -> Self {
        match code {
            0 => RouteMode::Tram,
            1 => RouteMode::Metro,
            2 => RouteMode::Rail,
            3 => RouteMode::Bus,
            4 => RouteMode::Ferry,
            5 => RouteMode::CableCar,
            6 => RouteMode::Gondola,
            7 => RouteMode::Funicular,
            _ => RouteMode::Bus,
        }
    }

    /// Upper-case label used in leg output.
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteMode::Tram => "TRAM",
            RouteMode::Metro => "METRO",
            RouteMode::Rail => "RAIL",
            RouteMode::Bus => "BUS",
            RouteMode::Ferry => "FERRY",
            RouteMode::CableCar => "CABLE_CAR",
            RouteMode::Gondola => "GONDOLA",
            RouteMode::Funicular => "FUNICULAR",
        }
    }
}

/// A transit line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRecord {
    pub route_id: String,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub long_name: Option<String>,
    /// Hex color, with or without a leading `#`.
    #[serde(default)]
    pub color: Option<String>,
    pub route_type: u16,
}

impl RouteRecord {
    /// Returns the vehicle category.
    pub fn mode(&self) -> RouteMode {
        RouteMode::from_route_type(self.route_type)
    }

    /// Short name if present, else long name.
    pub fn display_name(&self) -> Option<&str> {
        self.short_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.long_name.as_deref().filter(|s| !s.is_empty()))
    }
}

/// One scheduled run of a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    pub trip_id: String,
    pub route_id: String,
    pub service_id: String,
    #[serde(default)]
    pub shape_id: Option<String>,
    #[serde(default)]
    pub headsign: Option<String>,
}

/// A trip's visit to a stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopTimeRecord {
    pub trip_id: String,
    pub stop_id: String,
    pub arrival: ServiceTime,
    pub departure: ServiceTime,
    pub stop_sequence: u32,
}

/// Weekly service pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarRecord {
    pub service_id: String,
    pub monday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub thursday: bool,
    pub friday: bool,
    pub saturday: bool,
    pub sunday: bool,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl CalendarRecord {
    /// Returns true if the weekday bit for `date` is set.
    pub fn runs_on_weekday(&self, date: NaiveDate) -> bool {
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
}

/// Kind of a date-specific calendar exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExceptionType {
    /// Feed code 1: service runs on this date.
    Added,
    /// Feed code 2: service does not run on this date.
    Removed,
}

impl ExceptionType {
    /// Map a feed `exception_type` code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(ExceptionType::Added),
            2 => Some(ExceptionType::Removed),
            _ => None,
        }
    }
}

/// A date-specific service exception.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarDateRecord {
    pub service_id: String,
    pub date: NaiveDate,
    pub exception_type: ExceptionType,
}

/// One vertex of a trip shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapePointRecord {
    pub shape_id: String,
    pub lat: f64,
    pub lon: f64,
    pub sequence: u32,
}

/// An explicit walking transfer between stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub from_stop_id: String,
    pub to_stop_id: String,
    #[serde(default)]
    pub min_transfer_time: Option<u32>,
}

/// A complete static dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub stops: Vec<StopRecord>,
    pub routes: Vec<RouteRecord>,
    pub trips: Vec<TripRecord>,
    pub stop_times: Vec<StopTimeRecord>,
    #[serde(default)]
    pub calendar: Vec<CalendarRecord>,
    #[serde(default)]
    pub calendar_dates: Vec<CalendarDateRecord>,
    #[serde(default)]
    pub shapes: Vec<ShapePointRecord>,
    #[serde(default)]
    pub transfers: Vec<TransferRecord>,
}
