//! Request and response types of the planning API.

use std::fmt;
use std::str::FromStr;

use chrono::{FixedOffset, SecondsFormat};
use serde::{Deserialize, Serialize};

use crate::domain::{Instant, Itinerary, LatLon, Leg, Place};

/// How the traveller wants to get there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum PlanMode {
    /// Transit with walking to, from and between stops.
    #[default]
    TransitWalk,
    Transit,
    Walk,
    Bicycle,
}

impl PlanMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanMode::TransitWalk => "transit+walk",
            PlanMode::Transit => "transit",
            PlanMode::Walk => "walk",
            PlanMode::Bicycle => "bicycle",
        }
    }

    /// Returns true for the modes answered without the router.
    pub fn is_direct(&self) -> bool {
        matches!(self, PlanMode::Walk | PlanMode::Bicycle)
    }
}

impl fmt::Display for PlanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanMode {
    type Err = String;

    /// Case-insensitive; `+`, `,` and a space (an unescaped `+` in a query
    /// string) all separate combined modes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace([',', ' '], "+");
        match normalized.as_str() {
            "transit+walk" | "walk+transit" => Ok(PlanMode::TransitWalk),
            "transit" => Ok(PlanMode::Transit),
            "walk" => Ok(PlanMode::Walk),
            "bicycle" | "bike" => Ok(PlanMode::Bicycle),
            _ => Err(format!("unknown mode: {s}")),
        }
    }
}

impl TryFrom<String> for PlanMode {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Request to plan an itinerary.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    pub origin: LatLon,

    pub destination: LatLon,

    /// Earliest departure (defaults to now)
    #[serde(default)]
    pub time: Option<Instant>,

    #[serde(default)]
    pub mode: PlanMode,

    /// Maximum walk to or from a stop, in metres
    #[serde(default)]
    pub max_walk_distance: Option<f64>,

    #[serde(default)]
    pub max_transfers: Option<usize>,
}

impl PlanRequest {
    /// A request with default mode and limits.
    pub fn new(origin: LatLon, destination: LatLon, time: Option<Instant>) -> Self {
        Self {
            origin,
            destination,
            time,
            mode: PlanMode::default(),
            max_walk_distance: None,
            max_transfers: None,
        }
    }
}

/// A leg endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceResult {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_id: Option<String>,
}

/// One leg of an itinerary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegResult {
    /// `WALK`, `BICYCLE`, `WAIT` or the transit mode (`BUS`, `TRAM`...)
    pub mode: &'static str,
    pub from: PlaceResult,
    pub to: PlaceResult,
    /// Duration in seconds
    pub duration: i64,
    pub departure_time: String,
    pub arrival_time: String,
    /// Street distance in metres
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_short_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headsign: Option<String>,
    /// Encoded polyline of the path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polyline: Option<String>,
}

/// An itinerary option.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryResult {
    /// Total duration in seconds
    pub duration: i64,
    /// Total walked distance in whole metres
    pub walk_distance: f64,
    pub transfers: usize,
    pub departure_time: String,
    pub arrival_time: String,
    pub legs: Vec<LegResult>,
}

/// Facts about how a response was produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanMetadata {
    /// `raptor-native`, or `direct` for walking and cycling
    pub engine: &'static str,
    pub no_route_found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub routes_count: usize,
    /// True if the search ran out of time
    pub partial: bool,
    pub compute_time_ms: u64,
}

impl PlanMetadata {
    pub fn found(
        engine: &'static str,
        routes_count: usize,
        partial: bool,
        compute_time_ms: u64,
    ) -> Self {
        Self {
            engine,
            no_route_found: false,
            message: None,
            routes_count,
            partial,
            compute_time_ms,
        }
    }

    pub fn no_route(engine: &'static str, partial: bool, compute_time_ms: u64) -> Self {
        Self {
            engine,
            no_route_found: true,
            message: Some("No itinerary found".to_string()),
            routes_count: 0,
            partial,
            compute_time_ms,
        }
    }
}

/// Response to a plan request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanResponse {
    /// Itineraries, best first
    pub routes: Vec<ItineraryResult>,
    pub metadata: PlanMetadata,
}

fn format_instant(instant: &Instant, offset: &FixedOffset) -> String {
    instant
        .with_timezone(offset)
        .to_rfc3339_opts(SecondsFormat::Secs, false)
}

impl PlaceResult {
    pub fn from_place(place: &Place) -> Self {
        Self {
            name: place.name.clone(),
            lat: place.position.lat,
            lon: place.position.lon,
            stop_id: place.stop_id.clone(),
        }
    }
}

impl LegResult {
    /// Create from a domain leg, with instants rendered in `offset`.
    pub fn from_leg(leg: &Leg, offset: &FixedOffset) -> Self {
        let mut result = Self {
            mode: leg.mode_label(),
            from: PlaceResult::from_place(leg.from()),
            to: PlaceResult::from_place(leg.to()),
            duration: leg.duration_seconds(),
            departure_time: format_instant(&leg.departure(), offset),
            arrival_time: format_instant(&leg.arrival(), offset),
            distance: None,
            route_id: None,
            route_short_name: None,
            route_color: None,
            trip_id: None,
            headsign: None,
            polyline: None,
        };

        match leg {
            Leg::Street(street) => {
                result.distance = Some(street.distance_m.round());
                result.polyline = street.polyline.clone();
            }
            Leg::Transit(transit) => {
                result.route_id = Some(transit.route_id.clone());
                result.route_short_name = transit.route_short_name.clone();
                result.route_color = Some(transit.route_color.clone());
                result.trip_id = Some(transit.trip_id.clone());
                result.headsign = transit.headsign.clone();
                result.polyline = transit.polyline.clone();
            }
            Leg::Wait(_) => {}
        }

        result
    }
}

impl ItineraryResult {
    /// Create from a domain itinerary, with instants rendered in `offset`.
    pub fn from_itinerary(itinerary: &Itinerary, offset: &FixedOffset) -> Self {
        Self {
            duration: itinerary.duration_seconds(),
            walk_distance: itinerary.walk_distance_m().round(),
            transfers: itinerary.transfers(),
            departure_time: format_instant(&itinerary.departure(), offset),
            arrival_time: format_instant(&itinerary.arrival(), offset),
            legs: itinerary
                .legs()
                .iter()
                .map(|leg| LegResult::from_leg(leg, offset))
                .collect(),
        }
    }
}
