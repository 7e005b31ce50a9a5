//! Domain types for the transit itinerary planner.
//!
//! This module contains the core domain model types: typed feed records,
//! coordinates, service-day times, graph indices and itineraries. Types that
//! carry invariants enforce them at construction time.

mod error;
mod geo;
mod ids;
mod itinerary;
mod records;
mod time;

pub use error::DomainError;
pub use geo::{EARTH_RADIUS_M, LatLon, travel_seconds};
pub use ids::{RouteIdx, StopIdx, TripIdx};
pub use itinerary::{Instant, Itinerary, Leg, Place, StreetLeg, StreetMode, TransitLeg, WaitLeg};
pub use records::{
    CalendarDateRecord, CalendarRecord, Dataset, ExceptionType, RouteMode, RouteRecord,
    ShapePointRecord, StopRecord, StopTimeRecord, TransferRecord, TripRecord,
};
pub use time::{ServiceTime, TimeError, service_midnight};
