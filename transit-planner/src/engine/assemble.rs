//! Turning routed journeys into door-to-door itineraries.

use chrono::{Duration, NaiveDate};

use crate::domain::{
    DomainError, Instant, Itinerary, LatLon, Leg, Place, StopIdx, StreetLeg, StreetMode,
    TransitLeg, WaitLeg,
};
use crate::graph::TransportGraph;
use crate::raptor::{Journey, JourneyLeg, NearbyStop};
use crate::walk::{WalkPathFinder, encode_polyline};

use super::EngineConfig;
use super::shape::extract_section;

/// Color used for routes without one.
pub const DEFAULT_ROUTE_COLOR: &str = "#1976D2";

/// A route color with exactly one leading `#`.
pub fn normalize_color(color: Option<&str>) -> String {
    match color.map(|c| c.trim().trim_start_matches('#')) {
        Some(hex) if !hex.is_empty() => format!("#{hex}"),
        _ => DEFAULT_ROUTE_COLOR.to_string(),
    }
}

/// Where an itinerary starts and ends, and the stops used to get on and off
/// the network.
#[derive(Debug, Clone, Copy)]
pub struct Endpoints {
    pub origin: LatLon,
    pub destination: LatLon,
    pub origin_stop: NearbyStop,
    pub destination_stop: NearbyStop,
}

/// Builds itineraries against one graph and walk finder.
pub struct Assembler<'a> {
    graph: &'a TransportGraph,
    walker: &'a WalkPathFinder,
    config: &'a EngineConfig,
}

impl<'a> Assembler<'a> {
    pub fn new(graph: &'a TransportGraph, walker: &'a WalkPathFinder, config: &'a EngineConfig) -> Self {
        Self {
            graph,
            walker,
            config,
        }
    }

    fn stop_place(&self, idx: StopIdx) -> Place {
        let stop = self.graph.stop(idx);
        Place::stop(stop.stop_id.clone(), stop.name.clone(), stop.position())
    }

    /// Build the itinerary for `journey`, leaving the query origin at `base`.
    ///
    /// Schedule times are resolved against `date` in `base`'s UTC offset.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the resulting legs are not time-ordered.
    pub fn build_itinerary(
        &self,
        endpoints: &Endpoints,
        journey: &Journey,
        base: Instant,
        date: NaiveDate,
    ) -> Result<Itinerary, DomainError> {
        let offset = *base.offset();
        let wait_threshold = self.config.wait_threshold();
        let mut legs = Vec::with_capacity(journey.legs.len() * 2 + 2);
        let mut current = base;

        let first = endpoints.origin_stop;
        if first.walk_seconds > 0 {
            let to = self.stop_place(first.stop);
            let path = self.walker.compute_direct_path(endpoints.origin, to.position);
            let arrival = current + Duration::seconds(i64::from(first.walk_seconds));
            legs.push(Leg::Street(StreetLeg {
                mode: StreetMode::Walk,
                from: Place::point("Origin", endpoints.origin),
                to,
                departure: current,
                arrival,
                distance_m: first.distance_m,
                polyline: path.polyline(),
            }));
            current = arrival;
        }

        for leg in &journey.legs {
            match leg {
                JourneyLeg::Transit {
                    trip,
                    route,
                    board,
                    alight,
                    board_time,
                    alight_time,
                } => {
                    let departure = board_time.on(date, offset);
                    if departure - current > wait_threshold {
                        legs.push(Leg::Wait(WaitLeg {
                            at: self.stop_place(*board),
                            start: current,
                            end: departure,
                        }));
                    }

                    let arrival = alight_time.on(date, offset);
                    if board != alight {
                        let route = self.graph.route(*route);
                        let trip = self.graph.trip(*trip);
                        let from = self.stop_place(*board);
                        let to = self.stop_place(*alight);
                        let polyline = trip
                            .shape_id
                            .as_deref()
                            .and_then(|id| self.graph.shape(id))
                            .and_then(|shape| extract_section(shape, from.position, to.position))
                            .and_then(|points| encode_polyline(&points));

                        legs.push(Leg::Transit(TransitLeg {
                            mode: route.mode(),
                            from,
                            to,
                            departure,
                            arrival,
                            route_id: route.route_id.clone(),
                            route_short_name: route.display_name().map(String::from),
                            route_color: normalize_color(route.color.as_deref()),
                            trip_id: trip.trip_id.clone(),
                            headsign: trip.headsign.clone(),
                            polyline,
                        }));
                    }
                    current = arrival;
                }
                JourneyLeg::Walk {
                    from,
                    to,
                    walk_seconds,
                    distance_m,
                    ..
                } => {
                    let from_place = self.stop_place(*from);
                    let to_place = self.stop_place(*to);
                    let path =
                        self.walker
                            .path_between(from.0, to.0, from_place.position, to_place.position);
                    let arrival = current + Duration::seconds(i64::from(*walk_seconds));
                    legs.push(Leg::Street(StreetLeg {
                        mode: StreetMode::Walk,
                        from: from_place,
                        to: to_place,
                        departure: current,
                        arrival,
                        distance_m: *distance_m,
                        polyline: path.polyline(),
                    }));
                    current = arrival;
                }
            }
        }

        let last = endpoints.destination_stop;
        if last.walk_seconds > 0 {
            let from = self.stop_place(last.stop);
            let path = self.walker.compute_direct_path(from.position, endpoints.destination);
            let arrival = current + Duration::seconds(i64::from(last.walk_seconds));
            legs.push(Leg::Street(StreetLeg {
                mode: StreetMode::Walk,
                from,
                to: Place::point("Destination", endpoints.destination),
                departure: current,
                arrival,
                distance_m: last.distance_m,
                polyline: path.polyline(),
            }));
        }

        Itinerary::new(legs)
    }

    /// A single-leg itinerary walking or cycling straight from `from` to `to`.
    pub fn street_itinerary(
        &self,
        mode: StreetMode,
        from: LatLon,
        to: LatLon,
        departure: Instant,
    ) -> Result<Itinerary, DomainError> {
        let path = self.walker.compute_direct_path(from, to);
        let speed = match mode {
            StreetMode::Walk => self.config.walk_speed,
            StreetMode::Bicycle => self.config.bicycle_speed,
        };
        let seconds = crate::domain::travel_seconds(path.distance_m, speed);

        Itinerary::new(vec![Leg::Street(StreetLeg {
            mode,
            from: Place::point("Origin", from),
            to: Place::point("Destination", to),
            departure,
            arrival: departure + Duration::seconds(i64::from(seconds)),
            distance_m: path.distance_m,
            polyline: path.polyline(),
        })])
    }
}
