//! Round-based public transit routing.
//!
//! Round `k` extends the best arrivals of round `k - 1` by one more transit
//! boarding followed by one pass of footpath relaxation. Each improvement
//! leaves a pointer so journeys can be rebuilt backwards from the
//! destination, one candidate per round that reached it.

mod pareto;

use chrono::NaiveDate;
use tracing::{debug, trace};

use crate::domain::{LatLon, RouteIdx, ServiceTime, StopIdx, TripIdx, travel_seconds};
use crate::graph::TransportGraph;

pub use pareto::{dominates, remove_dominated};

const UNREACHED: u32 = u32::MAX;

/// Router settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RaptorConfig {
    /// Rounds run at most `max_transfers + 1` times.
    pub max_transfers: usize,
    /// Radius for [`Raptor::find_nearby_stops`], in metres.
    pub walk_radius_m: f64,
    /// Walking speed in m/s.
    pub walk_speed: f64,
    /// Minimum time to change vehicles, in seconds.
    pub min_transfer_seconds: u32,
    /// Seconds added per transfer when comparing journeys.
    pub transfer_penalty_seconds: u32,
}

impl Default for RaptorConfig {
    fn default() -> Self {
        Self {
            max_transfers: 2,
            walk_radius_m: 800.0,
            walk_speed: 1.25,
            min_transfer_seconds: 180,
            transfer_penalty_seconds: 1200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RaptorError {
    #[error("unknown stop {0:?}")]
    UnknownStop(String),
}

/// One leg of a routed journey, in graph terms.
#[derive(Debug, Clone, PartialEq)]
pub enum JourneyLeg {
    Transit {
        trip: TripIdx,
        route: RouteIdx,
        board: StopIdx,
        alight: StopIdx,
        board_time: ServiceTime,
        alight_time: ServiceTime,
    },
    Walk {
        from: StopIdx,
        to: StopIdx,
        departure: ServiceTime,
        walk_seconds: u32,
        distance_m: f64,
    },
}

/// A stop-to-stop journey found by the router.
#[derive(Debug, Clone, PartialEq)]
pub struct Journey {
    pub legs: Vec<JourneyLeg>,
    pub departure: ServiceTime,
    pub arrival: ServiceTime,
    pub transfers: usize,
}

impl Journey {
    /// Routes of the transit legs, in order.
    pub fn routes(&self) -> impl Iterator<Item = RouteIdx> + '_ {
        self.legs.iter().filter_map(|leg| match leg {
            JourneyLeg::Transit { route, .. } => Some(*route),
            JourneyLeg::Walk { .. } => None,
        })
    }
}

/// A stop within walking distance of a coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbyStop {
    pub stop: StopIdx,
    pub distance_m: f64,
    pub walk_seconds: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Pointer {
    Transit {
        trip: TripIdx,
        route: RouteIdx,
        board: StopIdx,
        board_time: ServiceTime,
        alight_time: ServiceTime,
    },
    Walk {
        from: StopIdx,
        departure: ServiceTime,
        walk_seconds: u32,
        distance_m: f64,
    },
}

/// Per-round arrival and pointer tables of one search.
#[derive(Debug)]
pub(crate) struct Rounds {
    pub tau: Vec<Vec<u32>>,
    pub pointers: Vec<Vec<Option<Pointer>>>,
}

/// The router. Borrows the graph; owns only per-query tables.
pub struct Raptor<'a> {
    graph: &'a TransportGraph,
    config: RaptorConfig,
}

impl<'a> Raptor<'a> {
    pub fn new(graph: &'a TransportGraph, config: RaptorConfig) -> Self {
        Self { graph, config }
    }

    pub fn config(&self) -> &RaptorConfig {
        &self.config
    }

    /// Pareto-optimal journeys between two stops, leaving `origin_id` no
    /// earlier than `departure` on service day `date`.
    ///
    /// Unknown stop ids yield no journeys.
    pub fn compute_journeys(
        &self,
        origin_id: &str,
        destination_id: &str,
        departure: ServiceTime,
        date: NaiveDate,
    ) -> Vec<Journey> {
        match self.try_compute_journeys(origin_id, destination_id, departure, date) {
            Ok(journeys) => journeys,
            Err(e) => {
                debug!(error = %e, "no journeys computed");
                Vec::new()
            }
        }
    }

    fn try_compute_journeys(
        &self,
        origin_id: &str,
        destination_id: &str,
        departure: ServiceTime,
        date: NaiveDate,
    ) -> Result<Vec<Journey>, RaptorError> {
        let origin = self
            .graph
            .stop_idx(origin_id)
            .ok_or_else(|| RaptorError::UnknownStop(origin_id.to_string()))?;
        let destination = self
            .graph
            .stop_idx(destination_id)
            .ok_or_else(|| RaptorError::UnknownStop(destination_id.to_string()))?;

        let rounds = self.run_rounds(origin, departure, date);
        Ok(self.reconstruct(&rounds, origin, destination))
    }

    pub(crate) fn run_rounds(
        &self,
        origin: StopIdx,
        departure: ServiceTime,
        date: NaiveDate,
    ) -> Rounds {
        let n = self.graph.stop_count();
        let max_rounds = self.config.max_transfers + 1;

        let mut initial = vec![UNREACHED; n];
        initial[origin.0] = departure.seconds();
        let mut tau = vec![initial];
        let mut pointers: Vec<Vec<Option<Pointer>>> = vec![vec![None; n]];

        let mut marked = vec![origin];
        let mut route_queued = vec![false; self.graph.route_count()];

        for k in 1..=max_rounds {
            let prev = &tau[k - 1];
            let mut current = prev.clone();
            let mut round_pointers: Vec<Option<Pointer>> = vec![None; n];
            let mut improved: Vec<StopIdx> = Vec::new();
            let mut is_improved = vec![false; n];

            let mut routes: Vec<RouteIdx> = Vec::new();
            for stop in &marked {
                for route in self.graph.routes_at(*stop) {
                    if !route_queued[route.0] {
                        route_queued[route.0] = true;
                        routes.push(*route);
                    }
                }
            }
            for route in &routes {
                route_queued[route.0] = false;
            }

            for route in &routes {
                for trip in self.graph.active_trips(*route, date) {
                    let mut boarded: Option<(StopIdx, ServiceTime)> = None;

                    for ts in self.graph.trip_stops(trip) {
                        if boarded.is_none() {
                            let reached = prev[ts.stop.0];
                            if reached != UNREACHED {
                                let ready = if k > 1 {
                                    reached.saturating_add(self.config.min_transfer_seconds)
                                } else {
                                    reached
                                };
                                if ready <= ts.departure.seconds() {
                                    boarded = Some((ts.stop, ts.departure));
                                }
                            }
                        }

                        let Some((board, board_time)) = boarded else {
                            continue;
                        };
                        if board == ts.stop {
                            continue;
                        }

                        let arrival = ts.arrival.seconds();
                        if arrival < current[ts.stop.0] {
                            current[ts.stop.0] = arrival;
                            round_pointers[ts.stop.0] = Some(Pointer::Transit {
                                trip,
                                route: *route,
                                board,
                                board_time,
                                alight_time: ts.arrival,
                            });
                            if !is_improved[ts.stop.0] {
                                is_improved[ts.stop.0] = true;
                                improved.push(ts.stop);
                            }
                        }
                    }
                }
            }

            let by_transit = improved.len();

            // Relax from the arrivals as route scanning left them.
            let sources: Vec<(StopIdx, u32)> = improved
                .iter()
                .map(|stop| (*stop, current[stop.0]))
                .collect();
            for (from, arrival) in sources {
                for fp in self.graph.footpaths(from) {
                    let cost = fp.walk_seconds.max(self.config.min_transfer_seconds);
                    let candidate = arrival.saturating_add(cost);
                    if candidate < current[fp.to.0] {
                        current[fp.to.0] = candidate;
                        round_pointers[fp.to.0] = Some(Pointer::Walk {
                            from,
                            departure: ServiceTime::from_seconds(arrival),
                            walk_seconds: fp.walk_seconds,
                            distance_m: fp.distance_m,
                        });
                        if !is_improved[fp.to.0] {
                            is_improved[fp.to.0] = true;
                            improved.push(fp.to);
                        }
                    }
                }
            }

            trace!(
                round = k,
                routes = routes.len(),
                by_transit,
                by_walk = improved.len() - by_transit,
                "raptor round"
            );

            tau.push(current);
            pointers.push(round_pointers);

            if improved.is_empty() {
                break;
            }
            marked = improved;
        }

        Rounds { tau, pointers }
    }

    fn reconstruct(&self, rounds: &Rounds, origin: StopIdx, destination: StopIdx) -> Vec<Journey> {
        let mut journeys = Vec::new();
        // A pointer chain visits each (stop, round) at most once.
        let max_steps = self.graph.stop_count() * rounds.tau.len() + 1;

        for k in 1..rounds.tau.len() {
            if rounds.pointers[k][destination.0].is_none() {
                continue;
            }

            let mut legs = Vec::new();
            let mut stop = destination;
            let mut round = k;
            let mut complete = false;

            for _ in 0..max_steps {
                match &rounds.pointers[round][stop.0] {
                    Some(Pointer::Transit {
                        trip,
                        route,
                        board,
                        board_time,
                        alight_time,
                    }) => {
                        legs.push(JourneyLeg::Transit {
                            trip: *trip,
                            route: *route,
                            board: *board,
                            alight: stop,
                            board_time: *board_time,
                            alight_time: *alight_time,
                        });
                        stop = *board;
                        match (1..round)
                            .rev()
                            .find(|&j| rounds.pointers[j][stop.0].is_some())
                        {
                            Some(j) => round = j,
                            None => {
                                complete = stop == origin;
                                break;
                            }
                        }
                    }
                    Some(Pointer::Walk {
                        from,
                        departure,
                        walk_seconds,
                        distance_m,
                    }) => {
                        legs.push(JourneyLeg::Walk {
                            from: *from,
                            to: stop,
                            departure: *departure,
                            walk_seconds: *walk_seconds,
                            distance_m: *distance_m,
                        });
                        stop = *from;
                    }
                    None => break,
                }
            }

            if !complete {
                continue;
            }
            legs.reverse();

            let Some(JourneyLeg::Transit { board_time, .. }) = legs.first() else {
                continue;
            };
            let departure = *board_time;
            let transfers = legs
                .iter()
                .filter(|leg| matches!(leg, JourneyLeg::Transit { .. }))
                .count()
                .saturating_sub(1);

            journeys.push(Journey {
                legs,
                departure,
                arrival: ServiceTime::from_seconds(rounds.tau[k][destination.0]),
                transfers,
            });
        }

        journeys.sort_by_key(|j| j.arrival);
        let penalty = i64::from(self.config.transfer_penalty_seconds);
        remove_dominated(journeys, |j| {
            (
                i64::from(j.arrival.seconds()) + j.transfers as i64 * penalty,
                j.transfers,
            )
        })
    }

    /// All stops within the configured walk radius of `position`, nearest
    /// first.
    pub fn find_nearby_stops(&self, position: LatLon) -> Vec<NearbyStop> {
        self.graph
            .stops_within(position, self.config.walk_radius_m)
            .into_iter()
            .map(|(stop, distance_m)| NearbyStop {
                stop,
                distance_m,
                walk_seconds: travel_seconds(distance_m, self.config.walk_speed),
            })
            .collect()
    }
}
