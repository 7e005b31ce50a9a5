//! Multi-window itinerary search.
//!
//! A request is answered by running the router from the best few stops near
//! the origin to the best few stops near the destination, once per departure
//! offset. The offset windows run as cooperative futures that yield between
//! stop pairs; every window checks a shared wall-clock budget before each
//! pair and gives up early, flagging the result as partial, once it is spent.

use std::collections::HashSet;
use std::time::Instant as Clock;

use chrono::Duration;
use futures::future::join_all;
use tracing::{debug, info};

use crate::domain::{DomainError, Instant, Itinerary, LatLon, ServiceTime, StreetMode};
use crate::graph::{GraphStats, TransportGraph};
use crate::raptor::{NearbyStop, Raptor};
use crate::walk::WalkPathFinder;

use super::EngineConfig;
use super::assemble::{Assembler, Endpoints};
use super::rank::{CostModel, rank_itineraries};

/// Error from itinerary search.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SearchError {
    #[error("invalid search request: {0}")]
    InvalidRequest(String),
}

/// Request for itinerary search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub origin: LatLon,
    pub destination: LatLon,
    /// Earliest departure from the origin.
    pub departure: Instant,
    pub max_walk_distance_m: f64,
    pub max_transfers: usize,
}

impl SearchRequest {
    pub fn validate(&self) -> Result<(), SearchError> {
        if !self.origin.is_valid() {
            return Err(SearchError::InvalidRequest(format!(
                "origin {} is not a valid coordinate",
                self.origin
            )));
        }
        if !self.destination.is_valid() {
            return Err(SearchError::InvalidRequest(format!(
                "destination {} is not a valid coordinate",
                self.destination
            )));
        }
        if !self.max_walk_distance_m.is_finite() || self.max_walk_distance_m < 0.0 {
            return Err(SearchError::InvalidRequest(
                "max walk distance must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result of itinerary search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Itineraries, best first.
    pub itineraries: Vec<Itinerary>,

    /// True if the compute budget ran out before every window finished.
    pub partial: bool,

    /// True if nothing at all, not even a walk, connects the two points.
    pub no_route_found: bool,
}

impl SearchResult {
    /// A result with no route.
    pub fn empty() -> Self {
        Self {
            itineraries: Vec::new(),
            partial: false,
            no_route_found: true,
        }
    }
}

/// The itinerary engine: a transport graph plus a walk graph over its stops.
#[derive(Debug)]
pub struct PathfindingEngine {
    graph: TransportGraph,
    walker: WalkPathFinder,
    config: EngineConfig,
}

impl PathfindingEngine {
    /// Prepare footpaths and the walk graph for `graph`.
    ///
    /// Both steps are quadratic in the number of stops; run this off the
    /// async runtime.
    pub fn new(mut graph: TransportGraph, config: EngineConfig) -> Self {
        graph.prepare_footpaths(config.footpath_radius_m, config.walk_speed);

        let mut walker = WalkPathFinder::new(config.walk_speed);
        let points: Vec<LatLon> = graph.stops().map(|(_, s)| s.position()).collect();
        walker.build_walk_graph(&points, config.walk_graph_k, config.walk_graph_range_m);

        graph.log_stats();
        Self {
            graph,
            walker,
            config,
        }
    }

    pub fn graph(&self) -> &TransportGraph {
        &self.graph
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stats(&self) -> GraphStats {
        self.graph.stats()
    }

    fn assembler(&self) -> Assembler<'_> {
        Assembler::new(&self.graph, &self.walker, &self.config)
    }

    /// Nearby stops usable to get on or off the network: boarding points
    /// served by at least one route.
    fn candidate_stops(&self, raptor: &Raptor<'_>, position: LatLon) -> Vec<NearbyStop> {
        raptor
            .find_nearby_stops(position)
            .into_iter()
            .filter(|n| {
                self.graph.stop(n.stop).is_quay() && !self.graph.routes_at(n.stop).is_empty()
            })
            .collect()
    }

    /// A direct walking or cycling itinerary.
    pub fn direct_itinerary(
        &self,
        mode: StreetMode,
        origin: LatLon,
        destination: LatLon,
        departure: Instant,
    ) -> Result<Itinerary, DomainError> {
        self.assembler()
            .street_itinerary(mode, origin, destination, departure)
    }

    fn walk_only(&self, request: &SearchRequest) -> Option<Itinerary> {
        match self.direct_itinerary(
            StreetMode::Walk,
            request.origin,
            request.destination,
            request.departure,
        ) {
            Ok(it) => Some(it),
            Err(e) => {
                debug!(error = %e, "could not build walk-only itinerary");
                None
            }
        }
    }

    /// Search transit itineraries, adding a walk-only option where walking
    /// is reasonable.
    ///
    /// Never fails for lack of a route: an unconnected request gives an
    /// empty result with `no_route_found` set.
    pub async fn compute_itineraries(&self, request: &SearchRequest) -> SearchResult {
        let started = Clock::now();
        let radius = request
            .max_walk_distance_m
            .min(self.config.nearby_stop_radius_m);
        let raptor = Raptor::new(
            &self.graph,
            self.config.raptor_config(request.max_transfers, radius),
        );

        let origins = self.candidate_stops(&raptor, request.origin);
        let destinations = self.candidate_stops(&raptor, request.destination);
        let direct_m = request.origin.distance_m(&request.destination);
        debug!(
            origins = origins.len(),
            destinations = destinations.len(),
            direct_m,
            "candidate stops"
        );

        let mut itineraries = Vec::new();
        let mut partial = false;

        if !origins.is_empty() && !destinations.is_empty() {
            let windows = self.config.departure_offsets().into_iter().map(|offset| {
                self.search_window(
                    &raptor,
                    request,
                    &origins,
                    &destinations,
                    offset,
                    started,
                )
            });
            for (found, window_partial) in join_all(windows).await {
                itineraries.extend(found);
                partial |= window_partial;
            }
        }

        let transit_found = !itineraries.is_empty();
        let walk_limit = if transit_found {
            request.max_walk_distance_m
        } else {
            request.max_walk_distance_m * 2.0
        };
        if direct_m <= walk_limit {
            itineraries.extend(self.walk_only(request));
        }

        if itineraries.is_empty() {
            info!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                partial, "no itinerary found"
            );
            return SearchResult {
                partial,
                ..SearchResult::empty()
            };
        }

        let model = CostModel::from_config(&self.config);
        let found = itineraries.len();
        let itineraries = rank_itineraries(itineraries, &model, self.config.max_results);
        info!(
            found,
            returned = itineraries.len(),
            partial,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "itinerary search complete"
        );

        SearchResult {
            itineraries,
            partial,
            no_route_found: false,
        }
    }

    /// One departure window: try candidate stop pairs, nearest first, in
    /// widening passes.
    ///
    /// Returns the itineraries found and whether the budget ran out.
    async fn search_window(
        &self,
        raptor: &Raptor<'_>,
        request: &SearchRequest,
        origins: &[NearbyStop],
        destinations: &[NearbyStop],
        offset: Duration,
        started: Clock,
    ) -> (Vec<Itinerary>, bool) {
        let budget = self.config.compute_budget();
        let departure = request.departure + offset;
        // Windows stay on the request's service day; past midnight they
        // continue into times after 24:00.
        let date = request.departure.naive_local().date();
        let window_start =
            ServiceTime::of_instant(&request.departure) + offset.num_seconds().max(0) as u32;
        let assembler = self.assembler();

        let mut results: Vec<Itinerary> = Vec::new();
        let mut tried = HashSet::new();

        for &limit in &self.config.candidate_limits {
            for origin_stop in origins.iter().take(limit) {
                for destination_stop in destinations.iter().take(limit) {
                    if results.len() >= self.config.collect_per_search {
                        return (results, false);
                    }
                    if started.elapsed() >= budget {
                        debug!(%departure, found = results.len(), "compute budget spent");
                        return (results, true);
                    }
                    if origin_stop.stop == destination_stop.stop
                        || !tried.insert((origin_stop.stop, destination_stop.stop))
                    {
                        continue;
                    }

                    let journeys = raptor.compute_journeys(
                        &self.graph.stop(origin_stop.stop).stop_id,
                        &self.graph.stop(destination_stop.stop).stop_id,
                        window_start + origin_stop.walk_seconds,
                        date,
                    );
                    debug!(
                        origin = %origin_stop.stop,
                        destination = %destination_stop.stop,
                        journeys = journeys.len(),
                        "searched stop pair"
                    );

                    let endpoints = Endpoints {
                        origin: request.origin,
                        destination: request.destination,
                        origin_stop: *origin_stop,
                        destination_stop: *destination_stop,
                    };
                    for journey in &journeys {
                        match assembler.build_itinerary(&endpoints, journey, departure, date) {
                            Ok(it) => results.push(it),
                            Err(e) => debug!(error = %e, "dropped inconsistent itinerary"),
                        }
                    }

                    tokio::task::yield_now().await;
                }
            }

            if results.len() >= self.config.early_exit_results {
                break;
            }
        }

        (results, false)
    }
}
