//! Static transport graph.
//!
//! The graph owns the feed records in arena vectors addressed by
//! [`StopIdx`], [`RouteIdx`] and [`TripIdx`], and builds every index the
//! router needs: per-trip stop sequences, routes serving each stop, the
//! service calendar, shapes and footpaths. It is read-only once built.

mod calendar;
mod error;
mod footpaths;
mod snapshot;

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::{
    Dataset, LatLon, RouteIdx, RouteRecord, ServiceTime, StopIdx, StopRecord, TripIdx, TripRecord,
};

pub use calendar::ServiceCalendar;
pub use error::GraphError;
pub use footpaths::{Footpath, apply_transfers, build_footpaths};
pub use snapshot::SNAPSHOT_VERSION;

/// One stop visit of a trip, in sequence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TripStop {
    pub stop: StopIdx,
    pub arrival: ServiceTime,
    pub departure: ServiceTime,
    pub sequence: u32,
}

/// Summary counts, logged after load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub stops: usize,
    pub routes: usize,
    pub trips: usize,
    pub stop_times: usize,
    pub footpaths: usize,
    pub hash: String,
}

/// The static transport network.
#[derive(Debug)]
pub struct TransportGraph {
    dataset: Dataset,
    hash: String,
    built_at: DateTime<Utc>,

    stop_index: HashMap<String, StopIdx>,
    route_index: HashMap<String, RouteIdx>,
    trip_index: HashMap<String, TripIdx>,

    trips_by_route: Vec<Vec<TripIdx>>,
    stop_times_by_trip: Vec<Vec<TripStop>>,
    /// `(trip, position in that trip's stop list)` for each stop.
    stop_times_by_stop: Vec<Vec<(TripIdx, usize)>>,
    routes_by_stop: Vec<Vec<RouteIdx>>,
    stop_time_count: usize,

    calendar: ServiceCalendar,
    shapes: HashMap<String, Vec<LatLon>>,
    footpaths: Vec<Vec<Footpath>>,
}

impl TransportGraph {
    /// Build the graph and all indexes from a dataset.
    ///
    /// Footpaths are not built here; call [`Self::prepare_footpaths`].
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::MissingData`] if the dataset has no stops.
    pub fn load(dataset: Dataset) -> Result<Self, GraphError> {
        let hash = snapshot::content_hash(&dataset)?;
        Self::from_parts(dataset, hash, Utc::now())
    }

    fn from_parts(
        dataset: Dataset,
        hash: String,
        built_at: DateTime<Utc>,
    ) -> Result<Self, GraphError> {
        if dataset.stops.is_empty() {
            return Err(GraphError::MissingData { table: "stops" });
        }

        let stop_index: HashMap<String, StopIdx> = dataset
            .stops
            .iter()
            .enumerate()
            .map(|(i, s)| (s.stop_id.clone(), StopIdx(i)))
            .collect();
        let route_index: HashMap<String, RouteIdx> = dataset
            .routes
            .iter()
            .enumerate()
            .map(|(i, r)| (r.route_id.clone(), RouteIdx(i)))
            .collect();

        // Trips whose route is unknown keep an arena slot but are never
        // indexed, so TripIdx stays aligned with dataset.trips.
        let mut trip_index = HashMap::with_capacity(dataset.trips.len());
        let mut trip_route = Vec::with_capacity(dataset.trips.len());
        let mut trips_by_route: Vec<Vec<TripIdx>> = vec![Vec::new(); dataset.routes.len()];
        let mut skipped_trips = 0usize;
        for (i, trip) in dataset.trips.iter().enumerate() {
            match route_index.get(&trip.route_id) {
                Some(&route) => {
                    trip_index.insert(trip.trip_id.clone(), TripIdx(i));
                    trips_by_route[route.0].push(TripIdx(i));
                    trip_route.push(route);
                }
                None => {
                    skipped_trips += 1;
                    trip_route.push(RouteIdx(usize::MAX));
                }
            }
        }

        let mut stop_times_by_trip: Vec<Vec<TripStop>> = vec![Vec::new(); dataset.trips.len()];
        let mut skipped_stop_times = 0usize;
        for st in &dataset.stop_times {
            let (Some(&trip), Some(&stop)) =
                (trip_index.get(&st.trip_id), stop_index.get(&st.stop_id))
            else {
                skipped_stop_times += 1;
                continue;
            };
            stop_times_by_trip[trip.0].push(TripStop {
                stop,
                arrival: st.arrival,
                departure: st.departure,
                sequence: st.stop_sequence,
            });
        }
        for stops in &mut stop_times_by_trip {
            stops.sort_by_key(|ts| ts.sequence);
        }
        let stop_time_count = stop_times_by_trip.iter().map(Vec::len).sum();

        let mut stop_times_by_stop: Vec<Vec<(TripIdx, usize)>> =
            vec![Vec::new(); dataset.stops.len()];
        for (t, stops) in stop_times_by_trip.iter().enumerate() {
            for (pos, ts) in stops.iter().enumerate() {
                stop_times_by_stop[ts.stop.0].push((TripIdx(t), pos));
            }
        }
        let routes_by_stop: Vec<Vec<RouteIdx>> = stop_times_by_stop
            .iter()
            .map(|visits| {
                let mut routes: Vec<RouteIdx> = Vec::new();
                for (trip, _) in visits {
                    let route = trip_route[trip.0];
                    if !routes.contains(&route) {
                        routes.push(route);
                    }
                }
                routes
            })
            .collect();

        if skipped_trips > 0 || skipped_stop_times > 0 {
            warn!(
                skipped_trips,
                skipped_stop_times, "skipped records referencing unknown ids"
            );
        }

        let calendar = ServiceCalendar::new(&dataset.calendar, &dataset.calendar_dates);

        let mut shape_points: HashMap<&str, Vec<(u32, LatLon)>> = HashMap::new();
        for p in &dataset.shapes {
            shape_points
                .entry(p.shape_id.as_str())
                .or_default()
                .push((p.sequence, LatLon::new(p.lat, p.lon)));
        }
        let shapes = shape_points
            .into_iter()
            .map(|(id, mut points)| {
                points.sort_by_key(|(seq, _)| *seq);
                (id.to_string(), points.into_iter().map(|(_, p)| p).collect())
            })
            .collect();

        let footpaths = vec![Vec::new(); dataset.stops.len()];

        Ok(Self {
            dataset,
            hash,
            built_at,
            stop_index,
            route_index,
            trip_index,
            trips_by_route,
            stop_times_by_trip,
            stop_times_by_stop,
            routes_by_stop,
            stop_time_count,
            calendar,
            shapes,
            footpaths,
        })
    }

    /// Generate footpaths between all stops within `max_distance_m`,
    /// replacing any existing ones.
    pub fn build_footpaths(&mut self, max_distance_m: f64, walk_speed: f64) {
        let positions = self.positions();
        self.footpaths = build_footpaths(&positions, max_distance_m, walk_speed);
        info!(
            max_distance_m,
            footpaths = self.footpath_count(),
            "built footpaths"
        );
    }

    /// Generate footpaths within `radius_m`, then apply the dataset's
    /// transfer records on top.
    pub fn prepare_footpaths(&mut self, radius_m: f64, walk_speed: f64) {
        self.build_footpaths(radius_m, walk_speed);
        if self.dataset.transfers.is_empty() {
            return;
        }

        let mut skipped = 0usize;
        let transfers: Vec<_> = self
            .dataset
            .transfers
            .iter()
            .filter_map(|t| {
                let pair = self
                    .stop_idx(&t.from_stop_id)
                    .zip(self.stop_idx(&t.to_stop_id));
                if pair.is_none() {
                    skipped += 1;
                }
                pair.map(|(from, to)| (from, to, t.min_transfer_time))
            })
            .collect();
        if skipped > 0 {
            warn!(skipped, "skipped transfers referencing unknown stops");
        }

        let positions = self.positions();
        apply_transfers(&mut self.footpaths, &positions, &transfers, walk_speed);
        info!(
            transfers = transfers.len(),
            footpaths = self.footpath_count(),
            "applied transfer records"
        );
    }

    fn positions(&self) -> Vec<LatLon> {
        self.dataset.stops.iter().map(StopRecord::position).collect()
    }

    /// Returns true if `service_id` runs on `date`.
    pub fn is_service_active(&self, service_id: &str, date: NaiveDate) -> bool {
        self.calendar.is_active(service_id, date)
    }

    /// Trips of `route` whose service runs on `date`.
    pub fn active_trips(&self, route: RouteIdx, date: NaiveDate) -> impl Iterator<Item = TripIdx> {
        self.trips_by_route
            .get(route.0)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .copied()
            .filter(move |t| self.is_service_active(&self.dataset.trips[t.0].service_id, date))
    }

    pub fn stop_count(&self) -> usize {
        self.dataset.stops.len()
    }

    pub fn route_count(&self) -> usize {
        self.dataset.routes.len()
    }

    pub fn stops(&self) -> impl Iterator<Item = (StopIdx, &StopRecord)> {
        self.dataset
            .stops
            .iter()
            .enumerate()
            .map(|(i, s)| (StopIdx(i), s))
    }

    pub fn stop(&self, idx: StopIdx) -> &StopRecord {
        &self.dataset.stops[idx.0]
    }

    pub fn stop_idx(&self, stop_id: &str) -> Option<StopIdx> {
        self.stop_index.get(stop_id).copied()
    }

    pub fn route(&self, idx: RouteIdx) -> &RouteRecord {
        &self.dataset.routes[idx.0]
    }

    pub fn route_idx(&self, route_id: &str) -> Option<RouteIdx> {
        self.route_index.get(route_id).copied()
    }

    pub fn trip(&self, idx: TripIdx) -> &TripRecord {
        &self.dataset.trips[idx.0]
    }

    pub fn trip_idx(&self, trip_id: &str) -> Option<TripIdx> {
        self.trip_index.get(trip_id).copied()
    }

    /// A trip's stop visits, sorted by sequence.
    pub fn trip_stops(&self, trip: TripIdx) -> &[TripStop] {
        &self.stop_times_by_trip[trip.0]
    }

    /// Every `(trip, position)` visiting `stop`.
    pub fn stop_visits(&self, stop: StopIdx) -> &[(TripIdx, usize)] {
        &self.stop_times_by_stop[stop.0]
    }

    /// Routes with at least one trip visiting `stop`.
    pub fn routes_at(&self, stop: StopIdx) -> &[RouteIdx] {
        &self.routes_by_stop[stop.0]
    }

    /// Footpaths leaving `stop`, nearest first.
    pub fn footpaths(&self, stop: StopIdx) -> &[Footpath] {
        &self.footpaths[stop.0]
    }

    /// Shape vertices in sequence order.
    pub fn shape(&self, shape_id: &str) -> Option<&[LatLon]> {
        self.shapes.get(shape_id).map(Vec::as_slice)
    }

    /// Stops within `radius_m` of `position`, nearest first.
    pub fn stops_within(&self, position: LatLon, radius_m: f64) -> Vec<(StopIdx, f64)> {
        let mut found: Vec<(StopIdx, f64)> = self
            .stops()
            .map(|(idx, stop)| (idx, position.distance_m(&stop.position())))
            .filter(|(_, d)| *d <= radius_m)
            .collect();
        found.sort_by(|a, b| a.1.total_cmp(&b.1));
        found
    }

    fn footpath_count(&self) -> usize {
        self.footpaths.iter().map(Vec::len).sum()
    }

    /// Content hash of the records the graph was built from.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            stops: self.dataset.stops.len(),
            routes: self.dataset.routes.len(),
            trips: self.dataset.trips.len(),
            stop_times: self.stop_time_count,
            footpaths: self.footpath_count(),
            hash: self.hash.clone(),
        }
    }

    /// Log the summary counts at `info`.
    pub fn log_stats(&self) {
        let stats = self.stats();
        info!(
            stops = stats.stops,
            routes = stats.routes,
            trips = stats.trips,
            stop_times = stats.stop_times,
            footpaths = stats.footpaths,
            hash = %stats.hash,
            "transport graph ready"
        );
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StopTimeRecord;

    fn graph() -> TransportGraph {
        let mut g = TransportGraph::load(fixtures::dataset()).unwrap();
        g.prepare_footpaths(300.0, 1.25);
        g
    }

    #[test]
    fn empty_stops_is_missing_data() {
        let err = TransportGraph::load(Dataset::default()).unwrap_err();
        assert!(matches!(err, GraphError::MissingData { table: "stops" }));
    }

    #[test]
    fn trip_stops_sorted_by_sequence() {
        let g = graph();
        let trip = g.trip_idx("L2-a").unwrap();
        let ids: Vec<_> = g
            .trip_stops(trip)
            .iter()
            .map(|ts| g.stop(ts.stop).stop_id.as_str())
            .collect();
        assert_eq!(ids, vec!["D", "E"]);
    }

    #[test]
    fn routes_serving_stops() {
        let g = graph();
        let b = g.stop_idx("B").unwrap();
        let d = g.stop_idx("D").unwrap();
        assert_eq!(g.routes_at(b), &[g.route_idx("L1").unwrap()]);
        assert_eq!(g.routes_at(d), &[g.route_idx("L2").unwrap()]);
        assert_eq!(g.stop_visits(b).len(), 2);
    }

    #[test]
    fn stop_visits_point_back_into_trips() {
        let g = graph();
        for (stop, _) in g.stops() {
            for &(trip, pos) in g.stop_visits(stop) {
                assert_eq!(g.trip_stops(trip)[pos].stop, stop);
            }
        }
        let e = g.stop_idx("E").unwrap();
        let visits = g.stop_visits(e);
        assert_eq!(visits.len(), 2);
        assert!(visits.iter().all(|&(_, pos)| pos == 1));
    }

    #[test]
    fn active_trips_follow_calendar() {
        let g = graph();
        let l2 = g.route_idx("L2").unwrap();
        let saturday: Vec<_> = g
            .active_trips(l2, fixtures::date())
            .map(|t| g.trip(t).trip_id.clone())
            .collect();
        assert_eq!(saturday, vec!["L2-a"]);

        let monday = chrono::NaiveDate::from_ymd_opt(2026, 1, 12).unwrap();
        let weekday: Vec<_> = g
            .active_trips(l2, monday)
            .map(|t| g.trip(t).trip_id.clone())
            .collect();
        assert_eq!(weekday, vec!["L2-wk"]);
    }

    #[test]
    fn generated_footpaths_connect_close_stops() {
        let g = graph();
        let b = g.stop_idx("B").unwrap();
        let d = g.stop_idx("D").unwrap();
        assert_eq!(g.footpaths(b).len(), 1);
        assert_eq!(g.footpaths(b)[0].to, d);
        assert_eq!(g.footpaths(d)[0].to, b);
        assert_eq!(g.stats().footpaths, 2);
    }

    #[test]
    fn transfer_records_extend_generated_footpaths() {
        let mut ds = fixtures::dataset();
        ds.transfers.push(crate::domain::TransferRecord {
            from_stop_id: "C".into(),
            to_stop_id: "E".into(),
            min_transfer_time: Some(600),
        });
        let mut g = TransportGraph::load(ds).unwrap();
        g.prepare_footpaths(300.0, 1.25);

        let c = g.stop_idx("C").unwrap();
        let b = g.stop_idx("B").unwrap();
        let d = g.stop_idx("D").unwrap();
        assert_eq!(g.footpaths(c)[0].walk_seconds, 600);
        assert_eq!(g.footpaths(b)[0].to, d);
        assert_eq!(g.stats().footpaths, 3);
    }

    #[test]
    fn same_stop_transfers_keep_generated_footpaths() {
        let mut ds = fixtures::dataset();
        ds.transfers.push(crate::domain::TransferRecord {
            from_stop_id: "B".into(),
            to_stop_id: "B".into(),
            min_transfer_time: Some(120),
        });
        let mut g = TransportGraph::load(ds).unwrap();
        g.prepare_footpaths(300.0, 1.25);

        let b = g.stop_idx("B").unwrap();
        let d = g.stop_idx("D").unwrap();
        assert_eq!(g.footpaths(b).len(), 1);
        assert_eq!(g.footpaths(b)[0].to, d);
        assert_eq!(g.footpaths(d)[0].to, b);
    }

    #[test]
    fn unknown_references_are_skipped() {
        let mut ds = fixtures::dataset();
        ds.stop_times.push(StopTimeRecord {
            trip_id: "nope".into(),
            stop_id: "A".into(),
            arrival: ServiceTime::from_hms(9, 0, 0),
            departure: ServiceTime::from_hms(9, 0, 0),
            stop_sequence: 1,
        });
        ds.trips.push(crate::domain::TripRecord {
            trip_id: "orphan".into(),
            route_id: "L9".into(),
            service_id: "SAT".into(),
            shape_id: None,
            headsign: None,
        });
        let g = TransportGraph::load(ds).unwrap();
        assert_eq!(g.stats().stop_times, 10);
        assert!(g.trip_idx("orphan").is_none());
    }

    #[test]
    fn stops_within_sorted() {
        let g = graph();
        let b = g.stop(g.stop_idx("B").unwrap()).position();
        let near: Vec<_> = g
            .stops_within(b, 300.0)
            .into_iter()
            .map(|(idx, _)| g.stop(idx).stop_id.clone())
            .collect();
        assert_eq!(near, vec!["B", "D"]);
    }
}
