//! Walking paths.
//!
//! Direct paths between arbitrary coordinates, plus a k-nearest-neighbour
//! walk graph over stops searched with A* to draw multi-hop transfer walks.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use geo_types::Coord;

use crate::domain::{LatLon, travel_seconds};

/// A walk along a sequence of points.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkPath {
    pub distance_m: f64,
    pub duration_seconds: u32,
    pub points: Vec<LatLon>,
}

impl WalkPath {
    /// Encoded polyline of the path's points.
    pub fn polyline(&self) -> Option<String> {
        encode_polyline(&self.points)
    }
}

/// Encode points with the standard polyline algorithm at 1e5 precision.
///
/// Returns `None` for an empty input or out-of-range coordinates.
///
/// ```
/// use transit_planner::domain::LatLon;
/// use transit_planner::walk::encode_polyline;
///
/// let points = [LatLon::new(38.5, -120.2), LatLon::new(40.7, -120.95), LatLon::new(43.252, -126.453)];
/// assert_eq!(encode_polyline(&points).as_deref(), Some("_p~iF~ps|U_ulLnnqC_mqNvxq`@"));
/// ```
pub fn encode_polyline(points: &[LatLon]) -> Option<String> {
    if points.is_empty() {
        return None;
    }
    let coords = points.iter().map(|p| Coord { x: p.lon, y: p.lat });
    polyline::encode_coordinates(coords, 5).ok()
}

/// Symmetric nearest-neighbour graph over a set of points.
#[derive(Debug, Clone, Default)]
pub struct WalkGraph {
    points: Vec<LatLon>,
    /// Adjacency lists of `(neighbour, distance in metres)`.
    edges: Vec<Vec<(usize, f64)>>,
}

impl WalkGraph {
    /// Connect each point to its `k` nearest neighbours within
    /// `max_distance_m`. Edges are stored in both directions.
    pub fn build(points: &[LatLon], k: usize, max_distance_m: f64) -> Self {
        let mut graph = WalkGraph {
            points: points.to_vec(),
            edges: vec![Vec::new(); points.len()],
        };

        for (i, p) in points.iter().enumerate() {
            let mut near: Vec<(usize, f64)> = points
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(j, q)| (j, p.distance_m(q)))
                .filter(|(_, d)| *d <= max_distance_m)
                .collect();
            near.sort_by(|a, b| a.1.total_cmp(&b.1));

            for (j, d) in near.into_iter().take(k) {
                graph.add(i, j, d);
            }
        }

        graph
    }

    /// Add an edge in both directions, ignoring duplicates.
    fn add(&mut self, a: usize, b: usize, distance_m: f64) {
        if !self.edges[a].iter().any(|(n, _)| *n == b) {
            self.edges[a].push((b, distance_m));
        }
        if !self.edges[b].iter().any(|(n, _)| *n == a) {
            self.edges[b].push((a, distance_m));
        }
    }

    pub fn neighbours(&self, idx: usize) -> &[(usize, f64)] {
        self.edges.get(idx).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of undirected edges.
    pub fn len(&self) -> usize {
        self.edges.iter().map(Vec::len).sum::<usize>() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.edges.iter().all(Vec::is_empty)
    }

    /// Shortest path by A* with great-circle distance as heuristic.
    ///
    /// Returns the visited point indices and total distance.
    pub fn shortest_path(&self, from: usize, to: usize) -> Option<(Vec<usize>, f64)> {
        if from >= self.points.len() || to >= self.points.len() {
            return None;
        }
        if from == to {
            return Some((vec![from], 0.0));
        }

        let goal = self.points[to];
        let mut best = vec![f64::INFINITY; self.points.len()];
        let mut came_from: Vec<Option<usize>> = vec![None; self.points.len()];
        let mut open = BinaryHeap::new();

        best[from] = 0.0;
        open.push(Candidate {
            estimate: self.points[from].distance_m(&goal),
            node: from,
        });

        while let Some(Candidate { node, estimate }) = open.pop() {
            if node == to {
                let mut path = vec![to];
                let mut current = to;
                while let Some(prev) = came_from[current] {
                    path.push(prev);
                    current = prev;
                }
                path.reverse();
                return Some((path, best[to]));
            }
            // stale heap entry
            if estimate > best[node] + self.points[node].distance_m(&goal) + 1e-9 {
                continue;
            }

            for &(next, d) in &self.edges[node] {
                let g = best[node] + d;
                if g < best[next] {
                    best[next] = g;
                    came_from[next] = Some(node);
                    open.push(Candidate {
                        estimate: g + self.points[next].distance_m(&goal),
                        node: next,
                    });
                }
            }
        }

        None
    }
}

/// Min-heap entry ordered by estimated total distance.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    estimate: f64,
    node: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so BinaryHeap pops the smallest estimate.
        other
            .estimate
            .total_cmp(&self.estimate)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Walking path finder over direct lines and the stop walk graph.
#[derive(Debug, Clone)]
pub struct WalkPathFinder {
    walk_speed: f64,
    graph: WalkGraph,
}

impl WalkPathFinder {
    pub fn new(walk_speed: f64) -> Self {
        Self {
            walk_speed,
            graph: WalkGraph::default(),
        }
    }

    pub fn walk_speed(&self) -> f64 {
        self.walk_speed
    }

    /// Straight-line walk between two coordinates.
    ///
    /// Coincident points give a zero-length path with a single point.
    pub fn compute_direct_path(&self, from: LatLon, to: LatLon) -> WalkPath {
        let distance_m = from.distance_m(&to);
        let points = if distance_m == 0.0 {
            vec![from]
        } else {
            vec![from, to]
        };
        WalkPath {
            distance_m,
            duration_seconds: travel_seconds(distance_m, self.walk_speed),
            points,
        }
    }

    /// Replace the walk graph with one over `points`.
    pub fn build_walk_graph(&mut self, points: &[LatLon], k: usize, max_distance_m: f64) {
        self.graph = WalkGraph::build(points, k, max_distance_m);
        tracing::info!(
            points = points.len(),
            edges = self.graph.len(),
            "built walk graph"
        );
    }

    pub fn walk_graph(&self) -> &WalkGraph {
        &self.graph
    }

    /// Multi-hop walk between two walk graph points, if connected.
    pub fn find_path(&self, from: usize, to: usize) -> Option<WalkPath> {
        let (nodes, distance_m) = self.graph.shortest_path(from, to)?;
        Some(WalkPath {
            distance_m,
            duration_seconds: travel_seconds(distance_m, self.walk_speed),
            points: nodes.into_iter().map(|n| self.graph.points[n]).collect(),
        })
    }

    /// Walk between two graph points, falling back to a straight line.
    pub fn path_between(&self, from: usize, to: usize, from_pos: LatLon, to_pos: LatLon) -> WalkPath {
        self.find_path(from, to)
            .unwrap_or_else(|| self.compute_direct_path(from_pos, to_pos))
    }
}
