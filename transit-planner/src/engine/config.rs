//! Engine configuration.

use crate::raptor::RaptorConfig;

/// Configuration parameters for itinerary search.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Walking speed (m/s).
    pub walk_speed: f64,

    /// Cycling speed for direct bicycle itineraries (m/s).
    pub bicycle_speed: f64,

    /// Default maximum walking distance when a request gives none (metres).
    pub max_walk_distance_m: f64,

    /// Default maximum number of transfers when a request gives none.
    pub max_transfers: usize,

    /// Minimum time to change vehicles (seconds).
    pub min_transfer_secs: u32,

    /// Per-transfer penalty used by the router's Pareto filter (seconds).
    pub raptor_transfer_penalty_secs: u32,

    /// Per-transfer penalty used when ranking itineraries (seconds).
    pub rank_transfer_penalty_secs: u32,

    /// Multiplier on walking time when ranking itineraries.
    pub walk_reluctance: f64,

    /// Maximum number of itineraries to return.
    pub max_results: usize,

    /// Radius for origin/destination candidate stops (metres).
    pub nearby_stop_radius_m: f64,

    /// Radius for generated footpaths between stops (metres).
    pub footpath_radius_m: f64,

    /// Departure offsets searched for each request (minutes).
    pub departure_offsets_mins: Vec<i64>,

    /// Candidate stop counts tried per side, in order.
    pub candidate_limits: Vec<usize>,

    /// Stop searching once this many itineraries are collected.
    pub collect_per_search: usize,

    /// Skip wider candidate limits once a pass found this many.
    pub early_exit_results: usize,

    /// Soft wall-clock budget for one request (milliseconds).
    pub compute_budget_ms: u64,

    /// Gaps longer than this become wait legs (seconds).
    pub wait_threshold_secs: i64,

    /// Neighbours per stop in the walk graph.
    pub walk_graph_k: usize,

    /// Maximum edge length in the walk graph (metres).
    pub walk_graph_range_m: f64,
}

impl EngineConfig {
    /// Create a configuration with the given limits and defaults for
    /// everything else.
    pub fn new(max_results: usize, max_transfers: usize, max_walk_distance_m: f64) -> Self {
        Self {
            max_results,
            max_transfers,
            max_walk_distance_m,
            ..Self::default()
        }
    }

    /// Router settings for one request.
    pub fn raptor_config(&self, max_transfers: usize, walk_radius_m: f64) -> RaptorConfig {
        RaptorConfig {
            max_transfers,
            walk_radius_m,
            walk_speed: self.walk_speed,
            min_transfer_seconds: self.min_transfer_secs,
            transfer_penalty_seconds: self.raptor_transfer_penalty_secs,
        }
    }

    /// Returns the compute budget as a Duration.
    pub fn compute_budget(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.compute_budget_ms)
    }

    /// Returns the departure offsets as Durations.
    pub fn departure_offsets(&self) -> Vec<chrono::Duration> {
        self.departure_offsets_mins
            .iter()
            .map(|m| chrono::Duration::minutes(*m))
            .collect()
    }

    /// Returns the wait threshold as a Duration.
    pub fn wait_threshold(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.wait_threshold_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            walk_speed: 1.25,
            bicycle_speed: 4.17,
            max_walk_distance_m: 2000.0,
            max_transfers: 2,
            min_transfer_secs: 180,
            raptor_transfer_penalty_secs: 1200, // 20 minutes
            rank_transfer_penalty_secs: 1200,
            walk_reluctance: 2.0,
            max_results: 5,
            nearby_stop_radius_m: 800.0,
            footpath_radius_m: 300.0,
            departure_offsets_mins: vec![0, 20, 40],
            candidate_limits: vec![3, 5],
            collect_per_search: 8,
            early_exit_results: 3,
            compute_budget_ms: 8000,
            wait_threshold_secs: 60,
            walk_graph_k: 5,
            walk_graph_range_m: 500.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = EngineConfig::default();

        assert_eq!(config.walk_speed, 1.25);
        assert_eq!(config.bicycle_speed, 4.17);
        assert_eq!(config.min_transfer_secs, 180);
        assert_eq!(config.rank_transfer_penalty_secs, 1200);
        assert_eq!(config.walk_reluctance, 2.0);
        assert_eq!(config.max_results, 5);
        assert_eq!(config.nearby_stop_radius_m, 800.0);
        assert_eq!(config.departure_offsets_mins, vec![0, 20, 40]);
        assert_eq!(config.candidate_limits, vec![3, 5]);
    }

    #[test]
    fn duration_methods() {
        let config = EngineConfig::default();

        assert_eq!(config.compute_budget(), std::time::Duration::from_secs(8));
        assert_eq!(
            config.departure_offsets(),
            vec![
                chrono::Duration::zero(),
                chrono::Duration::minutes(20),
                chrono::Duration::minutes(40)
            ]
        );
        assert_eq!(config.wait_threshold(), chrono::Duration::minutes(1));
    }

    #[test]
    fn custom_config() {
        let config = EngineConfig::new(3, 1, 1500.0);

        assert_eq!(config.max_results, 3);
        assert_eq!(config.max_transfers, 1);
        assert_eq!(config.max_walk_distance_m, 1500.0);
        assert_eq!(config.walk_speed, 1.25);
    }

    #[test]
    fn raptor_config_carries_shared_settings() {
        let config = EngineConfig::default();
        let raptor = config.raptor_config(1, 500.0);

        assert_eq!(raptor.max_transfers, 1);
        assert_eq!(raptor.walk_radius_m, 500.0);
        assert_eq!(raptor.min_transfer_seconds, 180);
        assert_eq!(raptor.transfer_penalty_seconds, 1200);
    }
}
