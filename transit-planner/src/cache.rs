//! Caching layer for planned itineraries.
//!
//! Keys round coordinates to 4 decimals (about 11 m) and bucket departure
//! times into 5-minute slots, so near-identical requests share an entry.
//! Entries expire after a short TTL; timetables are static but "now"-based
//! requests drift.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;
use moka::policy::EvictionPolicy;

use crate::domain::{Instant, LatLon};
use crate::planner::{PlanMode, PlanResponse};

/// Length of a departure time slot, in milliseconds.
const SLOT_MILLIS: i64 = 5 * 60 * 1000;

/// Identifies equivalent plan requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    origin: (i64, i64),
    destination: (i64, i64),
    time_slot: i64,
    mode: PlanMode,
    max_walk_m: i64,
    max_transfers: usize,
}

fn round_coord(position: LatLon) -> (i64, i64) {
    (
        (position.lat * 1e4).round() as i64,
        (position.lon * 1e4).round() as i64,
    )
}

impl CacheKey {
    pub fn new(
        origin: LatLon,
        destination: LatLon,
        departure: &Instant,
        mode: PlanMode,
        max_walk_m: f64,
        max_transfers: usize,
    ) -> Self {
        Self {
            origin: round_coord(origin),
            destination: round_coord(destination),
            time_slot: departure.timestamp_millis().div_euclid(SLOT_MILLIS),
            mode,
            max_walk_m: max_walk_m.round() as i64,
            max_transfers,
        }
    }
}

/// Configuration for the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,

    /// Maximum number of cached entries.
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(120),
            max_capacity: 500,
        }
    }
}

/// Cache of plan responses, least recently used evicted first.
pub struct ItineraryCache {
    responses: MokaCache<CacheKey, Arc<PlanResponse>>,
}

impl ItineraryCache {
    /// Create a new cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let responses = MokaCache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_capacity)
            .eviction_policy(EvictionPolicy::lru())
            .build();

        Self { responses }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Arc<PlanResponse>> {
        self.responses.get(key).await
    }

    pub async fn insert(&self, key: CacheKey, response: Arc<PlanResponse>) {
        self.responses.insert(key, response).await;
    }

    /// Get cache statistics (for monitoring).
    pub fn entry_count(&self) -> u64 {
        self.responses.entry_count()
    }

    /// Invalidate all cached entries.
    pub fn invalidate_all(&self) {
        self.responses.invalidate_all();
    }
}
