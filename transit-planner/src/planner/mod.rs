//! Itinerary planning entry point.
//!
//! The planner validates a request, answers walking and cycling requests
//! with a direct path, hands transit requests to the engine, and caches the
//! shaped response for identical requests.

mod dto;

pub use dto::{
    ItineraryResult, LegResult, PlaceResult, PlanMetadata, PlanMode, PlanRequest, PlanResponse,
};

use std::sync::Arc;
use std::time::Instant as Clock;

use chrono::Local;
use tracing::{debug, info};

use crate::cache::{CacheConfig, CacheKey, ItineraryCache};
use crate::domain::{DomainError, StreetMode};
use crate::engine::{EngineError, EngineHandle, PathfindingEngine, SearchError, SearchRequest};

/// Maximum walk to or from a stop when the request leaves it out.
pub const DEFAULT_MAX_WALK_M: f64 = 3000.0;

const ROUTER_ENGINE: &str = "raptor-native";
const DIRECT_ENGINE: &str = "direct";

/// Error from itinerary planning.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The engine could not be built.
    #[error("engine unavailable: {0}")]
    Engine(#[from] EngineError),

    #[error("could not assemble itinerary: {0}")]
    Itinerary(#[from] DomainError),
}

impl From<SearchError> for PlanError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::InvalidRequest(msg) => PlanError::InvalidRequest(msg),
        }
    }
}

/// Plans itineraries on a shared engine.
pub struct Planner {
    engine: Arc<EngineHandle>,
    cache: ItineraryCache,
}

impl Planner {
    pub fn new(engine: Arc<EngineHandle>, cache: &CacheConfig) -> Self {
        Self {
            engine,
            cache: ItineraryCache::new(cache),
        }
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    pub fn cache(&self) -> &ItineraryCache {
        &self.cache
    }

    /// Plan itineraries for `request`.
    ///
    /// Finding no route is not an error: the response is empty and its
    /// metadata says so.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::InvalidRequest` for out-of-range coordinates or a
    /// negative walk limit, and `PlanError::Engine` if the engine cannot be
    /// built.
    pub async fn plan_itinerary(
        &self,
        request: PlanRequest,
    ) -> Result<Arc<PlanResponse>, PlanError> {
        let started = Clock::now();
        let search = SearchRequest {
            origin: request.origin,
            destination: request.destination,
            departure: request.time.unwrap_or_else(|| Local::now().fixed_offset()),
            max_walk_distance_m: request.max_walk_distance.unwrap_or(DEFAULT_MAX_WALK_M),
            max_transfers: request
                .max_transfers
                .unwrap_or(self.engine.config().max_transfers),
        };
        search.validate()?;

        let key = CacheKey::new(
            search.origin,
            search.destination,
            &search.departure,
            request.mode,
            search.max_walk_distance_m,
            search.max_transfers,
        );
        if let Some(hit) = self.cache.get(&key).await {
            debug!(mode = %request.mode, "plan cache hit");
            return Ok(hit);
        }

        let engine = self.engine.get().await?;
        info!(
            origin = %search.origin,
            destination = %search.destination,
            departure = %search.departure,
            mode = %request.mode,
            "planning itinerary"
        );

        let response = match request.mode {
            PlanMode::Walk => plan_direct(&engine, StreetMode::Walk, &search, started)?,
            PlanMode::Bicycle => plan_direct(&engine, StreetMode::Bicycle, &search, started)?,
            PlanMode::Transit | PlanMode::TransitWalk => {
                plan_transit(&engine, &search, started).await
            }
        };

        let response = Arc::new(response);
        if !response.metadata.no_route_found && !response.metadata.partial {
            self.cache.insert(key, response.clone()).await;
        }
        Ok(response)
    }
}

fn elapsed_ms(started: Clock) -> u64 {
    started.elapsed().as_millis() as u64
}

fn plan_direct(
    engine: &PathfindingEngine,
    mode: StreetMode,
    search: &SearchRequest,
    started: Clock,
) -> Result<PlanResponse, PlanError> {
    let itinerary =
        engine.direct_itinerary(mode, search.origin, search.destination, search.departure)?;
    let offset = search.departure.offset();
    Ok(PlanResponse {
        routes: vec![ItineraryResult::from_itinerary(&itinerary, offset)],
        metadata: PlanMetadata::found(DIRECT_ENGINE, 1, false, elapsed_ms(started)),
    })
}

async fn plan_transit(
    engine: &PathfindingEngine,
    search: &SearchRequest,
    started: Clock,
) -> PlanResponse {
    let result = engine.compute_itineraries(search).await;
    if result.no_route_found {
        return PlanResponse {
            routes: Vec::new(),
            metadata: PlanMetadata::no_route(ROUTER_ENGINE, result.partial, elapsed_ms(started)),
        };
    }

    let offset = search.departure.offset();
    let routes: Vec<ItineraryResult> = result
        .itineraries
        .iter()
        .map(|it| ItineraryResult::from_itinerary(it, offset))
        .collect();
    let metadata = PlanMetadata::found(
        ROUTER_ENGINE,
        routes.len(),
        result.partial,
        elapsed_ms(started),
    );
    PlanResponse { routes, metadata }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Dataset, Instant, LatLon};
    use crate::engine::{DatasetSource, EngineConfig};
    use crate::graph::fixtures;
    use chrono::DateTime;

    // ~110 m north of the fixture stops
    const NEAR_A: LatLon = LatLon {
        lat: 45.1850,
        lon: 0.7000,
    };
    const NEAR_C: LatLon = LatLon {
        lat: 45.1850,
        lon: 0.7400,
    };

    fn planner() -> Planner {
        let handle = EngineHandle::new(
            DatasetSource::Dataset(Arc::new(fixtures::dataset())),
            EngineConfig::default(),
        );
        Planner::new(Arc::new(handle), &CacheConfig::default())
    }

    fn saturday_evening() -> Instant {
        DateTime::parse_from_rfc3339("2026-01-10T17:50:00+01:00").unwrap()
    }

    fn request(mode: PlanMode) -> PlanRequest {
        PlanRequest {
            mode,
            max_walk_distance: Some(2000.0),
            ..PlanRequest::new(NEAR_A, NEAR_C, Some(saturday_evening()))
        }
    }

    #[tokio::test]
    async fn transit_plan() {
        let planner = planner();
        let response = planner
            .plan_itinerary(request(PlanMode::TransitWalk))
            .await
            .unwrap();

        assert_eq!(response.metadata.engine, "raptor-native");
        assert!(!response.metadata.no_route_found);
        assert_eq!(response.metadata.routes_count, 1);
        assert_eq!(response.routes.len(), 1);

        let route = &response.routes[0];
        assert_eq!(route.departure_time, "2026-01-10T17:50:00+01:00");
        let modes: Vec<&str> = route.legs.iter().map(|l| l.mode).collect();
        assert_eq!(modes, vec!["WALK", "WAIT", "BUS", "WALK"]);
        assert_eq!(route.legs[2].route_color.as_deref(), Some("#E30613"));
    }

    #[tokio::test]
    async fn identical_requests_hit_the_cache() {
        let planner = planner();
        let first = planner
            .plan_itinerary(request(PlanMode::TransitWalk))
            .await
            .unwrap();

        // two minutes later is the same time slot
        let mut again = request(PlanMode::TransitWalk);
        again.time = Some(DateTime::parse_from_rfc3339("2026-01-10T17:52:00+01:00").unwrap());
        let second = planner.plan_itinerary(again).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn walk_mode_is_direct() {
        let planner = planner();
        let response = planner.plan_itinerary(request(PlanMode::Walk)).await.unwrap();

        assert_eq!(response.metadata.engine, "direct");
        assert_eq!(response.routes.len(), 1);
        let route = &response.routes[0];
        assert_eq!(route.transfers, 0);
        assert_eq!(route.legs.len(), 1);
        assert_eq!(route.legs[0].mode, "WALK");
        // ~3.1 km
        assert!(route.walk_distance > 3000.0 && route.walk_distance < 3300.0);
    }

    #[tokio::test]
    async fn bicycle_mode_walks_nowhere() {
        let planner = planner();
        let response = planner
            .plan_itinerary(request(PlanMode::Bicycle))
            .await
            .unwrap();

        let route = &response.routes[0];
        assert_eq!(route.walk_distance, 0.0);
        assert_eq!(route.legs[0].mode, "BICYCLE");
        assert!(route.legs[0].distance.unwrap() > 3000.0);
        // 3.1 km at 4.17 m/s
        assert!(route.duration > 700 && route.duration < 800);
    }

    #[tokio::test]
    async fn no_route_is_not_an_error() {
        let planner = planner();
        let mut req = request(PlanMode::Transit);
        req.origin = LatLon::new(44.0, 1.5);

        let response = planner.plan_itinerary(req.clone()).await.unwrap();
        assert!(response.routes.is_empty());
        assert!(response.metadata.no_route_found);
        assert_eq!(response.metadata.message.as_deref(), Some("No itinerary found"));

        // empty responses are not cached
        let again = planner.plan_itinerary(req).await.unwrap();
        assert!(!Arc::ptr_eq(&response, &again));
    }

    #[tokio::test]
    async fn invalid_request_does_not_build_the_engine() {
        let planner = planner();
        let mut req = request(PlanMode::TransitWalk);
        req.origin = LatLon::new(91.0, 0.7);

        let err = planner.plan_itinerary(req).await.unwrap_err();
        assert!(matches!(err, PlanError::InvalidRequest(_)));
        assert!(!planner.engine().is_ready());

        let mut req = request(PlanMode::Walk);
        req.max_walk_distance = Some(f64::INFINITY);
        assert!(matches!(
            planner.plan_itinerary(req).await,
            Err(PlanError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn engine_failure_is_reported() {
        let handle = EngineHandle::new(
            DatasetSource::Dataset(Arc::new(Dataset::default())),
            EngineConfig::default(),
        );
        let planner = Planner::new(Arc::new(handle), &CacheConfig::default());

        let err = planner
            .plan_itinerary(request(PlanMode::TransitWalk))
            .await
            .unwrap_err();
        assert!(matches!(err, PlanError::Engine(_)));
        assert!(err.to_string().starts_with("engine unavailable: "));
    }
}
