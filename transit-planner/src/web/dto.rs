//! Data transfer objects specific to the HTTP layer.
//!
//! The plan request and response bodies live in [`crate::planner`]; this
//! module holds the flat query-string form of a plan request and the
//! health and error bodies.

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::domain::LatLon;
use crate::graph::GraphStats;
use crate::planner::{PlanMode, PlanRequest};

/// Plan request as query parameters of `GET /plan`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanQuery {
    pub origin_lat: f64,
    pub origin_lon: f64,
    pub dest_lat: f64,
    pub dest_lon: f64,

    /// RFC 3339 departure time (defaults to now)
    pub time: Option<String>,

    pub mode: Option<PlanMode>,

    pub max_walk_distance: Option<f64>,

    pub max_transfers: Option<usize>,
}

impl PlanQuery {
    /// Convert to a plan request.
    ///
    /// An unescaped `+` in the time's UTC offset arrives as a space and is
    /// put back.
    pub fn into_request(self) -> Result<PlanRequest, String> {
        let time = self
            .time
            .map(|t| {
                let t = t.trim().replace(' ', "+");
                DateTime::parse_from_rfc3339(&t).map_err(|e| format!("invalid time {t}: {e}"))
            })
            .transpose()?;

        Ok(PlanRequest {
            origin: LatLon::new(self.origin_lat, self.origin_lon),
            destination: LatLon::new(self.dest_lat, self.dest_lon),
            time,
            mode: self.mode.unwrap_or_default(),
            max_walk_distance: self.max_walk_distance,
            max_transfers: self.max_transfers,
        })
    }
}

/// Response for the health check.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub ok: bool,

    /// `ready` once the engine is built, else `building`
    pub engine: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<GraphStats>,

    pub cached_plans: u64,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}
