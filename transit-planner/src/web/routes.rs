//! HTTP route handlers.

use axum::body::Bytes;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use tracing::{error, warn};

use crate::planner::{PlanError, PlanRequest};

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/plan", get(plan_query).post(plan_json))
        .with_state(state)
}

/// Health check endpoint.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let engine = state.planner.engine().try_get();
    Json(HealthResponse {
        ok: true,
        engine: if engine.is_some() { "ready" } else { "building" },
        stats: engine.map(|e| e.stats()),
        cached_plans: state.planner.cache().entry_count(),
    })
}

/// Plan from query parameters.
async fn plan_query(
    State(state): State<AppState>,
    Query(query): Query<PlanQuery>,
) -> Result<Response, AppError> {
    let request = query
        .into_request()
        .map_err(|message| AppError::BadRequest { message })?;
    plan(&state, request).await
}

/// Plan from a JSON body.
async fn plan_json(State(state): State<AppState>, body: Bytes) -> Result<Response, AppError> {
    // Parse JSON manually so we can log the body on failure
    let request: PlanRequest = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, body = %String::from_utf8_lossy(&body), "invalid plan body");
        AppError::BadRequest {
            message: format!("Invalid JSON: {e}"),
        }
    })?;
    plan(&state, request).await
}

async fn plan(state: &AppState, request: PlanRequest) -> Result<Response, AppError> {
    let response = state.planner.plan_itinerary(request).await?;
    Ok(Json(&*response).into_response())
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    Unavailable { message: String },
    Internal { message: String },
}

impl From<PlanError> for AppError {
    fn from(e: PlanError) -> Self {
        match e {
            PlanError::InvalidRequest(message) => AppError::BadRequest { message },
            PlanError::Engine(_) => AppError::Unavailable {
                message: e.to_string(),
            },
            PlanError::Itinerary(_) => AppError::Internal {
                message: e.to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::Unavailable { message } => (StatusCode::SERVICE_UNAVAILABLE, message),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        if status.is_server_error() {
            error!(%status, %message, "request failed");
        } else {
            warn!(%status, %message, "request rejected");
        }

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
