//! REST endpoints for submitting trip research jobs and polling their output.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderValue, Method, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use crate::error::{GatewayError, JobError};
use crate::jobs::{RequestGateway, SubmitRequest};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: RequestGateway,
}

/// Build the Axum router with the job routes.
///
/// `allowed_origin` restricts CORS to a single origin; `None` allows any.
pub fn job_routes(gateway: RequestGateway, allowed_origin: Option<&str>) -> Router {
    let state = AppState { gateway };

    Router::new()
        .route("/analyze", post(analyze))
        .route("/logs", get(logs))
        .route("/crew_result", get(crew_result))
        .route("/health", get(health))
        .layer(cors_layer(allowed_origin))
        .with_state(state)
}

fn cors_layer(allowed_origin: Option<&str>) -> CorsLayer {
    let any = || {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let Some(origin) = allowed_origin else {
        return any();
    };

    match origin.parse::<HeaderValue>() {
        Ok(value) => CorsLayer::new()
            .allow_origin(AllowOrigin::exact(value))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_credentials(true),
        Err(e) => {
            warn!(origin, error = %e, "Invalid CORS origin, allowing any origin");
            any()
        }
    }
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let executor = state.gateway.executor();
    Json(serde_json::json!({
        "status": "ok",
        "service": "trip-crew",
        "workers": executor.worker_count(),
        "queue_capacity": executor.queue_capacity(),
        "queued": executor.queued(),
        "running": executor.running(),
    }))
}

// ── Jobs ────────────────────────────────────────────────────────────────

async fn analyze(
    State(state): State<AppState>,
    Json(body): Json<SubmitRequest>,
) -> impl IntoResponse {
    match state.gateway.submit(&body).await {
        Ok(ack) => {
            info!(job_id = %ack.job_id, "Research job accepted");
            (StatusCode::OK, Json(serde_json::json!(ack)))
        }
        Err(e) => {
            let status = match &e {
                GatewayError::Validation { .. } => StatusCode::BAD_REQUEST,
                GatewayError::Job(JobError::PoolSaturated { .. } | JobError::ShuttingDown) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                GatewayError::Job(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            warn!(status = %status, error = %e, "Research job rejected");
            (status, Json(serde_json::json!({"error": e.to_string()})))
        }
    }
}

async fn logs(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.gateway.read_logs())
}

async fn crew_result(
    State(state): State<AppState>,
    Query(query): Query<SubmitRequest>,
) -> impl IntoResponse {
    Json(state.gateway.read_result(&query).await)
}
