//! API routes for sherpad.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use sherpa_common::{
    ChatRequest, ChatResponse, HealthResponse, MetricsSnapshot, ServiceClientStatus,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::server::AppState;

type AppStateArc = Arc<AppState>;

// ============================================================================
// Chat Routes
// ============================================================================

pub fn chat_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/chat", post(chat))
}

async fn chat(
    State(state): State<AppStateArc>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, String)> {
    if request.message.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "message must not be empty".to_string(),
        ));
    }

    let request_id = uuid::Uuid::new_v4();
    info!(
        "[>]  chat {} ({} prior turns)",
        request_id,
        request.history.len()
    );

    // The engine never fails a turn; degraded paths still serve a reply.
    let response = state.engine.handle_turn(&request).await;

    info!("[<]  chat {} stage={}", request_id, response.stage);
    Ok(Json(response))
}

// ============================================================================
// Status Routes
// ============================================================================

pub fn status_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/metrics", get(metrics_snapshot))
        .route("/v1/services", get(services))
        .route("/metrics", get(metrics_export))
}

async fn health(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

async fn metrics_snapshot(State(state): State<AppStateArc>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

async fn services(
    State(state): State<AppStateArc>,
) -> Json<BTreeMap<String, ServiceClientStatus>> {
    Json(state.credentials.service_statuses().await)
}

/// Prometheus text exposition.
async fn metrics_export(State(state): State<AppStateArc>) -> String {
    state.metrics.export()
}
