//! Router and request handlers

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

use crate::telemetry::LogEntry;
use crate::types::StatsSnapshot;

use super::dashboard::DASHBOARD_HTML;
use super::AppState;

const LOG_TAIL_LIMIT: usize = 50;

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(serve_dashboard))
        .route("/api/stats", get(get_stats))
        .route("/api/logs", get(get_logs))
        .route("/health", get(health_check))
        .layer(cors)
        .with_state(state)
}

async fn serve_dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

async fn get_stats(State(state): State<Arc<AppState>>) -> Json<StatsSnapshot> {
    Json(state.bot.snapshot())
}

async fn get_logs(State(state): State<Arc<AppState>>) -> Json<Vec<LogEntry>> {
    Json(state.logs.recent(LOG_TAIL_LIMIT))
}

/// Readiness probe: 503 until the initial record load has completed
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.bot.is_ready() {
        (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "uptimeSeconds": state.bot.uptime_seconds(),
            })),
        )
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"status": "starting"})))
    }
}
