// Presentation layer - HTTP API for the display layer
pub mod app_state;
pub mod handlers;

use crate::presentation::app_state::AppState;
use crate::presentation::handlers::*;
use axum::routing::{delete, get, post, put};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/api/snapshot", get(get_snapshot))
        .route("/api/stream", get(stream_snapshots))
        .route("/api/export", get(export_snapshot))
        .route("/api/status", get(get_api_status))
        .route("/api/status/refresh", post(refresh_api_status))
        .route("/api/streaming/start", post(start_streaming))
        .route("/api/streaming/stop", post(stop_streaming))
        .route("/api/streaming/interval", put(set_streaming_interval))
        .route("/api/charts/:chart/pause", post(toggle_chart_pause))
        .route("/api/sound", put(set_sound))
        .route("/api/devices/:id/analyze", post(analyze_device))
        .route("/api/batch", post(run_batch))
        .route("/api/analyze", post(analyze_reading))
        .route("/api/alerts", delete(clear_alerts))
        .route("/api/alerts/:id", delete(dismiss_alert))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
