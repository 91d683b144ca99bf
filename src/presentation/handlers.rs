// HTTP request handlers
use crate::application::monitor::{ActionError, BatchResult};
use crate::application::scheduler::ScheduleError;
use crate::domain::chart::ChartKind;
use crate::domain::dashboard::{DashboardSnapshot, StreamingStatus};
use crate::domain::prediction::{ApiStatus, Prediction};
use crate::domain::telemetry::DeviceReading;
use crate::infrastructure::http_response::{accepts_brotli, json_attachment};
use crate::infrastructure::ndjson_stream::snapshot_stream;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Error body returned to the display layer
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<ActionError> for ApiError {
    fn from(e: ActionError) -> Self {
        let status = match e {
            ActionError::Busy(_) => StatusCode::CONFLICT,
            ActionError::DeviceNotFound(_) | ActionError::AlertNotFound(_) => StatusCode::NOT_FOUND,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<ScheduleError> for ApiError {
    fn from(e: ScheduleError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: e.to_string(),
        }
    }
}

#[derive(Deserialize)]
pub struct IntervalRequest {
    pub interval_ms: u64,
}

#[derive(Deserialize)]
pub struct SoundRequest {
    pub enabled: bool,
}

#[derive(Serialize)]
pub struct ChartPauseResponse {
    pub chart: ChartKind,
    pub paused: bool,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn get_snapshot(State(state): State<Arc<AppState>>) -> Json<DashboardSnapshot> {
    Json(state.monitor.snapshot())
}

/// Live snapshots, one JSON document per line
pub async fn stream_snapshots(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let rx = state.monitor.subscribe();
    snapshot_stream(state.monitor.snapshot(), rx)
}

pub async fn export_snapshot(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let document = state.monitor.export();
    match json_attachment(&document, &document.file_name(), accepts_brotli(&headers)).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

pub async fn get_api_status(State(state): State<Arc<AppState>>) -> Json<ApiStatus> {
    Json(state.monitor.api_status())
}

pub async fn refresh_api_status(State(state): State<Arc<AppState>>) -> Json<ApiStatus> {
    Json(state.monitor.refresh_status().await)
}

pub async fn start_streaming(State(state): State<Arc<AppState>>) -> Json<StreamingStatus> {
    state.scheduler.start().await;
    Json(state.monitor.streaming_status())
}

pub async fn stop_streaming(State(state): State<Arc<AppState>>) -> Json<StreamingStatus> {
    state.scheduler.stop().await;
    Json(state.monitor.streaming_status())
}

pub async fn set_streaming_interval(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IntervalRequest>,
) -> Result<Json<StreamingStatus>, ApiError> {
    let status = state
        .scheduler
        .set_interval(Duration::from_millis(request.interval_ms))
        .await?;
    Ok(Json(status))
}

pub async fn toggle_chart_pause(
    Path(chart): Path<ChartKind>,
    State(state): State<Arc<AppState>>,
) -> Json<ChartPauseResponse> {
    let paused = state.monitor.toggle_chart_pause(chart);
    Json(ChartPauseResponse { chart, paused })
}

pub async fn set_sound(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SoundRequest>,
) -> Json<serde_json::Value> {
    state.monitor.set_sound(request.enabled);
    Json(json!({ "sound_enabled": request.enabled }))
}

pub async fn analyze_device(
    Path(id): Path<u32>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Prediction>, ApiError> {
    Ok(Json(state.monitor.analyze_device(id).await?))
}

pub async fn run_batch(State(state): State<Arc<AppState>>) -> Result<Json<Vec<BatchResult>>, ApiError> {
    Ok(Json(state.monitor.run_batch().await?))
}

/// Score a reading typed into the manual form
pub async fn analyze_reading(
    State(state): State<Arc<AppState>>,
    Json(reading): Json<DeviceReading>,
) -> Result<Json<Prediction>, ApiError> {
    Ok(Json(state.monitor.analyze_reading(&reading).await?))
}

pub async fn clear_alerts(State(state): State<Arc<AppState>>) -> StatusCode {
    state.monitor.clear_alerts();
    StatusCode::NO_CONTENT
}

pub async fn dismiss_alert(
    Path(id): Path<u64>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, ApiError> {
    state.monitor.dismiss_alert(id)?;
    Ok(StatusCode::NO_CONTENT)
}
