//! API route handlers for the control surface.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Json, extract::Query};
use serde::Deserialize;
use std::sync::Arc;

use super::server::AppState;

/// Health check endpoint.
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "reportflow-gateway",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Scheduler status: running flag plus shops with an in-flight batch.
pub async fn scheduler_status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let status = state.scheduler.status().await;
    Json(serde_json::json!({
        "isRunning": status.running,
        "activeShops": status.active_shops,
        "shopCount": status.active_shops.len(),
    }))
}

/// Trigger a poll cycle immediately (operational diagnostics).
pub async fn scheduler_trigger(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    state.scheduler.trigger_now().await;
    Json(serde_json::json!({ "triggered": true }))
}

#[derive(Deserialize)]
pub struct RunRequest {
    pub shop: String,
}

/// Manual run-now: dispatches the execution in the background and returns
/// immediately. The caller polls run-status for the outcome. May overlap with
/// a poller-triggered run of the same schedule; each gets its own ledger row.
pub async fn run_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<RunRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    tracing::info!("🔔 Manual run requested for schedule {id} ({})", body.shop);
    let executor = state.executor.clone();
    let schedule_id = id.clone();
    tokio::spawn(async move {
        if let Err(e) = executor.execute(&schedule_id, &body.shop).await {
            tracing::warn!("⚠️ Manual run of {schedule_id} rejected: {e}");
        }
    });
    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "dispatched": true, "scheduleId": id })),
    )
}

/// Latest execution for a schedule.
pub async fn run_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.store.latest_execution(&id) {
        Ok(Some(record)) => (StatusCode::OK, Json(serde_json::json!({ "execution": record }))),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "no executions for schedule" })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        ),
    }
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    pub limit: u32,
}

fn default_history_limit() -> u32 {
    50
}

/// Execution ledger for a schedule, newest first.
pub async fn report_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.store.list_executions(&id, query.limit) {
        Ok(records) => {
            let count = records.len();
            (
                StatusCode::OK,
                Json(serde_json::json!({ "executions": records, "count": count })),
            )
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        ),
    }
}
