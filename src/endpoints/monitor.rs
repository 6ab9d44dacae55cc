use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::config::CONFIG;
use crate::error::{AppError, Result};
use crate::services::monitor::SweepReport;
use crate::state::AppState;

/// Create monitor routes
pub fn monitor_routes(state: AppState) -> Router {
    Router::new()
        .route("/sweep", post(run_sweep))
        .route("/settings", get(monitor_settings))
        .with_state(state)
}

/// Run a sweep now and return its report
async fn run_sweep(State(state): State<AppState>) -> Result<Json<SweepReport>> {
    let report = state
        .monitor
        .sweep()
        .await
        .map_err(|e| AppError::Internal(format!("Sweep failed: {}", e)))?;

    Ok(Json(report))
}

#[derive(Debug, Serialize)]
struct MonitorSettingsResponse {
    sweep_interval_secs: u64,
    probe_timeout_ms: u64,
    unstable_threshold_ms: u64,
}

async fn monitor_settings(State(state): State<AppState>) -> Json<MonitorSettingsResponse> {
    let settings = state.monitor.settings();
    Json(MonitorSettingsResponse {
        sweep_interval_secs: CONFIG.monitor.sweep_interval_secs,
        probe_timeout_ms: settings.timeout.as_millis() as u64,
        unstable_threshold_ms: settings.unstable_threshold.as_millis() as u64,
    })
}
