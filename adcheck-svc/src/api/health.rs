//! Health check endpoints

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status (e.g., "ok")
    pub status: String,
    /// Module name ("adcheck-svc")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
}

/// GET /health
///
/// Liveness check for monitoring.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    Json(HealthResponse {
        status: "ok".to_string(),
        module: "adcheck-svc".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
    })
}

/// GET /compliance/health
///
/// Readiness detail: which analysis paths are configured.
pub async fn compliance_health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "compliance_checker",
        "checkers_available": {
            "policy_checker": state.text_enabled,
            "image_checker": state.vision_enabled,
            "audio_checker": state.audio_enabled,
            "video_checker": state.vision_enabled,
        }
    }))
}
