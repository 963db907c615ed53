//! HTTP API
//!
//! Routes:
//! - `GET  /health`            — liveness
//! - `GET  /compliance/health` — readiness detail
//! - `POST /compliance/check`  — comprehensive check
//! - `POST /compliance/text`   — single text payload
//! - `POST /compliance/image`  — single image URL
//! - `POST /compliance/audio`  — single audio URL
//! - `POST /compliance/video`  — single video URL

pub mod compliance;
pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

/// Build the full route tree
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/compliance/health", get(health::compliance_health))
        .route("/compliance/check", post(compliance::check_comprehensive))
        .route("/compliance/text", post(compliance::check_text))
        .route("/compliance/image", post(compliance::check_image))
        .route("/compliance/audio", post(compliance::check_audio))
        .route("/compliance/video", post(compliance::check_video))
}
