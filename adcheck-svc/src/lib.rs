//! adcheck-svc - Advertisement compliance analysis service
//!
//! Analyzes advertisement content (text, images, audio, video, landing
//! links) against a policy document using external inference backends.
//! The heart of the service is the video pipeline in [`video`]: frame
//! sampling, concurrent visual/audio analysis, and weighted score fusion
//! into a single compliance verdict.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod types;
pub mod video;

use axum::Router;
use chrono::{DateTime, Utc};
use services::ComplianceService;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ComplianceService>,
    pub startup_time: DateTime<Utc>,
    /// Analysis paths that came up at startup, surfaced via the
    /// readiness endpoint
    pub text_enabled: bool,
    pub vision_enabled: bool,
    pub audio_enabled: bool,
}

impl AppState {
    pub fn new(service: Arc<ComplianceService>, audio_enabled: bool) -> Self {
        Self {
            service,
            startup_time: Utc::now(),
            text_enabled: true,
            vision_enabled: true,
            audio_enabled,
        }
    }
}

/// Build the application router with middleware layers
pub fn build_router(state: AppState) -> Router {
    api::routes()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
