//! Compliance check endpoints
//!
//! Single-modality endpoints wrap one item in the corresponding batch
//! path; the comprehensive endpoint accepts any combination of media.
//! Analysis failures are reported inside result payloads, not as HTTP
//! errors, so a 5xx here means the service itself misbehaved.

use axum::{extract::State, Json};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{
    AudioAnalysisRequest, ComplianceCheckRequest, ComplianceResponse, ImageAnalysisRequest,
    TextAnalysisRequest, VideoAnalysisRequest,
};
use crate::AppState;

/// POST /compliance/check
///
/// Comprehensive compliance check for text, images, audio, videos, and
/// the landing link.
pub async fn check_comprehensive(
    State(state): State<AppState>,
    Json(request): Json<ComplianceCheckRequest>,
) -> Json<ComplianceResponse> {
    let check_id = Uuid::new_v4();
    info!(
        %check_id,
        advertiser = %request.user_data.name,
        title = %request.ad_details.title,
        "comprehensive compliance check requested"
    );

    let response = state.service.check_comprehensive(&request).await;

    info!(
        %check_id,
        items = response.processing_summary.total_items_processed,
        errors = response.processing_summary.processing_errors.len(),
        "comprehensive compliance check finished"
    );
    Json(response)
}

/// POST /compliance/text
pub async fn check_text(
    State(state): State<AppState>,
    Json(request): Json<TextAnalysisRequest>,
) -> Json<Value> {
    let result = state.service.analyze_text(&request.text).await;
    Json(json!({ "text_analysis": result }))
}

/// POST /compliance/image
pub async fn check_image(
    State(state): State<AppState>,
    Json(request): Json<ImageAnalysisRequest>,
) -> ApiResult<Json<Value>> {
    require_url(&request.image_url)?;
    let batch = state.service.analyze_images(&[request.image_url]).await;
    Ok(Json(json!({ "image_analysis": batch.results.first() })))
}

/// POST /compliance/audio
pub async fn check_audio(
    State(state): State<AppState>,
    Json(request): Json<AudioAnalysisRequest>,
) -> ApiResult<Json<Value>> {
    require_url(&request.audio_url)?;
    let batch = state.service.analyze_audios(&[request.audio_url]).await;
    Ok(Json(json!({ "audio_analysis": batch.results.first() })))
}

/// POST /compliance/video
pub async fn check_video(
    State(state): State<AppState>,
    Json(request): Json<VideoAnalysisRequest>,
) -> ApiResult<Json<Value>> {
    require_url(&request.video_url)?;
    let batch = state.service.analyze_videos(&[request.video_url]).await;
    Ok(Json(json!({ "video_analysis": batch.results.first() })))
}

fn require_url(url: &str) -> ApiResult<()> {
    if url.trim().is_empty() {
        return Err(ApiError::BadRequest("URL must not be empty".to_string()));
    }
    Ok(())
}
