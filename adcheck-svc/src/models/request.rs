//! API request and response schemas

use super::report::{
    AudioResult, LinkComplianceResult, TextComplianceResult, VideoComplianceReport,
};
use crate::services::ImageAnalysisOutcome;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Submitting advertiser details, passed through to the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserData {
    pub name: String,
    pub email: String,
    pub sector: String,
    pub mobile: String,
}

/// Advertisement metadata accompanying a comprehensive check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdDetails {
    pub advertisement_id: Value,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub landing_url: String,
    #[serde(default)]
    pub target_region: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub target_audience: String,
}

/// Comprehensive compliance check request: any combination of modalities
#[derive(Debug, Clone, Deserialize)]
pub struct ComplianceCheckRequest {
    pub user_data: UserData,
    pub ad_details: AdDetails,
    #[serde(default)]
    pub video_links: Vec<String>,
    #[serde(default)]
    pub image_links: Vec<String>,
    #[serde(default)]
    pub audio_links: Vec<String>,
}

/// Single-modality requests
#[derive(Debug, Deserialize)]
pub struct TextAnalysisRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ImageAnalysisRequest {
    pub image_url: String,
}

#[derive(Debug, Deserialize)]
pub struct AudioAnalysisRequest {
    pub audio_url: String,
}

#[derive(Debug, Deserialize)]
pub struct VideoAnalysisRequest {
    pub video_url: String,
}

/// Batch section of a comprehensive response
#[derive(Debug, Clone, Serialize)]
pub struct ImageBatchResult {
    pub total_images: usize,
    pub analyzed_images: usize,
    pub results: Vec<ImageAnalysisOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AudioBatchResult {
    pub total_audios: usize,
    pub analyzed_audios: usize,
    pub results: Vec<AudioResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoBatchResult {
    pub total_videos: usize,
    pub analyzed_videos: usize,
    pub results: Vec<VideoComplianceReport>,
}

/// Processing bookkeeping for a comprehensive check
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessingSummary {
    pub total_items_processed: usize,
    pub processing_errors: Vec<String>,
}

/// Comprehensive compliance check response
///
/// Sections are None when the request carried no content for that
/// modality; a section that was attempted but failed is reported through
/// `processing_summary.processing_errors`.
#[derive(Debug, Clone, Serialize)]
pub struct ComplianceResponse {
    pub text_op: Option<TextComplianceResult>,
    pub image_op: Option<ImageBatchResult>,
    pub audio_op: Option<AudioBatchResult>,
    pub video_op: Option<VideoBatchResult>,
    pub link_op: Option<LinkComplianceResult>,
    pub processing_summary: ProcessingSummary,
}
