//! Compliance result and report types
//!
//! These are the terminal artifacts of every analysis path. Per-modality
//! results (`TextComplianceResult`, `ImageComplianceResult`, `AudioResult`)
//! are produced by collaborator clients; the video pipeline aggregates
//! frame and audio results into a `VideoComplianceReport`.

use adcheck_common::{Severity, Violation, ViolationSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Video container metadata, derived once per video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub total_frames: u64,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    pub duration_seconds: f64,
}

impl VideoMetadata {
    /// Build metadata, deriving duration from frame count and rate
    pub fn new(total_frames: u64, fps: f64, width: u32, height: u32) -> Self {
        let duration_seconds = if fps > 0.0 {
            total_frames as f64 / fps
        } else {
            0.0
        };
        Self {
            total_frames,
            fps,
            width,
            height,
            duration_seconds,
        }
    }

    /// Placeholder record used when the probe fails but the container opened
    pub fn placeholder() -> Self {
        Self {
            total_frames: 0,
            fps: 30.0,
            width: 640,
            height: 480,
            duration_seconds: 0.0,
        }
    }
}

/// Result of evaluating one text payload against policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextComplianceResult {
    pub compliant: bool,
    pub violations: Vec<Violation>,
    pub risk_score: f64,
    pub summary: String,
    #[serde(default)]
    pub processed_content: String,
    #[serde(default)]
    pub detected_language: Option<String>,
    pub analysis_method: String,
}

/// Result of evaluating one image (or one video frame)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageComplianceResult {
    pub compliant: bool,
    pub violations: Vec<Violation>,
    pub risk_score: f64,
    pub summary: String,
    #[serde(default)]
    pub extracted_text: String,
    pub analysis_method: String,
}

/// Result of evaluating one audio track
///
/// Always present in a video report, possibly as the neutral
/// disabled/unavailable default, so fusion never branches on absence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioResult {
    pub compliant: bool,
    pub violations: Vec<Violation>,
    pub risk_score: f64,
    pub summary: String,
    #[serde(default)]
    pub transcribed_text: String,
    #[serde(default)]
    pub family_advertisement_detected: bool,
    pub analysis_method: String,
}

impl AudioResult {
    /// Neutral default when audio analysis is disabled or unavailable
    pub fn disabled() -> Self {
        Self {
            compliant: true,
            violations: Vec::new(),
            risk_score: 0.0,
            summary: "Audio analysis not available".to_string(),
            transcribed_text: String::new(),
            family_advertisement_detected: false,
            analysis_method: "disabled".to_string(),
        }
    }

    /// Soft-fail result when extraction or transcription infrastructure
    /// failed. Deliberately compliant: absence of audio analysis must not
    /// auto-fail the video.
    pub fn unavailable(reason: String) -> Self {
        Self {
            compliant: true,
            violations: vec![Violation::technical(
                "Audio Analysis",
                format!("Audio analysis failed: {}", reason),
                Severity::Minor,
            )],
            risk_score: 0.1,
            summary: format!("Audio analysis unavailable: {}", reason),
            transcribed_text: String::new(),
            family_advertisement_detected: false,
            analysis_method: "error".to_string(),
        }
    }
}

/// Per-frame analysis result
///
/// The sequence mirrors the sampled frame order and is never reordered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameResult {
    pub frame_number: u64,
    /// Seconds from video start (frame_number / fps)
    pub timestamp: f64,
    /// Position in the video as a ratio in [0, 1]
    pub frame_position: f64,
    pub compliant: bool,
    pub violations: Vec<Violation>,
    pub risk_score: f64,
    pub summary: String,
}

/// Result of landing-URL analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkComplianceResult {
    pub compliant: bool,
    pub violations: Vec<Violation>,
    pub risk_score: f64,
    pub summary: String,
    pub url: String,
    #[serde(default)]
    pub domain: String,
    pub analysis_method: String,
}

/// One entry in the violation timeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub timestamp: f64,
    /// Frame number, or -1 for audio violations (whole-track scope)
    pub frame_number: i64,
    pub description: String,
    pub severity: Severity,
    pub source: ViolationSource,
}

/// Aggregate compliance verdict computed by score fusion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceAssessment {
    pub video_compliant: bool,
    /// Weighted visual/audio compliance score in [0, 1]
    pub compliance_score: f64,
    pub risk_score: f64,
    pub visual_compliance_score: f64,
    pub audio_compliance_score: f64,
    pub compliant_frames: usize,
    pub non_compliant_frames: usize,
    pub compliance_percentage: f64,
    pub audio_compliant: bool,
}

/// Violation counts, density, and timeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationSummary {
    pub total_violations: usize,
    pub visual_violations: usize,
    pub audio_violations: usize,
    pub critical_violations: usize,
    pub major_violations: usize,
    pub minor_violations: usize,
    /// Violations per analyzed frame
    pub violation_density: f64,
    /// Up to 20 entries, sorted by timestamp
    pub violation_timeline: Vec<TimelineEntry>,
}

/// How the video was processed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoProcessingSummary {
    pub total_frames_analyzed: usize,
    pub sampling_strategy: String,
    pub max_frames_limit: usize,
    /// Fraction of the video's frames that were analyzed
    pub processing_coverage: f64,
    pub audio_analysis_included: bool,
    pub audio_transcribed: bool,
}

/// Terminal artifact of the video compliance pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoComplianceReport {
    pub video_metadata: VideoMetadata,
    pub video_path: String,
    pub processing_summary: VideoProcessingSummary,
    pub compliance_assessment: ComplianceAssessment,
    pub violation_summary: ViolationSummary,
    pub detailed_frame_results: Vec<FrameResult>,
    pub audio_analysis: AudioResult,
    /// Wall-clock processing time in seconds
    pub processing_time: f64,
    pub analysis_timestamp: DateTime<Utc>,
    /// Set when the pipeline aborted before analysis; such reports are
    /// non-compliant and flagged for manual review
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
