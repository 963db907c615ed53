//! End-to-end video pipeline tests with scripted collaborators
//!
//! Exercises the full orchestration (sampling, concurrent audio/visual
//! analysis, fusion, report assembly) without ffmpeg or any network
//! backend.

use adcheck_common::{Result as CommonResult, Severity, Violation};
use adcheck_svc::models::{AudioResult, ImageComplianceResult, VideoMetadata};
use adcheck_svc::types::{AudioCompliance, FrameImage, ImageCompliance};
use adcheck_svc::video::{
    AudioExtractor, SamplingStrategy, VideoCheckerOptions, VideoComplianceChecker, VideoSource,
};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

struct ScriptedSource {
    metadata: VideoMetadata,
}

#[async_trait]
impl VideoSource for ScriptedSource {
    fn path(&self) -> &Path {
        Path::new("/videos/campaign.mp4")
    }

    async fn metadata(&self) -> CommonResult<VideoMetadata> {
        Ok(self.metadata.clone())
    }

    async fn read_frame(&self, _frame_number: u64) -> anyhow::Result<FrameImage> {
        Ok(FrameImage {
            data: vec![0xFF, 0xD8, 0xFF, 0xE0],
            width: self.metadata.width,
            height: self.metadata.height,
        })
    }
}

/// Flags specific frame numbers with a violation of the given severity
struct FlaggingAnalyzer {
    flagged: HashSet<u64>,
    severity: Severity,
    calls: std::sync::Mutex<Vec<u64>>,
    frame_numbers: Vec<u64>,
}

impl FlaggingAnalyzer {
    fn new(frame_numbers: Vec<u64>, flagged: &[u64], severity: Severity) -> Self {
        Self {
            flagged: flagged.iter().copied().collect(),
            severity,
            calls: std::sync::Mutex::new(Vec::new()),
            frame_numbers,
        }
    }
}

#[async_trait]
impl ImageCompliance for FlaggingAnalyzer {
    async fn evaluate(&self, _frame: &FrameImage) -> anyhow::Result<ImageComplianceResult> {
        // Frames arrive in sampling order; map the call index back to the
        // expected frame number
        let frame_number = {
            let mut calls = self.calls.lock().unwrap();
            let n = self.frame_numbers[calls.len()];
            calls.push(n);
            n
        };
        let compliant = !self.flagged.contains(&frame_number);
        Ok(ImageComplianceResult {
            compliant,
            violations: if compliant {
                Vec::new()
            } else {
                vec![Violation {
                    policy_section: "Prohibited Content".to_string(),
                    description: format!("violation at frame {}", frame_number),
                    confidence: 0.9,
                    evidence: String::new(),
                    severity: self.severity,
                }]
            },
            risk_score: if compliant { 0.05 } else { 0.85 },
            summary: String::new(),
            extracted_text: String::new(),
            analysis_method: "scripted".to_string(),
        })
    }
}

struct ScriptedAudio {
    result: AudioResult,
}

#[async_trait]
impl AudioCompliance for ScriptedAudio {
    async fn evaluate(&self, _audio_path: &Path) -> anyhow::Result<AudioResult> {
        Ok(self.result.clone())
    }
}

fn clean_audio() -> AudioResult {
    AudioResult {
        compliant: true,
        violations: Vec::new(),
        risk_score: 0.0,
        summary: "clean".to_string(),
        transcribed_text: "great offer this week".to_string(),
        family_advertisement_detected: false,
        analysis_method: "scripted".to_string(),
    }
}

fn build_checker(
    image: Arc<dyn ImageCompliance>,
    options: VideoCheckerOptions,
) -> VideoComplianceChecker {
    VideoComplianceChecker::new(
        image,
        Arc::new(ScriptedAudio {
            result: clean_audio(),
        }),
        AudioExtractor::new("/nonexistent/ffmpeg"),
        options,
    )
}

#[tokio::test]
async fn mostly_clean_video_passes_with_minor_flags() {
    // 300-frame video, uniform sampling of 10 frames: 0,30,...,270.
    // One flagged frame: visual = 0.9, combined = 0.7*0.9 + 0.3*1.0 = 0.93
    let source = ScriptedSource {
        metadata: VideoMetadata::new(300, 30.0, 1920, 1080),
    };
    let sampled: Vec<u64> = (0..10).map(|i| i * 30).collect();
    let image = Arc::new(FlaggingAnalyzer::new(sampled, &[60], Severity::Minor));
    let checker = build_checker(image, VideoCheckerOptions {
        max_frames: 10,
        strategy: SamplingStrategy::Uniform,
        include_audio: false,
    });

    let report = checker.check_video(&source).await;

    assert!(report.error.is_none());
    assert!(report.compliance_assessment.video_compliant);
    assert_eq!(report.compliance_assessment.compliant_frames, 9);
    assert_eq!(report.compliance_assessment.non_compliant_frames, 1);
    assert!((report.compliance_assessment.compliance_score - 0.93).abs() < 1e-9);
    assert_eq!(report.violation_summary.total_violations, 1);
    assert_eq!(report.violation_summary.minor_violations, 1);

    // Timeline entry carries the flagged frame's timestamp
    let entry = &report.violation_summary.violation_timeline[0];
    assert_eq!(entry.frame_number, 60);
    assert!((entry.timestamp - 2.0).abs() < 1e-9);
}

#[tokio::test]
async fn critical_violation_fails_an_otherwise_clean_video() {
    let source = ScriptedSource {
        metadata: VideoMetadata::new(300, 30.0, 1920, 1080),
    };
    let sampled: Vec<u64> = (0..10).map(|i| i * 30).collect();
    let image = Arc::new(FlaggingAnalyzer::new(sampled, &[0], Severity::Critical));
    let checker = build_checker(image, VideoCheckerOptions {
        max_frames: 10,
        strategy: SamplingStrategy::Uniform,
        include_audio: false,
    });

    let report = checker.check_video(&source).await;

    // Score clears the threshold but the critical violation gates it
    assert!(report.compliance_assessment.compliance_score >= 0.75);
    assert!(!report.compliance_assessment.video_compliant);
    assert_eq!(report.violation_summary.critical_violations, 1);
}

#[tokio::test]
async fn widespread_violations_fail_on_score() {
    let source = ScriptedSource {
        metadata: VideoMetadata::new(300, 30.0, 1920, 1080),
    };
    let sampled: Vec<u64> = (0..10).map(|i| i * 30).collect();
    // 6 of 10 frames flagged: visual = 0.4, combined = 0.58 < 0.75
    let flagged: Vec<u64> = sampled.iter().copied().take(6).collect();
    let image = Arc::new(FlaggingAnalyzer::new(sampled, &flagged, Severity::Major));
    let checker = build_checker(image, VideoCheckerOptions {
        max_frames: 10,
        strategy: SamplingStrategy::Uniform,
        include_audio: false,
    });

    let report = checker.check_video(&source).await;

    assert!(!report.compliance_assessment.video_compliant);
    assert!((report.compliance_assessment.visual_compliance_score - 0.4).abs() < 1e-9);
    assert_eq!(report.violation_summary.major_violations, 6);
    assert!((report.violation_summary.violation_density - 0.6).abs() < 1e-9);
}

#[tokio::test]
async fn report_metadata_and_processing_summary_are_complete() {
    let source = ScriptedSource {
        metadata: VideoMetadata::new(600, 25.0, 1280, 720),
    };
    let sampled: Vec<u64> = (0..10).map(|i| i * 60).collect();
    let image = Arc::new(FlaggingAnalyzer::new(sampled, &[], Severity::Minor));
    let checker = build_checker(image, VideoCheckerOptions {
        max_frames: 10,
        strategy: SamplingStrategy::Uniform,
        include_audio: false,
    });

    let report = checker.check_video(&source).await;

    assert_eq!(report.video_metadata.total_frames, 600);
    assert!((report.video_metadata.duration_seconds - 24.0).abs() < 1e-9);
    assert_eq!(report.processing_summary.total_frames_analyzed, 10);
    assert_eq!(report.processing_summary.sampling_strategy, "uniform");
    assert!((report.processing_summary.processing_coverage - 10.0 / 600.0).abs() < 1e-9);
    assert_eq!(report.video_path, "/videos/campaign.mp4");
    assert!(report.processing_time >= 0.0);
}
