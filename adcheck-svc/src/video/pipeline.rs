//! Video compliance pipeline
//!
//! Orchestrates the full check for one video: probe metadata, sample
//! frames, run audio extraction/transcription and per-frame visual
//! analysis concurrently, fuse the scores, and assemble the report.
//!
//! The pipeline never returns `Err` to its caller. A failed probe
//! degrades to placeholder metadata; an unsampleable video produces a
//! terminal error report with `video_compliant = false` and one critical
//! synthetic violation, so batch callers always get one report per video.

use crate::models::{
    AudioResult, ComplianceAssessment, TimelineEntry, VideoComplianceReport, VideoMetadata,
    VideoProcessingSummary, ViolationSummary,
};
use crate::types::{AudioCompliance, ImageCompliance};
use adcheck_common::{Severity, ViolationSource};
use crate::video::audio::AudioExtractor;
use crate::video::sampler::{select_frames, SamplingStrategy};
use crate::video::source::VideoSource;
use crate::video::{frames, fusion};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Default per-video frame budget
pub const DEFAULT_MAX_FRAMES: usize = 20;

/// Pipeline tuning knobs, resolved from configuration at startup
#[derive(Debug, Clone)]
pub struct VideoCheckerOptions {
    pub max_frames: usize,
    pub strategy: SamplingStrategy,
    pub include_audio: bool,
}

impl Default for VideoCheckerOptions {
    fn default() -> Self {
        Self {
            max_frames: DEFAULT_MAX_FRAMES,
            strategy: SamplingStrategy::Adaptive,
            include_audio: true,
        }
    }
}

/// Orchestrator for single-video compliance checks
pub struct VideoComplianceChecker {
    image: Arc<dyn ImageCompliance>,
    audio: Arc<dyn AudioCompliance>,
    extractor: AudioExtractor,
    options: VideoCheckerOptions,
}

impl VideoComplianceChecker {
    pub fn new(
        image: Arc<dyn ImageCompliance>,
        audio: Arc<dyn AudioCompliance>,
        extractor: AudioExtractor,
        options: VideoCheckerOptions,
    ) -> Self {
        Self {
            image,
            audio,
            extractor,
            options,
        }
    }

    /// Run the full compliance check against an opened video source.
    pub async fn check_video(&self, source: &dyn VideoSource) -> VideoComplianceReport {
        let started = Instant::now();
        let video_path = source.path().display().to_string();

        let metadata = match source.metadata().await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(video = %video_path, error = %e, "video probe failed, using placeholder metadata");
                VideoMetadata::placeholder()
            }
        };

        let frame_numbers = select_frames(
            metadata.total_frames,
            self.options.max_frames,
            self.options.strategy,
        );
        if frame_numbers.is_empty() {
            warn!(video = %video_path, "no frames could be sampled");
            return self.error_report(
                video_path,
                metadata,
                "No frames could be sampled from the video".to_string(),
                started,
            );
        }

        info!(
            video = %video_path,
            total_frames = metadata.total_frames,
            sampled = frame_numbers.len(),
            strategy = self.options.strategy.as_str(),
            include_audio = self.options.include_audio,
            "starting video compliance check"
        );

        // Audio and visual tracks are independent; run them concurrently
        let (audio_result, frame_results) = tokio::join!(
            self.analyze_audio_track(source),
            frames::analyze_frames(source, self.image.as_ref(), &frame_numbers, &metadata),
        );

        let assessment = fusion::fuse(&frame_results, &audio_result);
        let violation_summary = fusion::summarize_violations(&frame_results, &audio_result);

        let processing_coverage = if metadata.total_frames > 0 {
            frame_results.len() as f64 / metadata.total_frames as f64
        } else {
            0.0
        };

        info!(
            video = %video_path,
            compliant = assessment.video_compliant,
            compliance_score = assessment.compliance_score,
            violations = violation_summary.total_violations,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "video compliance check complete"
        );

        VideoComplianceReport {
            video_metadata: metadata,
            video_path,
            processing_summary: VideoProcessingSummary {
                total_frames_analyzed: frame_results.len(),
                sampling_strategy: self.options.strategy.as_str().to_string(),
                max_frames_limit: self.options.max_frames,
                processing_coverage,
                audio_analysis_included: self.options.include_audio,
                audio_transcribed: !audio_result.transcribed_text.is_empty(),
            },
            compliance_assessment: assessment,
            violation_summary,
            detailed_frame_results: frame_results,
            audio_analysis: audio_result,
            processing_time: started.elapsed().as_secs_f64(),
            analysis_timestamp: Utc::now(),
            error: None,
        }
    }

    /// Extract and analyze the audio track. Soft-fails to the neutral
    /// unavailable result; missing audio never fails a video on its own.
    async fn analyze_audio_track(&self, source: &dyn VideoSource) -> AudioResult {
        if !self.options.include_audio {
            return AudioResult::disabled();
        }

        let extracted = match self.extractor.extract(source.path()).await {
            Ok(extracted) => extracted,
            Err(e) => {
                warn!(video = %source.path().display(), error = %e, "audio extraction failed");
                return AudioResult::unavailable(e.to_string());
            }
        };

        match self.audio.evaluate(extracted.path()).await {
            Ok(result) => result,
            Err(e) => {
                warn!(video = %source.path().display(), error = %e, "audio analysis failed");
                AudioResult::unavailable(e.to_string())
            }
        }
    }

    /// Terminal report for a video that could not be opened at all.
    /// Batch callers use this to keep one report per requested video.
    pub fn report_unopenable(&self, video_path: String, reason: String) -> VideoComplianceReport {
        self.error_report(
            video_path,
            VideoMetadata::placeholder(),
            reason,
            Instant::now(),
        )
    }

    /// Terminal report for a pipeline that aborted before analysis.
    /// Carries one critical synthetic violation so consumers that only
    /// read the violation counts still see the failure.
    fn error_report(
        &self,
        video_path: String,
        metadata: VideoMetadata,
        reason: String,
        started: Instant,
    ) -> VideoComplianceReport {
        let timeline_entry = TimelineEntry {
            timestamp: 0.0,
            frame_number: -1,
            description: reason.clone(),
            severity: Severity::Critical,
            source: ViolationSource::System,
        };
        VideoComplianceReport {
            video_metadata: metadata,
            video_path,
            processing_summary: VideoProcessingSummary {
                total_frames_analyzed: 0,
                sampling_strategy: self.options.strategy.as_str().to_string(),
                max_frames_limit: self.options.max_frames,
                processing_coverage: 0.0,
                audio_analysis_included: self.options.include_audio,
                audio_transcribed: false,
            },
            compliance_assessment: ComplianceAssessment {
                video_compliant: false,
                compliance_score: 0.0,
                risk_score: 1.0,
                visual_compliance_score: 0.0,
                audio_compliance_score: 0.0,
                compliant_frames: 0,
                non_compliant_frames: 0,
                compliance_percentage: 0.0,
                audio_compliant: false,
            },
            violation_summary: ViolationSummary {
                total_violations: 1,
                visual_violations: 0,
                audio_violations: 0,
                critical_violations: 1,
                major_violations: 0,
                minor_violations: 0,
                violation_density: 0.0,
                violation_timeline: vec![timeline_entry],
            },
            detailed_frame_results: Vec::new(),
            audio_analysis: AudioResult {
                analysis_method: "error".to_string(),
                ..AudioResult::disabled()
            },
            processing_time: started.elapsed().as_secs_f64(),
            analysis_timestamp: Utc::now(),
            error: Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImageComplianceResult;
    use crate::types::FrameImage;
    use adcheck_common::Result as CommonResult;
    use async_trait::async_trait;
    use std::path::Path;

    struct StubSource {
        metadata: VideoMetadata,
    }

    #[async_trait]
    impl VideoSource for StubSource {
        fn path(&self) -> &Path {
            Path::new("/tmp/ad.mp4")
        }

        async fn metadata(&self) -> CommonResult<VideoMetadata> {
            Ok(self.metadata.clone())
        }

        async fn read_frame(&self, _frame_number: u64) -> anyhow::Result<FrameImage> {
            Ok(FrameImage {
                data: vec![0xFF, 0xD8],
                width: self.metadata.width,
                height: self.metadata.height,
            })
        }
    }

    struct AlwaysCompliantImage;

    #[async_trait]
    impl ImageCompliance for AlwaysCompliantImage {
        async fn evaluate(&self, _frame: &FrameImage) -> anyhow::Result<ImageComplianceResult> {
            Ok(ImageComplianceResult {
                compliant: true,
                violations: Vec::new(),
                risk_score: 0.05,
                summary: "clean".to_string(),
                extracted_text: String::new(),
                analysis_method: "stub".to_string(),
            })
        }
    }

    struct StubAudio;

    #[async_trait]
    impl AudioCompliance for StubAudio {
        async fn evaluate(&self, _audio_path: &Path) -> anyhow::Result<AudioResult> {
            Ok(AudioResult {
                compliant: true,
                violations: Vec::new(),
                risk_score: 0.0,
                summary: "clean".to_string(),
                transcribed_text: "buy our product".to_string(),
                family_advertisement_detected: false,
                analysis_method: "stub".to_string(),
            })
        }
    }

    fn checker(options: VideoCheckerOptions) -> VideoComplianceChecker {
        VideoComplianceChecker::new(
            Arc::new(AlwaysCompliantImage),
            Arc::new(StubAudio),
            // Points at a nonexistent binary: extraction soft-fails, which
            // is exactly what these tests exercise
            AudioExtractor::new("/nonexistent/ffmpeg"),
            options,
        )
    }

    #[tokio::test]
    async fn clean_video_with_audio_disabled_is_compliant() {
        let source = StubSource {
            metadata: VideoMetadata::new(300, 30.0, 640, 480),
        };
        let checker = checker(VideoCheckerOptions {
            include_audio: false,
            ..Default::default()
        });

        let report = checker.check_video(&source).await;

        assert!(report.error.is_none());
        assert!(report.compliance_assessment.video_compliant);
        assert_eq!(report.processing_summary.total_frames_analyzed, 20);
        assert_eq!(report.audio_analysis.analysis_method, "disabled");
        assert!(!report.processing_summary.audio_transcribed);
        // Disabled audio scores neutral, so the combined score is 1.0
        assert!((report.compliance_assessment.compliance_score - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn extraction_failure_soft_fails_audio() {
        let source = StubSource {
            metadata: VideoMetadata::new(300, 30.0, 640, 480),
        };
        let checker = checker(VideoCheckerOptions::default());

        let report = checker.check_video(&source).await;

        // Audio analysis is unavailable but the video is still compliant:
        // visual 1.0, audio compliant with risk 0.1
        assert_eq!(report.audio_analysis.analysis_method, "error");
        assert!(report.audio_analysis.compliant);
        assert_eq!(report.violation_summary.minor_violations, 1);
        assert!(report.compliance_assessment.video_compliant);
        let expected = 0.7 * 1.0 + 0.3 * 0.9;
        assert!((report.compliance_assessment.compliance_score - expected).abs() < 1e-9);
    }

    #[tokio::test]
    async fn zero_frame_video_yields_error_report() {
        let source = StubSource {
            metadata: VideoMetadata::new(0, 30.0, 640, 480),
        };
        let checker = checker(VideoCheckerOptions::default());

        let report = checker.check_video(&source).await;

        assert!(report.error.is_some());
        assert!(!report.compliance_assessment.video_compliant);
        assert!((report.compliance_assessment.risk_score - 1.0).abs() < f64::EPSILON);
        assert!(report.detailed_frame_results.is_empty());

        // The fatal condition surfaces as one critical violation
        assert_eq!(report.violation_summary.total_violations, 1);
        assert_eq!(report.violation_summary.critical_violations, 1);
        let entry = &report.violation_summary.violation_timeline[0];
        assert_eq!(entry.severity, Severity::Critical);
        assert_eq!(entry.source, ViolationSource::System);
        assert_eq!(entry.frame_number, -1);
        assert_eq!(report.audio_analysis.analysis_method, "error");
    }

    struct FailingProbeSource;

    #[async_trait]
    impl VideoSource for FailingProbeSource {
        fn path(&self) -> &Path {
            Path::new("/tmp/broken.mp4")
        }

        async fn metadata(&self) -> CommonResult<VideoMetadata> {
            Err(adcheck_common::Error::Internal("probe crashed".to_string()))
        }

        async fn read_frame(&self, _frame_number: u64) -> anyhow::Result<FrameImage> {
            anyhow::bail!("no frames")
        }
    }

    #[tokio::test]
    async fn probe_failure_degrades_to_placeholder_metadata() {
        let checker = checker(VideoCheckerOptions::default());

        let report = checker.check_video(&FailingProbeSource).await;

        // The placeholder has zero frames, so the check terminates with
        // the no-frames error report rather than a probe error
        assert_eq!(report.video_metadata, VideoMetadata::placeholder());
        assert!(report.error.as_deref().unwrap().contains("No frames"));
        assert_eq!(report.violation_summary.critical_violations, 1);
    }

    #[tokio::test]
    async fn report_covers_sampled_frames_in_order() {
        let source = StubSource {
            metadata: VideoMetadata::new(100, 25.0, 1280, 720),
        };
        let checker = checker(VideoCheckerOptions {
            max_frames: 3,
            include_audio: false,
            ..Default::default()
        });

        let report = checker.check_video(&source).await;

        let numbers: Vec<u64> = report
            .detailed_frame_results
            .iter()
            .map(|f| f.frame_number)
            .collect();
        assert_eq!(numbers, vec![0, 50, 99]);
        assert!((report.processing_summary.processing_coverage - 0.03).abs() < 1e-9);
    }
}
