//! Compliance orchestration
//!
//! One service owns every analysis path (text, image, audio, video,
//! landing URL) and the comprehensive check that fans a request out
//! across them. Failure isolation is the organizing rule: one bad item
//! produces an error-shaped result for that item and the batch proceeds.

use crate::models::{
    AudioBatchResult, ComplianceCheckRequest, ComplianceResponse, ImageBatchResult,
    ImageComplianceResult, LinkComplianceResult, ProcessingSummary, TextComplianceResult,
    VideoBatchResult, VideoComplianceReport,
};
use crate::services::media_downloader::MediaDownloader;
use crate::types::{AudioCompliance, FrameImage, ImageCompliance, TextCompliance};
use crate::video::{FfmpegVideoSource, VideoComplianceChecker};
use adcheck_common::{Severity, Violation};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Risk assigned to an item whose analysis failed outright
const ITEM_FAILURE_RISK: f64 = 0.8;
/// Per-pattern risk increment for suspicious landing URLs
const URL_PATTERN_RISK: f64 = 0.3;

/// URL substrings that indicate prohibited verticals
const SUSPICIOUS_URL_PATTERNS: &[&str] = &["adult", "casino", "gambling", "pharma", "pills"];

/// One image's result paired with the URL it came from
#[derive(Debug, Clone, Serialize)]
pub struct ImageAnalysisOutcome {
    pub image_compliance: ImageComplianceResult,
    pub source_url: String,
}

pub struct ComplianceService {
    text: Arc<dyn TextCompliance>,
    image: Arc<dyn ImageCompliance>,
    audio: Arc<dyn AudioCompliance>,
    video: VideoComplianceChecker,
    downloader: MediaDownloader,
    ffmpeg: String,
    ffprobe: String,
    audio_enabled: bool,
}

impl ComplianceService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        text: Arc<dyn TextCompliance>,
        image: Arc<dyn ImageCompliance>,
        audio: Arc<dyn AudioCompliance>,
        video: VideoComplianceChecker,
        downloader: MediaDownloader,
        ffmpeg: String,
        ffprobe: String,
        audio_enabled: bool,
    ) -> Self {
        Self {
            text,
            image,
            audio,
            video,
            downloader,
            ffmpeg,
            ffprobe,
            audio_enabled,
        }
    }

    /// Analyze one text payload. Empty input is vacuously compliant;
    /// collaborator failures degrade to a manual-review result.
    pub async fn analyze_text(&self, text: &str) -> TextComplianceResult {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return TextComplianceResult {
                compliant: true,
                violations: Vec::new(),
                risk_score: 0.0,
                summary: "No text content provided".to_string(),
                processed_content: String::new(),
                detected_language: None,
                analysis_method: "no_content".to_string(),
            };
        }

        match self.text.evaluate(trimmed).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "text analysis failed");
                TextComplianceResult {
                    compliant: false,
                    violations: vec![Violation::technical(
                        "System Error",
                        format!("Text analysis failed: {}", e),
                        Severity::Unknown,
                    )],
                    risk_score: ITEM_FAILURE_RISK,
                    summary: "Text analysis error - manual review required".to_string(),
                    processed_content: trimmed.chars().take(200).collect(),
                    detected_language: None,
                    analysis_method: "error".to_string(),
                }
            }
        }
    }

    /// Download and analyze a batch of images, one outcome per URL.
    pub async fn analyze_images(&self, image_urls: &[String]) -> ImageBatchResult {
        let mut results = Vec::with_capacity(image_urls.len());

        for url in image_urls {
            let outcome = match self.analyze_one_image(url).await {
                Ok(result) => ImageAnalysisOutcome {
                    image_compliance: result,
                    source_url: url.clone(),
                },
                Err(e) => {
                    warn!(url, error = %e, "image analysis failed");
                    ImageAnalysisOutcome {
                        image_compliance: ImageComplianceResult {
                            compliant: false,
                            violations: vec![Violation::technical(
                                "System Error",
                                format!("Image analysis failed: {}", e),
                                Severity::Unknown,
                            )],
                            risk_score: ITEM_FAILURE_RISK,
                            summary: "Image analysis error".to_string(),
                            extracted_text: String::new(),
                            analysis_method: "error".to_string(),
                        },
                        source_url: url.clone(),
                    }
                }
            };
            results.push(outcome);
        }

        ImageBatchResult {
            total_images: image_urls.len(),
            analyzed_images: results.len(),
            results,
        }
    }

    async fn analyze_one_image(&self, url: &str) -> anyhow::Result<ImageComplianceResult> {
        let media = self.downloader.download(url).await?;
        let data = tokio::fs::read(media.path()).await?;
        let frame = FrameImage {
            data,
            width: 0,
            height: 0,
        };
        self.image.evaluate(&frame).await
    }

    /// Download and analyze a batch of audio files.
    pub async fn analyze_audios(&self, audio_urls: &[String]) -> AudioBatchResult {
        let mut results = Vec::with_capacity(audio_urls.len());

        for url in audio_urls {
            let result = if !self.audio_enabled {
                crate::models::AudioResult::disabled()
            } else {
                match self.analyze_one_audio(url).await {
                    Ok(result) => result,
                    Err(e) => {
                        warn!(url, error = %e, "audio analysis failed");
                        crate::models::AudioResult {
                            compliant: false,
                            violations: vec![Violation::technical(
                                "System Error",
                                format!("Audio analysis failed: {}", e),
                                Severity::Unknown,
                            )],
                            risk_score: ITEM_FAILURE_RISK,
                            summary: "Audio analysis error".to_string(),
                            transcribed_text: String::new(),
                            family_advertisement_detected: false,
                            analysis_method: "error".to_string(),
                        }
                    }
                }
            };
            results.push(result);
        }

        AudioBatchResult {
            total_audios: audio_urls.len(),
            analyzed_audios: results.len(),
            results,
        }
    }

    async fn analyze_one_audio(&self, url: &str) -> anyhow::Result<crate::models::AudioResult> {
        let media = self.downloader.download(url).await?;
        self.audio.evaluate(media.path()).await
    }

    /// Download and run the video pipeline on a batch of videos.
    pub async fn analyze_videos(&self, video_urls: &[String]) -> VideoBatchResult {
        let mut results = Vec::with_capacity(video_urls.len());

        for url in video_urls {
            let report = self.analyze_one_video(url).await;
            results.push(report);
        }

        VideoBatchResult {
            total_videos: video_urls.len(),
            analyzed_videos: results.len(),
            results,
        }
    }

    async fn analyze_one_video(&self, url: &str) -> VideoComplianceReport {
        let media = match self.downloader.download(url).await {
            Ok(media) => media,
            Err(e) => {
                warn!(url, error = %e, "video download failed");
                return self
                    .video
                    .report_unopenable(url.to_string(), format!("Download failed: {}", e));
            }
        };

        let source = match FfmpegVideoSource::open(media.path(), &self.ffmpeg, &self.ffprobe) {
            Ok(source) => source,
            Err(e) => {
                warn!(url, error = %e, "video could not be opened");
                return self
                    .video
                    .report_unopenable(url.to_string(), format!("Could not open video: {}", e));
            }
        };

        // The downloaded file outlives the check; the report carries the
        // source URL, not the temp path
        let mut report = self.video.check_video(&source).await;
        report.video_path = url.to_string();
        report
    }

    /// Pattern-based landing URL screening. Invalid URLs are vacuously
    /// compliant rather than errors; the page itself is not fetched.
    pub fn analyze_link(&self, url: &str) -> LinkComplianceResult {
        analyze_link_url(url)
    }

    /// Comprehensive check: every modality present in the request, with
    /// per-section error collection.
    pub async fn check_comprehensive(&self, request: &ComplianceCheckRequest) -> ComplianceResponse {
        let mut summary = ProcessingSummary::default();
        let mut items_processed = 0;

        info!(
            videos = request.video_links.len(),
            images = request.image_links.len(),
            audios = request.audio_links.len(),
            "starting comprehensive compliance check"
        );

        let ad_text = format!(
            "{} {}",
            request.ad_details.title, request.ad_details.description
        );
        let text_op = if !ad_text.trim().is_empty() {
            let result = self.analyze_text(&ad_text).await;
            items_processed += 1;
            if result.analysis_method == "error" {
                summary
                    .processing_errors
                    .push(format!("Text analysis: {}", result.summary));
            }
            Some(result)
        } else {
            None
        };

        let image_op = if !request.image_links.is_empty() {
            let batch = self.analyze_images(&request.image_links).await;
            items_processed += batch.analyzed_images;
            Some(batch)
        } else {
            None
        };

        let audio_op = if !request.audio_links.is_empty() {
            let batch = self.analyze_audios(&request.audio_links).await;
            items_processed += batch.analyzed_audios;
            Some(batch)
        } else {
            None
        };

        let video_op = if !request.video_links.is_empty() {
            let batch = self.analyze_videos(&request.video_links).await;
            items_processed += batch.analyzed_videos;
            for report in &batch.results {
                if let Some(error) = &report.error {
                    summary
                        .processing_errors
                        .push(format!("Video analysis ({}): {}", report.video_path, error));
                }
            }
            Some(batch)
        } else {
            None
        };

        let link_op = if !request.ad_details.landing_url.trim().is_empty() {
            let result = self.analyze_link(&request.ad_details.landing_url);
            items_processed += 1;
            Some(result)
        } else {
            None
        };

        summary.total_items_processed = items_processed;
        info!(items_processed, errors = summary.processing_errors.len(),
              "comprehensive compliance check complete");

        ComplianceResponse {
            text_op,
            image_op,
            audio_op,
            video_op,
            link_op,
            processing_summary: summary,
        }
    }
}

/// Pattern scan over the URL string; the landing page is never fetched
fn analyze_link_url(url: &str) -> LinkComplianceResult {
    if url.trim().is_empty() || !is_valid_http_url(url) {
        return LinkComplianceResult {
            compliant: true,
            violations: Vec::new(),
            risk_score: 0.0,
            summary: "No valid URL provided or URL validation failed".to_string(),
            url: url.to_string(),
            domain: String::new(),
            analysis_method: "url_validation".to_string(),
        };
    }

    let url_lower = url.to_lowercase();
    let violations: Vec<Violation> = SUSPICIOUS_URL_PATTERNS
        .iter()
        .filter(|pattern| url_lower.contains(*pattern))
        .map(|pattern| Violation {
            policy_section: "Prohibited Content".to_string(),
            description: format!("URL contains suspicious pattern: {}", pattern),
            confidence: 0.7,
            evidence: url.to_string(),
            severity: Severity::Major,
        })
        .collect();

    let compliant = violations.is_empty();
    let risk_score = (violations.len() as f64 * URL_PATTERN_RISK).min(1.0);

    LinkComplianceResult {
        compliant,
        violations,
        risk_score,
        summary: format!(
            "URL analysis completed - {}",
            if compliant { "compliant" } else { "potential issues found" }
        ),
        url: url.to_string(),
        domain: extract_domain(url),
        analysis_method: "url_pattern_analysis".to_string(),
    }
}

fn is_valid_http_url(url: &str) -> bool {
    let rest = match url.split_once("://") {
        Some(("http" | "https", rest)) => rest,
        _ => return false,
    };
    let host = rest.split(['/', '?', '#']).next().unwrap_or("");
    !host.is_empty()
}

fn extract_domain(url: &str) -> String {
    url.split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(url)
        .split(['/', '?', '#'])
        .next()
        .unwrap_or("")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_validation() {
        assert!(is_valid_http_url("https://example.com/landing"));
        assert!(is_valid_http_url("http://example.com"));
        assert!(!is_valid_http_url("ftp://example.com"));
        assert!(!is_valid_http_url("example.com/landing"));
        assert!(!is_valid_http_url("https://"));
    }

    #[test]
    fn domain_extraction() {
        assert_eq!(extract_domain("https://shop.example.com/sale?x=1"), "shop.example.com");
        assert_eq!(extract_domain("http://example.com"), "example.com");
    }

    #[test]
    fn clean_link_is_compliant() {
        let result = analyze_link_url("https://shop.example.com/summer-sale");
        assert!(result.compliant);
        assert!((result.risk_score - 0.0).abs() < f64::EPSILON);
        assert_eq!(result.domain, "shop.example.com");
        assert_eq!(result.analysis_method, "url_pattern_analysis");
    }

    #[test]
    fn suspicious_patterns_accumulate_risk() {
        let result = analyze_link_url("https://best-casino-gambling.example.com/pills");
        assert!(!result.compliant);
        assert_eq!(result.violations.len(), 3);
        // 3 * 0.3, capped at 1.0
        assert!((result.risk_score - 0.9).abs() < 1e-9);

        let maxed = analyze_link_url("https://adult-casino-gambling-pharma-pills.example.com");
        assert_eq!(maxed.violations.len(), 5);
        assert!((maxed.risk_score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn invalid_url_is_vacuously_compliant() {
        let result = analyze_link_url("not a url");
        assert!(result.compliant);
        assert_eq!(result.analysis_method, "url_validation");
        let empty = analyze_link_url("");
        assert!(empty.compliant);
    }
}
