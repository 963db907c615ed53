//! Per-frame visual analysis
//!
//! Walks the sampled frame numbers in order, decoding each frame and
//! handing it to the image compliance collaborator. Failures are isolated
//! per frame: a decode failure drops the frame from the results, a
//! collaborator failure yields a conservative synthetic result. One bad
//! frame never aborts the batch.

use crate::models::{FrameResult, VideoMetadata};
use crate::types::ImageCompliance;
use crate::video::source::VideoSource;
use adcheck_common::{Severity, Violation};
use tracing::{debug, warn};

/// Risk score assigned when the collaborator fails on a frame
const ANALYSIS_FAILURE_RISK: f64 = 0.8;

/// Analyze the sampled frames in order.
///
/// The returned sequence preserves sampling order; it may be shorter than
/// `frame_numbers` when frames fail to decode.
pub async fn analyze_frames(
    source: &dyn VideoSource,
    analyzer: &dyn ImageCompliance,
    frame_numbers: &[u64],
    metadata: &VideoMetadata,
) -> Vec<FrameResult> {
    let mut results = Vec::with_capacity(frame_numbers.len());

    for &frame_number in frame_numbers {
        let timestamp = if metadata.fps > 0.0 {
            frame_number as f64 / metadata.fps
        } else {
            0.0
        };
        let frame_position = if metadata.total_frames > 0 {
            frame_number as f64 / metadata.total_frames as f64
        } else {
            0.0
        };

        let frame = match source.read_frame(frame_number).await {
            Ok(frame) => frame,
            Err(e) => {
                warn!(frame_number, error = %e, "failed to decode frame, skipping");
                continue;
            }
        };

        let result = match analyzer.evaluate(&frame).await {
            Ok(image_result) => {
                debug!(
                    frame_number,
                    compliant = image_result.compliant,
                    risk_score = image_result.risk_score,
                    "frame analyzed"
                );
                FrameResult {
                    frame_number,
                    timestamp,
                    frame_position,
                    compliant: image_result.compliant,
                    violations: image_result.violations,
                    risk_score: image_result.risk_score,
                    summary: image_result.summary,
                }
            }
            Err(e) => {
                warn!(frame_number, error = %e, "frame analysis failed");
                FrameResult {
                    frame_number,
                    timestamp,
                    frame_position,
                    compliant: false,
                    violations: vec![Violation::technical(
                        "System Error",
                        format!("Frame analysis failed: {}", e),
                        Severity::Unknown,
                    )],
                    risk_score: ANALYSIS_FAILURE_RISK,
                    summary: format!("Frame {} could not be analyzed", frame_number),
                }
            }
        };
        results.push(result);
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImageComplianceResult;
    use crate::types::FrameImage;
    use adcheck_common::Result as CommonResult;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::path::Path;

    /// Scripted source: frames in `unreadable` fail to decode
    struct ScriptedSource {
        metadata: VideoMetadata,
        unreadable: HashSet<u64>,
    }

    #[async_trait]
    impl VideoSource for ScriptedSource {
        fn path(&self) -> &Path {
            Path::new("/tmp/test.mp4")
        }

        async fn metadata(&self) -> CommonResult<VideoMetadata> {
            Ok(self.metadata.clone())
        }

        async fn read_frame(&self, frame_number: u64) -> anyhow::Result<FrameImage> {
            if self.unreadable.contains(&frame_number) {
                anyhow::bail!("decode error at frame {}", frame_number);
            }
            Ok(FrameImage {
                data: vec![0xFF, 0xD8, 0xFF],
                width: 640,
                height: 480,
            })
        }
    }

    /// Scripted collaborator: frames in `failing` error out, frames in
    /// `non_compliant` return a violation
    struct ScriptedAnalyzer {
        failing: HashSet<u64>,
        non_compliant: HashSet<u64>,
        calls: std::sync::Mutex<Vec<u64>>,
    }

    impl ScriptedAnalyzer {
        fn new(failing: &[u64], non_compliant: &[u64]) -> Self {
            Self {
                failing: failing.iter().copied().collect(),
                non_compliant: non_compliant.iter().copied().collect(),
                calls: std::sync::Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ImageCompliance for ScriptedAnalyzer {
        async fn evaluate(&self, frame: &FrameImage) -> anyhow::Result<ImageComplianceResult> {
            // Frame number is not visible here, so the source encodes it
            // via call order; record width as a sanity check instead.
            assert_eq!(frame.width, 640);
            let call_index = {
                let mut calls = self.calls.lock().unwrap();
                let i = calls.len() as u64;
                calls.push(i);
                i
            };
            if self.failing.contains(&call_index) {
                anyhow::bail!("backend unavailable");
            }
            let compliant = !self.non_compliant.contains(&call_index);
            Ok(ImageComplianceResult {
                compliant,
                violations: if compliant {
                    Vec::new()
                } else {
                    vec![Violation {
                        policy_section: "Prohibited Content".to_string(),
                        description: "test violation".to_string(),
                        confidence: 0.9,
                        evidence: String::new(),
                        severity: Severity::Major,
                    }]
                },
                risk_score: if compliant { 0.1 } else { 0.8 },
                summary: "scripted".to_string(),
                extracted_text: String::new(),
                analysis_method: "scripted".to_string(),
            })
        }
    }

    fn source(unreadable: &[u64]) -> ScriptedSource {
        ScriptedSource {
            metadata: VideoMetadata::new(300, 30.0, 640, 480),
            unreadable: unreadable.iter().copied().collect(),
        }
    }

    #[tokio::test]
    async fn results_preserve_sampling_order() {
        let src = source(&[]);
        let analyzer = ScriptedAnalyzer::new(&[], &[]);
        let frames = [0u64, 75, 150, 225, 299];

        let results = analyze_frames(&src, &analyzer, &frames, &src.metadata).await;

        assert_eq!(results.len(), 5);
        let numbers: Vec<u64> = results.iter().map(|r| r.frame_number).collect();
        assert_eq!(numbers, frames);
        assert!((results[1].timestamp - 2.5).abs() < 1e-9);
        assert!((results[1].frame_position - 0.25).abs() < 1e-9);
    }

    #[tokio::test]
    async fn decode_failure_skips_frame() {
        let src = source(&[150]);
        let analyzer = ScriptedAnalyzer::new(&[], &[]);

        let results = analyze_frames(&src, &analyzer, &[0, 150, 299], &src.metadata).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].frame_number, 0);
        assert_eq!(results[1].frame_number, 299);
    }

    #[tokio::test]
    async fn collaborator_failure_yields_conservative_result() {
        let src = source(&[]);
        // Second call fails
        let analyzer = ScriptedAnalyzer::new(&[1], &[]);

        let results = analyze_frames(&src, &analyzer, &[0, 75, 150], &src.metadata).await;

        assert_eq!(results.len(), 3);
        let failed = &results[1];
        assert_eq!(failed.frame_number, 75);
        assert!(!failed.compliant);
        assert!((failed.risk_score - ANALYSIS_FAILURE_RISK).abs() < f64::EPSILON);
        assert_eq!(failed.violations.len(), 1);
        assert_eq!(failed.violations[0].policy_section, "System Error");
        assert_eq!(failed.violations[0].severity, Severity::Unknown);
        assert!((failed.violations[0].confidence - 0.5).abs() < f64::EPSILON);
        // Neighbors are unaffected
        assert!(results[0].compliant);
        assert!(results[2].compliant);
    }

    #[tokio::test]
    async fn non_compliant_frames_carry_violations() {
        let src = source(&[]);
        let analyzer = ScriptedAnalyzer::new(&[], &[0]);

        let results = analyze_frames(&src, &analyzer, &[10, 20], &src.metadata).await;

        assert!(!results[0].compliant);
        assert_eq!(results[0].violations.len(), 1);
        assert!(results[1].compliant);
    }
}
