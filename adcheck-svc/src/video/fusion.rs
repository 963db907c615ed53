//! Score fusion
//!
//! Combines per-frame visual compliance and the audio result into one
//! aggregate verdict. Pure computation over already-validated data; this
//! step cannot fail and is idempotent.
//!
//! Weights and thresholds are behavior-compatibility constants carried
//! over from the production policy. Preserve them exactly.

use crate::models::{AudioResult, ComplianceAssessment, FrameResult, TimelineEntry, ViolationSummary};
use adcheck_common::{Severity, ViolationSource};

/// Visual weight in the combined score (visuals are the primary ad surface)
const VISUAL_WEIGHT: f64 = 0.7;
/// Audio weight in the combined score
const AUDIO_WEIGHT: f64 = 0.3;
/// Compliance threshold under the strict (default) rule
const STRICT_THRESHOLD: f64 = 0.75;
/// Compliance threshold under the family-advertisement relaxation
const RELAXED_THRESHOLD: f64 = 0.65;
/// Visual bar that gates the family-advertisement relaxation
const FAMILY_VISUAL_BAR: f64 = 0.9;
/// Maximum violation timeline entries in a report
const TIMELINE_CAP: usize = 20;

/// Fuse frame and audio results into an aggregate assessment.
///
/// The family-advertisement relaxation exists because family-oriented ads
/// legitimately trigger conservative audio classifiers (children's voices,
/// gift-giving scenes). It is evidence-gated on a high visual-compliance
/// bar, not a blanket exemption: audio non-compliance is forgiven only
/// when the visual track is nearly clean.
pub fn fuse(frame_results: &[FrameResult], audio: &AudioResult) -> ComplianceAssessment {
    let total_frames = frame_results.len();
    let compliant_frames = frame_results.iter().filter(|f| f.compliant).count();

    // Vacuously compliant with zero frames; the orchestrator treats an
    // empty sample as fatal before fusion ever runs.
    let visual_compliance_score = if total_frames > 0 {
        compliant_frames as f64 / total_frames as f64
    } else {
        1.0
    };

    // A non-compliant audio track is capped below 0.5 regardless of how
    // low its risk score is.
    let audio_compliance_score = if audio.compliant {
        1.0 - audio.risk_score
    } else {
        (0.5 - audio.risk_score).max(0.0)
    };

    let compliance_score =
        VISUAL_WEIGHT * visual_compliance_score + AUDIO_WEIGHT * audio_compliance_score;
    let risk_score = 1.0 - compliance_score;

    let critical_violations = frame_results
        .iter()
        .flat_map(|f| f.violations.iter())
        .chain(audio.violations.iter())
        .filter(|v| v.severity == Severity::Critical)
        .count();

    let video_compliant =
        if audio.family_advertisement_detected && visual_compliance_score >= FAMILY_VISUAL_BAR {
            compliance_score >= RELAXED_THRESHOLD && critical_violations == 0
        } else {
            compliance_score >= STRICT_THRESHOLD && critical_violations == 0 && audio.compliant
        };

    ComplianceAssessment {
        video_compliant,
        compliance_score,
        risk_score,
        visual_compliance_score,
        audio_compliance_score,
        compliant_frames,
        non_compliant_frames: total_frames - compliant_frames,
        compliance_percentage: if total_frames > 0 {
            compliant_frames as f64 / total_frames as f64 * 100.0
        } else {
            100.0
        },
        audio_compliant: audio.compliant,
    }
}

/// Build the violation summary: counts by severity, density, and a
/// timestamp-sorted timeline capped at 20 entries. Audio violations have
/// whole-track scope and land at t=0 with frame number -1.
pub fn summarize_violations(
    frame_results: &[FrameResult],
    audio: &AudioResult,
) -> ViolationSummary {
    let mut timeline = Vec::new();
    let mut visual_violations = 0usize;

    for frame in frame_results {
        for violation in &frame.violations {
            visual_violations += 1;
            timeline.push(TimelineEntry {
                timestamp: frame.timestamp,
                frame_number: frame.frame_number as i64,
                description: violation.description.clone(),
                severity: violation.severity,
                source: ViolationSource::Visual,
            });
        }
    }

    let audio_violations = audio.violations.len();
    for violation in &audio.violations {
        timeline.push(TimelineEntry {
            timestamp: 0.0,
            frame_number: -1,
            description: violation.description.clone(),
            severity: violation.severity,
            source: ViolationSource::Audio,
        });
    }

    let count_severity = |severity: Severity| {
        frame_results
            .iter()
            .flat_map(|f| f.violations.iter())
            .chain(audio.violations.iter())
            .filter(|v| v.severity == severity)
            .count()
    };

    timeline.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
    timeline.truncate(TIMELINE_CAP);

    let total_violations = visual_violations + audio_violations;

    ViolationSummary {
        total_violations,
        visual_violations,
        audio_violations,
        critical_violations: count_severity(Severity::Critical),
        major_violations: count_severity(Severity::Major),
        minor_violations: count_severity(Severity::Minor),
        violation_density: if frame_results.is_empty() {
            0.0
        } else {
            total_violations as f64 / frame_results.len() as f64
        },
        violation_timeline: timeline,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adcheck_common::Violation;

    fn frame(number: u64, compliant: bool, violations: Vec<Violation>) -> FrameResult {
        FrameResult {
            frame_number: number,
            timestamp: number as f64 / 30.0,
            frame_position: number as f64 / 300.0,
            compliant,
            violations,
            risk_score: if compliant { 0.1 } else { 0.8 },
            summary: String::new(),
        }
    }

    fn clean_audio() -> AudioResult {
        AudioResult {
            compliant: true,
            violations: Vec::new(),
            risk_score: 0.0,
            summary: String::new(),
            transcribed_text: String::new(),
            family_advertisement_detected: false,
            analysis_method: "test".to_string(),
        }
    }

    #[test]
    fn fully_compliant_video_scores_one() {
        let frames: Vec<_> = (0..10).map(|i| frame(i, true, Vec::new())).collect();
        let assessment = fuse(&frames, &clean_audio());

        assert!((assessment.compliance_score - 1.0).abs() < f64::EPSILON);
        assert!(assessment.video_compliant);
        assert_eq!(assessment.compliant_frames, 10);
        assert_eq!(assessment.non_compliant_frames, 0);
    }

    #[test]
    fn audio_gate_fails_video_despite_high_combined_score() {
        // Non-compliant audio with zero risk: audio score capped at 0.5,
        // combined = 0.7*1.0 + 0.3*0.5 = 0.85 >= 0.75, but the strict
        // rule's hard audio-compliance clause still fails the video.
        let frames: Vec<_> = (0..10).map(|i| frame(i, true, Vec::new())).collect();
        let audio = AudioResult {
            compliant: false,
            risk_score: 0.0,
            ..clean_audio()
        };

        let assessment = fuse(&frames, &audio);
        assert!((assessment.audio_compliance_score - 0.5).abs() < 1e-9);
        assert!((assessment.compliance_score - 0.85).abs() < 1e-9);
        assert!(!assessment.video_compliant);
    }

    #[test]
    fn family_relaxation_forgives_audio_non_compliance() {
        // visual = 0.95 >= 0.9, combined = 0.7*0.95 + 0.3*0.117 ≈ 0.70
        // >= 0.65, zero criticals: compliant under the relaxed rule even
        // with non-compliant audio.
        let mut frames: Vec<_> = (0..19).map(|i| frame(i, true, Vec::new())).collect();
        frames.push(frame(19, false, Vec::new()));
        let audio = AudioResult {
            compliant: false,
            risk_score: 0.383,
            family_advertisement_detected: true,
            ..clean_audio()
        };

        let assessment = fuse(&frames, &audio);
        assert!((assessment.visual_compliance_score - 0.95).abs() < 1e-9);
        assert!(assessment.compliance_score >= RELAXED_THRESHOLD);
        assert!(assessment.compliance_score < STRICT_THRESHOLD);
        assert!(assessment.video_compliant);
    }

    #[test]
    fn relaxation_requires_visual_bar() {
        // Same audio flag but visual below 0.9: the strict rule applies
        // and the audio gate fails the video.
        let mut frames: Vec<_> = (0..8).map(|i| frame(i, true, Vec::new())).collect();
        frames.push(frame(8, false, Vec::new()));
        frames.push(frame(9, false, Vec::new()));
        let audio = AudioResult {
            compliant: false,
            risk_score: 0.1,
            family_advertisement_detected: true,
            ..clean_audio()
        };

        let assessment = fuse(&frames, &audio);
        assert!(assessment.visual_compliance_score < FAMILY_VISUAL_BAR);
        assert!(!assessment.video_compliant);
    }

    #[test]
    fn critical_violation_fails_both_rules() {
        let violation = Violation {
            policy_section: "Prohibited Content".to_string(),
            description: "Adult content".to_string(),
            confidence: 0.95,
            evidence: "frame".to_string(),
            severity: Severity::Critical,
        };
        let frames = vec![frame(0, true, vec![violation]), frame(1, true, Vec::new())];
        let audio = AudioResult {
            family_advertisement_detected: true,
            ..clean_audio()
        };

        let assessment = fuse(&frames, &audio);
        assert!(!assessment.video_compliant);
    }

    #[test]
    fn zero_frames_vacuously_compliant_visual() {
        let assessment = fuse(&[], &clean_audio());
        assert!((assessment.visual_compliance_score - 1.0).abs() < f64::EPSILON);
        assert!((assessment.compliance_percentage - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn fusion_is_idempotent() {
        let frames = vec![
            frame(0, true, Vec::new()),
            frame(
                7,
                false,
                vec![Violation::technical(
                    "System Error",
                    "frame analysis failed".to_string(),
                    Severity::Major,
                )],
            ),
        ];
        let audio = AudioResult {
            risk_score: 0.2,
            ..clean_audio()
        };

        let first = fuse(&frames, &audio);
        let second = fuse(&frames, &audio);
        assert_eq!(first, second);
    }

    #[test]
    fn timeline_sorted_and_capped() {
        let violation = |desc: &str| Violation {
            policy_section: "Test".to_string(),
            description: desc.to_string(),
            confidence: 0.9,
            evidence: String::new(),
            severity: Severity::Minor,
        };
        // 25 visual violations across descending frame numbers plus one
        // audio violation at t=0
        let frames: Vec<_> = (1..26)
            .rev()
            .map(|i| frame(i, false, vec![violation(&format!("v{}", i))]))
            .collect();
        let audio = AudioResult {
            compliant: false,
            violations: vec![violation("audio")],
            risk_score: 0.3,
            ..clean_audio()
        };

        let summary = summarize_violations(&frames, &audio);
        assert_eq!(summary.total_violations, 26);
        assert_eq!(summary.visual_violations, 25);
        assert_eq!(summary.audio_violations, 1);
        assert_eq!(summary.violation_timeline.len(), 20);
        assert!(summary
            .violation_timeline
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp));
        // Audio violation lands at the front: t=0, frame -1
        assert_eq!(summary.violation_timeline[0].frame_number, -1);
    }

    #[test]
    fn severity_counts() {
        let v = |severity: Severity| Violation {
            policy_section: "Test".to_string(),
            description: "x".to_string(),
            confidence: 0.9,
            evidence: String::new(),
            severity,
        };
        let frames = vec![frame(
            0,
            false,
            vec![v(Severity::Critical), v(Severity::Major), v(Severity::Minor)],
        )];
        let audio = AudioResult {
            compliant: false,
            violations: vec![v(Severity::Minor)],
            risk_score: 0.2,
            ..clean_audio()
        };

        let summary = summarize_violations(&frames, &audio);
        assert_eq!(summary.critical_violations, 1);
        assert_eq!(summary.major_violations, 1);
        assert_eq!(summary.minor_violations, 2);
        assert!((summary.violation_density - 4.0).abs() < f64::EPSILON);
    }
}
