//! Speech-to-text compliance client
//!
//! Uploads the extracted WAV to a whisper transcription endpoint, then
//! runs the transcript through the text policy collaborator. Between the
//! two sits the family-advertisement heuristic: text policy models flag
//! children's voices and gift-giving language aggressively, so transcripts
//! with clear family-ad context get those known false positives filtered
//! before scoring.

use crate::models::AudioResult;
use crate::services::key_pool::ApiKeyPool;
use crate::types::{AudioCompliance, TextCompliance};
use adcheck_common::{Severity, Violation};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const TRANSCRIPTION_MODEL: &str = "whisper-large-v3";
/// Transcripts shorter than this carry no analyzable speech
const MIN_TRANSCRIPT_CHARS: usize = 5;
/// Per-violation risk increment for transcript violations
const TRANSCRIPT_VIOLATION_RISK: f64 = 0.1;
/// Ceiling on transcript-derived risk
const TRANSCRIPT_RISK_CAP: f64 = 0.3;
/// Risk assigned when transcription or policy analysis fails outright
const ANALYSIS_FAILURE_RISK: f64 = 0.8;

const FAMILY_CONTEXT_TERMS: &[&str] = &[
    "papa", "mom", "family", "gift", "celebration", "festival", "chocolate", "cadbury",
    "sweets", "treat", "sharing", "birthday", "special occasion", "children", "kids", "home",
    "kitchen", "dinner", "snack", "dessert",
];

const LEGITIMATE_AD_PHRASES: &[&str] = &[
    "give me", "can i have", "papa", "mama", "family time", "celebration", "festival",
    "special moment", "sharing", "together", "home", "love", "care", "tradition",
];

const FAMILY_BRAND_TERMS: &[&str] = &["cadbury", "chocolate", "celebration"];

pub struct SpeechClient {
    client: Client,
    endpoint: String,
    pool: Arc<ApiKeyPool>,
    text_policy: Arc<dyn TextCompliance>,
}

impl SpeechClient {
    pub fn new(
        endpoint: &str,
        pool: Arc<ApiKeyPool>,
        text_policy: Arc<dyn TextCompliance>,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build speech client")?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            pool,
            text_policy,
        })
    }

    async fn transcribe(&self, audio_path: &Path) -> anyhow::Result<String> {
        let bytes = tokio::fs::read(audio_path)
            .await
            .with_context(|| format!("failed to read {}", audio_path.display()))?;
        let filename = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.wav".to_string());

        // One retry on a rotated key after rate exhaustion
        for attempt in 0..2 {
            let key = self
                .pool
                .acquire()
                .await
                .ok_or_else(|| anyhow::anyhow!("no speech API key available"))?;

            let part = Part::bytes(bytes.clone())
                .file_name(filename.clone())
                .mime_str("audio/wav")?;
            let form = Form::new()
                .text("model", TRANSCRIPTION_MODEL)
                .text("response_format", "text")
                .text("language", "en")
                .part("file", part);

            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&key)
                .multipart(form)
                .send()
                .await
                .context("transcription request failed")?;

            if response.status() == StatusCode::TOO_MANY_REQUESTS && attempt == 0 {
                warn!("speech backend rate-limited, rotating key");
                self.pool.mark_rate_limited(&key).await;
                continue;
            }
            let response = response
                .error_for_status()
                .context("transcription rejected")?;
            let transcript = response.text().await.context("transcription body unreadable")?;
            debug!(chars = transcript.len(), "audio transcribed");
            return Ok(transcript.trim().to_string());
        }
        anyhow::bail!("speech backend rate-limited after key rotation")
    }
}

#[async_trait]
impl AudioCompliance for SpeechClient {
    async fn evaluate(&self, audio_path: &Path) -> anyhow::Result<AudioResult> {
        let transcript = match self.transcribe(audio_path).await {
            Ok(transcript) => transcript,
            Err(e) => {
                warn!(error = %e, "transcription failed");
                return Ok(analysis_error_result(&e.to_string(), String::new()));
            }
        };

        if transcript.len() < MIN_TRANSCRIPT_CHARS {
            return Ok(AudioResult {
                compliant: true,
                violations: Vec::new(),
                risk_score: 0.1,
                summary: "No readable audio content found - likely background music or ambient sound"
                    .to_string(),
                transcribed_text: transcript,
                family_advertisement_detected: false,
                analysis_method: "whisper".to_string(),
            });
        }

        match analyze_transcript(&transcript, self.text_policy.as_ref()).await {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!(error = %e, "transcript policy analysis failed");
                Ok(analysis_error_result(&e.to_string(), transcript))
            }
        }
    }
}

/// Degraded verdict for a failed transcription or policy call:
/// non-compliant, flagged for manual review. Only extraction failures get
/// the compliant soft default (`AudioResult::unavailable`).
fn analysis_error_result(reason: &str, transcript: String) -> AudioResult {
    AudioResult {
        compliant: false,
        violations: vec![Violation::technical(
            "System Error",
            format!("Audio analysis failed: {}", reason),
            Severity::Unknown,
        )],
        risk_score: ANALYSIS_FAILURE_RISK,
        summary: "Audio analysis error - manual review required".to_string(),
        transcribed_text: transcript,
        family_advertisement_detected: false,
        analysis_method: "error".to_string(),
    }
}

/// Score a non-trivial transcript through the text policy collaborator,
/// applying the family-advertisement false-positive filter.
pub(crate) async fn analyze_transcript(
    transcript: &str,
    text_policy: &dyn TextCompliance,
) -> anyhow::Result<AudioResult> {
    let text_result = text_policy.evaluate(transcript).await?;

    let text_lower = transcript.to_lowercase();
    let family_ad = detect_family_advertisement(&text_lower);

    let original_count = text_result.violations.len();
    let violations: Vec<Violation> = if family_ad {
        text_result
            .violations
            .into_iter()
            .filter(|v| !is_family_false_positive(v))
            .collect()
    } else {
        text_result.violations
    };

    if family_ad && violations.len() < original_count {
        info!(
            filtered = original_count - violations.len(),
            "filtered family-advertisement false positives from transcript"
        );
    }

    let compliant = violations.is_empty();
    let risk_score = if compliant {
        0.0
    } else {
        (violations.len() as f64 * TRANSCRIPT_VIOLATION_RISK).min(TRANSCRIPT_RISK_CAP)
    };

    let summary = if compliant {
        if family_ad {
            "Family-friendly advertisement content - compliant with policies".to_string()
        } else {
            text_result.summary
        }
    } else {
        format!(
            "Audio content has {} policy concern(s) requiring review",
            violations.len()
        )
    };

    Ok(AudioResult {
        compliant,
        violations,
        risk_score,
        summary,
        transcribed_text: transcript.to_string(),
        family_advertisement_detected: family_ad,
        analysis_method: "whisper".to_string(),
    })
}

fn detect_family_advertisement(text_lower: &str) -> bool {
    let context_score = FAMILY_CONTEXT_TERMS
        .iter()
        .filter(|term| text_lower.contains(*term))
        .count();
    let phrase_score = LEGITIMATE_AD_PHRASES
        .iter()
        .filter(|phrase| text_lower.contains(*phrase))
        .count();

    context_score >= 2
        || phrase_score >= 1
        || FAMILY_BRAND_TERMS.iter().any(|brand| text_lower.contains(brand))
}

/// Known patterns where the policy model mistakes family-ad language for
/// child-targeting violations
fn is_family_false_positive(violation: &Violation) -> bool {
    let description = violation.description.to_lowercase();
    let evidence = violation.evidence.to_lowercase();

    let contains_any = |haystack: &str, needles: &[&str]| {
        needles.iter().any(|needle| haystack.contains(needle))
    };

    (description.contains("appealing to children")
        && contains_any(&evidence, &["papa", "family", "gift"]))
        || description.contains("child's voice")
        || (description.contains("children")
            && contains_any(&evidence, &["celebration", "chocolate", "family"]))
        || (evidence.contains("gift") && evidence.split_whitespace().count() < 10)
}
