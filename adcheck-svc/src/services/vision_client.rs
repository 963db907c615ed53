//! Vision-language inference client
//!
//! Sends one JPEG frame per request to an OpenAI-compatible chat
//! completions endpoint and maps the model's JSON verdict onto
//! `ImageComplianceResult`. Unparseable model output degrades to a
//! conservative manual-review verdict instead of an error; transport
//! failures surface as errors so the frame layer can isolate them.

use crate::models::ImageComplianceResult;
use crate::services::key_pool::ApiKeyPool;
use crate::services::parsing::parse_model_json;
use crate::types::{FrameImage, ImageCompliance};
use adcheck_common::Violation;
use anyhow::Context;
use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Per-request time budget for vision inference
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
/// Backoff before the single retry on a 503
const UNAVAILABLE_BACKOFF: Duration = Duration::from_secs(30);
/// Risk assigned when the model's verdict cannot be parsed
const PARSE_FAILURE_RISK: f64 = 0.8;

const DEFAULT_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";

const VISION_PROMPT: &str = "You are an advertisement compliance reviewer. Analyze this \
advertisement frame for policy violations: adult or sexual content, violence, weapons, \
drugs, alcohol or tobacco promotion, gambling, misleading or unsubstantiated claims, \
hate symbols, and content harmful to minors. Also read any text visible in the frame.\n\
Respond with only a JSON object:\n\
{\"compliant\": bool, \"violations\": [{\"policy_section\": str, \"violation\": str, \
\"confidence\": float, \"evidence\": str, \"severity\": \"critical\"|\"major\"|\"minor\"}], \
\"risk_score\": float, \"summary\": str, \"extracted_text\": str}";

pub struct VisionClient {
    client: Client,
    endpoint: String,
    model: String,
    pool: Arc<ApiKeyPool>,
}

impl VisionClient {
    pub fn new(endpoint: &str, pool: Arc<ApiKeyPool>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build vision client")?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            model: DEFAULT_MODEL.to_string(),
            pool,
        })
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    async fn request_verdict(&self, frame: &FrameImage) -> anyhow::Result<String> {
        let image_b64 = base64::engine::general_purpose::STANDARD.encode(&frame.data);
        let body = json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": VISION_PROMPT},
                    {"type": "image_url", "image_url": {
                        "url": format!("data:image/jpeg;base64,{}", image_b64)
                    }}
                ]
            }],
            "temperature": 0.1,
            "max_tokens": 1024,
        });

        // One extra attempt covers a rotated key after a 429 or a backend
        // that answered 503
        for attempt in 0..2 {
            let key = self
                .pool
                .acquire()
                .await
                .ok_or_else(|| anyhow::anyhow!("no vision API key available"))?;

            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&key)
                .json(&body)
                .send()
                .await
                .context("vision request failed")?;

            match response.status() {
                StatusCode::TOO_MANY_REQUESTS if attempt == 0 => {
                    warn!("vision backend rate-limited, rotating key");
                    self.pool.mark_rate_limited(&key).await;
                    continue;
                }
                StatusCode::SERVICE_UNAVAILABLE if attempt == 0 => {
                    warn!(
                        backoff_secs = UNAVAILABLE_BACKOFF.as_secs(),
                        "vision backend unavailable, backing off"
                    );
                    tokio::time::sleep(UNAVAILABLE_BACKOFF).await;
                    continue;
                }
                status if !status.is_success() => {
                    anyhow::bail!("vision backend returned {}", status);
                }
                _ => {}
            }

            let completion: ChatResponse = response
                .json()
                .await
                .context("malformed vision response envelope")?;
            let content = completion
                .choices
                .into_iter()
                .next()
                .map(|c| c.message.content)
                .ok_or_else(|| anyhow::anyhow!("vision response had no choices"))?;
            return Ok(content);
        }
        anyhow::bail!("vision backend unavailable after retry")
    }
}

#[async_trait]
impl ImageCompliance for VisionClient {
    async fn evaluate(&self, frame: &FrameImage) -> anyhow::Result<ImageComplianceResult> {
        let content = self.request_verdict(frame).await?;

        match parse_model_json::<VisionVerdict>(&content) {
            Some(verdict) => {
                debug!(
                    compliant = verdict.compliant,
                    risk_score = verdict.risk_score,
                    violations = verdict.violations.len(),
                    "vision verdict parsed"
                );
                Ok(ImageComplianceResult {
                    compliant: verdict.compliant,
                    violations: verdict.violations,
                    risk_score: verdict.risk_score.clamp(0.0, 1.0),
                    summary: verdict.summary,
                    extracted_text: verdict.extracted_text,
                    analysis_method: "vision_llm".to_string(),
                })
            }
            None => {
                warn!("vision verdict was not parseable, flagging for manual review");
                Ok(ImageComplianceResult {
                    compliant: false,
                    violations: Vec::new(),
                    risk_score: PARSE_FAILURE_RISK,
                    summary: "Model response could not be parsed; manual review required"
                        .to_string(),
                    extracted_text: String::new(),
                    analysis_method: "vision_llm_unparsed".to_string(),
                })
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct VisionVerdict {
    compliant: bool,
    #[serde(default)]
    violations: Vec<Violation>,
    #[serde(default = "default_risk")]
    risk_score: f64,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    extracted_text: String,
}

fn default_risk() -> f64 {
    0.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use adcheck_common::Severity;

    #[test]
    fn verdict_parses_with_violation_alias_and_defaults() {
        let content = r#"```json
        {
            "compliant": false,
            "violations": [{
                "policy_section": "Prohibited Content",
                "violation": "Weapon prominently displayed",
                "confidence": 0.92,
                "evidence": "handgun on table",
                "severity": "critical"
            }],
            "risk_score": 0.85,
            "summary": "Frame shows a weapon"
        }
        ```"#;
        let verdict: VisionVerdict = parse_model_json(content).unwrap();
        assert!(!verdict.compliant);
        assert_eq!(verdict.violations.len(), 1);
        assert_eq!(verdict.violations[0].severity, Severity::Critical);
        assert_eq!(verdict.violations[0].description, "Weapon prominently displayed");
        assert!(verdict.extracted_text.is_empty());
    }

    #[test]
    fn verdict_risk_defaults_when_missing() {
        let verdict: VisionVerdict =
            parse_model_json(r#"{"compliant": true, "summary": "clean"}"#).unwrap();
        assert!((verdict.risk_score - 0.5).abs() < f64::EPSILON);
        assert!(verdict.violations.is_empty());
    }
}
