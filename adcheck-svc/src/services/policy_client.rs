//! Text policy compliance client
//!
//! Evaluates advertisement text against the loaded policy document via an
//! LLM. Routing is language-aware: English text goes to the fast default
//! model, anything else to the multilingual model with a prompt that
//! warns against flagging cultural context as violations.
//!
//! Transport failures are errors (callers degrade per their own rules);
//! an unparseable model verdict degrades here to a manual-review result.

use crate::models::TextComplianceResult;
use crate::services::parsing::parse_model_json;
use crate::types::TextCompliance;
use adcheck_common::Violation;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
/// Default model for English text
const ENGLISH_MODEL: &str = "llama-3.1-8b-instant";
/// Multilingual model for everything else
const MULTILINGUAL_MODEL: &str = "gemini-2.5-flash";
/// Policy excerpt length included in prompts
const POLICY_EXCERPT_CHARS: usize = 2000;
/// Risk assigned when the model's verdict cannot be parsed
const PARSE_FAILURE_RISK: f64 = 0.7;

pub struct PolicyClient {
    client: Client,
    endpoint: String,
    api_key: String,
    policy_text: String,
}

impl PolicyClient {
    pub fn new(endpoint: &str, api_key: &str, policy_text: String) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build policy client")?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            policy_text,
        })
    }

    fn policy_excerpt(&self) -> String {
        truncate_chars(&self.policy_text, POLICY_EXCERPT_CHARS)
    }

    fn english_prompt(&self, ad_text: &str) -> String {
        format!(
            "You are an expert advertisement policy compliance analyzer.\n\n\
             POLICY DOCUMENT:\n{policy}\n\n\
             ADVERTISEMENT TEXT:\n{ad_text}\n\n\
             Analyze the advertisement against the policy and return ONLY a JSON object:\n\
             {{\"compliant\": bool, \"violations\": [{{\"policy_section\": str, \
             \"violation\": str, \"confidence\": float, \"evidence\": str}}], \
             \"risk_score\": float, \"summary\": str, \"processed_content\": str}}\n\n\
             Focus on:\n\
             1. Prohibited content (drugs, medical claims, financial guarantees)\n\
             2. Target audience restrictions (children, vulnerable groups)\n\
             3. Misleading claims or guarantees\n\
             4. Required disclaimers or warnings",
            policy = self.policy_excerpt(),
            ad_text = ad_text
        )
    }

    fn multilingual_prompt(&self, ad_text: &str, detected_lang: &str) -> String {
        format!(
            "You are an expert advertisement policy compliance analyzer with multilingual \
             capabilities.\n\n\
             RELEVANT POLICY SECTIONS:\n{policy}\n\n\
             ADVERTISEMENT TEXT (Language: {lang}):\n{ad_text}\n\n\
             ANALYSIS INSTRUCTIONS:\n\
             1. Analyze the advertisement against the policy sections above\n\
             2. Consider the cultural and linguistic context of language \"{lang}\"\n\
             3. Focus on actual policy violations, not cultural differences or normal \
             business language\n\
             4. Do NOT flag standard festival greetings, product mentions, or family \
             conversations as violations\n\n\
             Return ONLY a JSON object:\n\
             {{\"compliant\": bool, \"violations\": [{{\"policy_section\": str, \
             \"violation\": str, \"confidence\": float, \"evidence\": str}}], \
             \"risk_score\": float, \"summary\": str, \"processed_content\": str}}\n\n\
             Keep violations concise (max 30 words each) and the summary under 40 words.",
            policy = self.policy_excerpt(),
            lang = detected_lang,
            ad_text = ad_text
        )
    }

    async fn complete(&self, model: &str, prompt: &str) -> anyhow::Result<String> {
        let body = json!({
            "model": model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0.1,
            "max_tokens": 1024,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("policy analysis request failed")?
            .error_for_status()
            .context("policy analysis rejected")?;

        let completion: ChatResponse = response
            .json()
            .await
            .context("malformed policy response envelope")?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow::anyhow!("policy response had no choices"))
    }
}

#[async_trait]
impl TextCompliance for PolicyClient {
    async fn evaluate(&self, text: &str) -> anyhow::Result<TextComplianceResult> {
        let (lang_code, is_english) = detect_language(text);

        let (model, prompt, method) = if is_english {
            (ENGLISH_MODEL, self.english_prompt(text), "policy_llm")
        } else {
            (
                MULTILINGUAL_MODEL,
                self.multilingual_prompt(text, &lang_code),
                "policy_llm_multilingual",
            )
        };

        debug!(language = %lang_code, model, "evaluating text against policy");
        let content = self.complete(model, &prompt).await?;

        match parse_model_json::<TextVerdict>(&content) {
            Some(verdict) => Ok(TextComplianceResult {
                compliant: verdict.compliant,
                violations: verdict.violations,
                risk_score: verdict.risk_score.clamp(0.0, 1.0),
                summary: verdict.summary,
                processed_content: if verdict.processed_content.is_empty() {
                    truncate_chars(text, 200)
                } else {
                    verdict.processed_content
                },
                detected_language: Some(lang_code),
                analysis_method: method.to_string(),
            }),
            None => {
                warn!("policy verdict was not parseable, flagging for manual review");
                Ok(TextComplianceResult {
                    compliant: false,
                    violations: vec![Violation::technical(
                        "Analysis Error",
                        "Could not parse compliance analysis".to_string(),
                        adcheck_common::Severity::Unknown,
                    )],
                    risk_score: PARSE_FAILURE_RISK,
                    summary: "Analysis failed - manual review required".to_string(),
                    processed_content: truncate_chars(text, 200),
                    detected_language: Some(lang_code),
                    analysis_method: format!("{}_parse_error", method),
                })
            }
        }
    }
}

/// Detect the text language, defaulting to English when detection is
/// inconclusive (short or mixed-script text).
fn detect_language(text: &str) -> (String, bool) {
    match whatlang::detect(text) {
        Some(info) => {
            let is_english = info.lang() == whatlang::Lang::Eng;
            (info.lang().code().to_string(), is_english)
        }
        None => ("eng".to_string(), true),
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
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

/// Verdict shape the models are prompted for; `compliant`, `violations`,
/// and `risk_score` are mandatory, anything else degrades gracefully
#[derive(Debug, Deserialize)]
struct TextVerdict {
    compliant: bool,
    violations: Vec<Violation>,
    risk_score: f64,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    processed_content: String,
}
