//! Configuration resolution for adcheck-svc
//!
//! Every setting resolves with ENV → TOML → default priority. API keys
//! additionally warn when configured in multiple sources, since a stale
//! TOML key shadowed by an environment variable is a recurring
//! misconfiguration.

use crate::video::sampler::SamplingStrategy;
use crate::video::DEFAULT_MAX_FRAMES;
use adcheck_common::config::{is_valid_key, TomlConfig};
use adcheck_common::{Error, Result};
use std::path::PathBuf;
use tracing::{info, warn};

const DEFAULT_BIND_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 5850;
const DEFAULT_VISION_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
const DEFAULT_SPEECH_ENDPOINT: &str = "https://api.groq.com/openai/v1/audio/transcriptions";
const DEFAULT_LLM_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
const DEFAULT_POLICY_FILE: &str = "policy.txt";

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_host: String,
    pub port: u16,
    pub log_level: String,

    pub vision_api_key: Option<String>,
    pub vision_endpoint: String,
    pub speech_api_keys: Vec<String>,
    pub speech_endpoint: String,
    pub llm_api_key: Option<String>,
    pub llm_endpoint: String,

    pub max_frames_per_video: usize,
    pub sampling_strategy: SamplingStrategy,
    pub include_audio_analysis: bool,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub policy_file: PathBuf,
}

impl ServiceConfig {
    /// Resolve configuration from the TOML file and environment.
    pub fn resolve(toml: &TomlConfig) -> Result<Self> {
        let vision_api_key = resolve_key("ADCHECK_VISION_API_KEY", toml.vision_api_key.as_deref());
        let llm_api_key = resolve_key("ADCHECK_LLM_API_KEY", toml.llm_api_key.as_deref());
        let speech_api_keys = resolve_speech_keys(&toml.speech_api_keys);

        // Audio analysis requires at least one speech key; an explicit
        // `include_audio_analysis = true` with no keys is a config error
        let include_audio_analysis = match resolve_bool(
            "ADCHECK_INCLUDE_AUDIO_ANALYSIS",
            toml.include_audio_analysis,
        )? {
            Some(true) if speech_api_keys.is_empty() => {
                return Err(Error::Config(
                    "include_audio_analysis is enabled but no speech API keys are configured"
                        .to_string(),
                ));
            }
            Some(explicit) => explicit,
            None => !speech_api_keys.is_empty(),
        };

        let max_frames_per_video = match std::env::var("ADCHECK_MAX_FRAMES_PER_VIDEO") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| Error::Config(format!("Invalid ADCHECK_MAX_FRAMES_PER_VIDEO: {}", raw)))?,
            Err(_) => toml.max_frames_per_video.unwrap_or(DEFAULT_MAX_FRAMES),
        };

        let sampling_strategy = SamplingStrategy::parse(
            &resolve_string("ADCHECK_SAMPLING_STRATEGY", toml.sampling_strategy.as_deref())
                .unwrap_or_else(|| "adaptive".to_string()),
        );

        let port = match std::env::var("ADCHECK_PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| Error::Config(format!("Invalid ADCHECK_PORT: {}", raw)))?,
            Err(_) => toml.port.unwrap_or(DEFAULT_PORT),
        };

        let config = Self {
            bind_host: resolve_string("ADCHECK_BIND_HOST", toml.bind_host.as_deref())
                .unwrap_or_else(|| DEFAULT_BIND_HOST.to_string()),
            port,
            log_level: resolve_string("ADCHECK_LOG_LEVEL", toml.log_level.as_deref())
                .unwrap_or_else(|| "info".to_string()),
            vision_api_key,
            vision_endpoint: resolve_string("ADCHECK_VISION_ENDPOINT", toml.vision_endpoint.as_deref())
                .unwrap_or_else(|| DEFAULT_VISION_ENDPOINT.to_string()),
            speech_api_keys,
            speech_endpoint: resolve_string("ADCHECK_SPEECH_ENDPOINT", toml.speech_endpoint.as_deref())
                .unwrap_or_else(|| DEFAULT_SPEECH_ENDPOINT.to_string()),
            llm_api_key,
            llm_endpoint: resolve_string("ADCHECK_LLM_ENDPOINT", toml.llm_endpoint.as_deref())
                .unwrap_or_else(|| DEFAULT_LLM_ENDPOINT.to_string()),
            max_frames_per_video,
            sampling_strategy,
            include_audio_analysis,
            ffmpeg_path: resolve_string("ADCHECK_FFMPEG_PATH", toml.ffmpeg_path.as_deref())
                .unwrap_or_else(|| "ffmpeg".to_string()),
            ffprobe_path: resolve_string("ADCHECK_FFPROBE_PATH", toml.ffprobe_path.as_deref())
                .unwrap_or_else(|| "ffprobe".to_string()),
            policy_file: PathBuf::from(
                resolve_string("ADCHECK_POLICY_FILE", toml.policy_file.as_deref())
                    .unwrap_or_else(|| DEFAULT_POLICY_FILE.to_string()),
            ),
        };

        info!(
            bind = %format!("{}:{}", config.bind_host, config.port),
            audio_analysis = config.include_audio_analysis,
            speech_keys = config.speech_api_keys.len(),
            strategy = config.sampling_strategy.as_str(),
            "configuration resolved"
        );

        Ok(config)
    }
}

/// Resolve a plain string setting: ENV over TOML.
fn resolve_string(env_var: &str, toml_value: Option<&str>) -> Option<String> {
    if let Ok(value) = std::env::var(env_var) {
        if !value.trim().is_empty() {
            return Some(value);
        }
    }
    toml_value
        .filter(|v| !v.trim().is_empty())
        .map(|v| v.to_string())
}

/// Resolve an optional boolean setting.
fn resolve_bool(env_var: &str, toml_value: Option<bool>) -> Result<Option<bool>> {
    match std::env::var(env_var) {
        Ok(raw) => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(Some(true)),
            "false" | "0" | "no" => Ok(Some(false)),
            _ => Err(Error::Config(format!("Invalid {}: {}", env_var, raw))),
        },
        Err(_) => Ok(toml_value),
    }
}

/// Resolve an API key, warning when it is set in multiple sources.
fn resolve_key(env_var: &str, toml_value: Option<&str>) -> Option<String> {
    let env_key = std::env::var(env_var).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_value.filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            "{} found in both environment and TOML. Using environment (highest priority).",
            env_var
        );
    }

    env_key.or_else(|| toml_key.map(|k| k.to_string()))
}

/// Collect speech keys: `ADCHECK_SPEECH_API_KEY` plus numbered variants
/// `_2` through `_4`, falling back to the TOML list.
fn resolve_speech_keys(toml_keys: &[String]) -> Vec<String> {
    let mut env_keys = Vec::new();
    if let Ok(key) = std::env::var("ADCHECK_SPEECH_API_KEY") {
        if is_valid_key(&key) {
            env_keys.push(key);
        }
    }
    for i in 2..=4 {
        if let Ok(key) = std::env::var(format!("ADCHECK_SPEECH_API_KEY_{}", i)) {
            if is_valid_key(&key) {
                env_keys.push(key);
            }
        }
    }

    if !env_keys.is_empty() {
        if !toml_keys.is_empty() {
            warn!("Speech API keys found in both environment and TOML. Using environment.");
        }
        return env_keys;
    }

    toml_keys
        .iter()
        .filter(|k| is_valid_key(k))
        .cloned()
        .collect()
}
