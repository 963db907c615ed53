//! Configuration file loading
//!
//! The service is configured through a TOML file plus `ADCHECK_*`
//! environment variable overrides. Resolution priority for every setting:
//!
//! 1. Environment variable (highest)
//! 2. TOML config file
//! 3. Compiled default
//!
//! This module owns the file shape and discovery; per-setting resolution
//! lives in the service crate.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// TOML configuration file shape (`adcheck.toml`)
///
/// Every field is optional; the service substitutes defaults for anything
/// missing so a partial file (or no file at all) is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Bind host for the HTTP API (default 127.0.0.1)
    pub bind_host: Option<String>,
    /// Bind port for the HTTP API (default 5850)
    pub port: Option<u16>,
    /// Log filter (tracing EnvFilter syntax, default "info")
    pub log_level: Option<String>,

    /// API key for the vision-language collaborator
    pub vision_api_key: Option<String>,
    /// Chat-completions endpoint for the vision-language collaborator
    pub vision_endpoint: Option<String>,
    /// API keys for the speech-to-text collaborator (rotated)
    #[serde(default)]
    pub speech_api_keys: Vec<String>,
    /// Transcription endpoint for the speech-to-text collaborator
    pub speech_endpoint: Option<String>,
    /// API key for the text-policy LLM collaborator
    pub llm_api_key: Option<String>,
    /// Chat-completions endpoint for the text-policy LLM collaborator
    pub llm_endpoint: Option<String>,

    /// Maximum frames analyzed per video (default 20)
    pub max_frames_per_video: Option<usize>,
    /// Frame sampling strategy: "uniform" or "adaptive" (default adaptive)
    pub sampling_strategy: Option<String>,
    /// Whether to extract and analyze video audio tracks (default true)
    pub include_audio_analysis: Option<bool>,
    /// Path to the ffmpeg binary (default "ffmpeg")
    pub ffmpeg_path: Option<String>,
    /// Path to the ffprobe binary (default "ffprobe")
    pub ffprobe_path: Option<String>,
    /// Path to the policy document (default "policy.txt")
    pub policy_file: Option<String>,
}

/// Resolve the configuration file path.
///
/// Priority:
/// 1. `ADCHECK_CONFIG` environment variable
/// 2. `~/.config/adcheck/adcheck.toml` (platform config dir)
/// 3. `./adcheck.toml`
pub fn config_file_path() -> PathBuf {
    if let Ok(path) = std::env::var("ADCHECK_CONFIG") {
        return PathBuf::from(path);
    }

    if let Some(dir) = dirs::config_dir() {
        let path = dir.join("adcheck").join("adcheck.toml");
        if path.exists() {
            return path;
        }
    }

    PathBuf::from("adcheck.toml")
}

/// Load the TOML configuration file.
///
/// A missing file is not an error; it yields the all-defaults config so the
/// service can run from environment variables alone.
pub fn load_toml_config(path: &std::path::Path) -> Result<TomlConfig> {
    if !path.exists() {
        tracing::debug!("No config file at {}, using defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read config failed: {}", e)))?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Parse config failed: {}", e)))
}

/// Validate an API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_toml_config(std::path::Path::new("/nonexistent/adcheck.toml")).unwrap();
        assert!(config.port.is_none());
        assert!(config.speech_api_keys.is_empty());
    }

    #[test]
    fn partial_file_parses() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = 6000").unwrap();
        writeln!(file, "speech_api_keys = [\"k1\", \"k2\"]").unwrap();

        let config = load_toml_config(file.path()).unwrap();
        assert_eq!(config.port, Some(6000));
        assert_eq!(config.speech_api_keys.len(), 2);
        assert!(config.vision_api_key.is_none());
    }

    #[test]
    fn key_validation_rejects_blank() {
        assert!(is_valid_key("abc123"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("   "));
    }
}
