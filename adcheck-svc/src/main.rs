//! adcheck-svc - Advertisement compliance analysis service
//!
//! Startup wires the collaborator clients (text policy, vision, speech)
//! to the compliance service and serves the HTTP API. The text policy
//! and vision backends are mandatory; speech keys are optional and their
//! absence disables audio analysis.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use adcheck_common::config::{config_file_path, load_toml_config};
use adcheck_svc::config::ServiceConfig;
use adcheck_svc::services::{
    ApiKeyPool, ComplianceService, MediaDownloader, PolicyClient, SpeechClient, VisionClient,
};
use adcheck_svc::types::{AudioCompliance, ImageCompliance, TextCompliance};
use adcheck_svc::video::{AudioExtractor, VideoCheckerOptions, VideoComplianceChecker};
use adcheck_svc::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let toml_path = config_file_path();
    let toml = load_toml_config(&toml_path)?;

    // RUST_LOG wins over the configured log level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(toml.log_level.as_deref().unwrap_or("info")));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting adcheck-svc (Advertisement Compliance)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Config file: {}", toml_path.display());

    let config = ServiceConfig::resolve(&toml)?;

    let policy_text = std::fs::read_to_string(&config.policy_file)
        .with_context(|| format!("failed to read policy file {}", config.policy_file.display()))?;
    info!(
        policy_file = %config.policy_file.display(),
        chars = policy_text.len(),
        "policy document loaded"
    );

    let llm_api_key = config.llm_api_key.clone().context(
        "LLM API key not configured. Set ADCHECK_LLM_API_KEY or llm_api_key in adcheck.toml",
    )?;
    let text: Arc<dyn TextCompliance> =
        Arc::new(PolicyClient::new(&config.llm_endpoint, &llm_api_key, policy_text)?);

    let vision_api_key = config.vision_api_key.clone().context(
        "Vision API key not configured. Set ADCHECK_VISION_API_KEY or vision_api_key in adcheck.toml",
    )?;
    let vision_pool = Arc::new(ApiKeyPool::new(vec![vision_api_key]));
    let image: Arc<dyn ImageCompliance> =
        Arc::new(VisionClient::new(&config.vision_endpoint, vision_pool)?);

    if config.speech_api_keys.is_empty() {
        warn!("No speech API keys configured - audio analysis disabled");
    }
    let speech_pool = Arc::new(ApiKeyPool::new(config.speech_api_keys.clone()));
    let audio: Arc<dyn AudioCompliance> = Arc::new(SpeechClient::new(
        &config.speech_endpoint,
        speech_pool,
        text.clone(),
    )?);

    let checker = VideoComplianceChecker::new(
        image.clone(),
        audio.clone(),
        AudioExtractor::new(&config.ffmpeg_path),
        VideoCheckerOptions {
            max_frames: config.max_frames_per_video,
            strategy: config.sampling_strategy,
            include_audio: config.include_audio_analysis,
        },
    );

    let service = ComplianceService::new(
        text,
        image,
        audio,
        checker,
        MediaDownloader::new()?,
        config.ffmpeg_path.clone(),
        config.ffprobe_path.clone(),
        config.include_audio_analysis,
    );

    let state = AppState::new(Arc::new(service), config.include_audio_analysis);
    let app = adcheck_svc::build_router(state);

    let bind_addr = format!("{}:{}", config.bind_host, config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
