//! Collaborator traits and base types
//!
//! The external inference backends (vision-language model, speech-to-text,
//! text policy matcher) are modeled as capability traits. Production
//! implementations live in `services/`; tests swap in scripted mocks
//! without touching sampling or fusion logic.

use crate::models::{AudioResult, ImageComplianceResult, TextComplianceResult};
use async_trait::async_trait;
use std::path::Path;

/// One decoded video frame or downloaded still image, as encoded bytes
#[derive(Debug, Clone)]
pub struct FrameImage {
    /// JPEG-encoded pixel data
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Image compliance collaborator (vision-language inference)
///
/// One blocking call per frame; errors are unrecoverable at this layer and
/// the caller substitutes a conservative default.
#[async_trait]
pub trait ImageCompliance: Send + Sync {
    async fn evaluate(&self, frame: &FrameImage) -> anyhow::Result<ImageComplianceResult>;
}

/// Audio compliance collaborator (speech-to-text + transcript policy check)
#[async_trait]
pub trait AudioCompliance: Send + Sync {
    async fn evaluate(&self, audio_path: &Path) -> anyhow::Result<AudioResult>;
}

/// Text policy collaborator (retrieval-augmented policy matching)
#[async_trait]
pub trait TextCompliance: Send + Sync {
    async fn evaluate(&self, text: &str) -> anyhow::Result<TextComplianceResult>;
}
