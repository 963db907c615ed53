//! Collaborator clients and orchestration
//!
//! `vision_client`, `speech_client`, and `policy_client` implement the
//! compliance traits against external inference backends;
//! `compliance_service` fans requests out across them.

pub mod compliance_service;
pub mod key_pool;
pub mod media_downloader;
pub mod parsing;
pub mod policy_client;
pub mod speech_client;
pub mod vision_client;

pub use compliance_service::{ComplianceService, ImageAnalysisOutcome};
pub use key_pool::ApiKeyPool;
pub use media_downloader::{DownloadedMedia, MediaDownloader};
pub use policy_client::PolicyClient;
pub use speech_client::SpeechClient;
pub use vision_client::VisionClient;
