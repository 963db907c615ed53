//! Video compliance pipeline
//!
//! Stages: container probing (`source`), frame sampling (`sampler`),
//! audio extraction (`audio`), per-frame visual analysis (`frames`),
//! score fusion (`fusion`), and orchestration (`pipeline`).

pub mod audio;
pub mod frames;
pub mod fusion;
pub mod pipeline;
pub mod sampler;
pub mod source;

pub use audio::{AudioExtractionError, AudioExtractor, ExtractedAudio};
pub use pipeline::{VideoCheckerOptions, VideoComplianceChecker, DEFAULT_MAX_FRAMES};
pub use sampler::{select_frames, SamplingStrategy};
pub use source::{FfmpegVideoSource, VideoSource};
