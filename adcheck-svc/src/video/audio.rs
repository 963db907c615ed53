//! Audio track extraction
//!
//! Strips the audio track to a 16 kHz mono PCM WAV suitable for
//! speech-to-text. Extraction failures are soft from the pipeline's
//! perspective; the caller substitutes the unavailable audio result.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

/// Hard ceiling on extraction time for one video
const EXTRACTION_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Error)]
pub enum AudioExtractionError {
    #[error("ffmpeg not found at '{0}'")]
    ToolNotFound(String),

    #[error("audio extraction failed: {0}")]
    Failed(String),

    #[error("audio extraction timed out after {0}s")]
    TimedOut(u64),

    #[error("extraction produced an empty file (video may have no audio track)")]
    EmptyOutput,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// An extracted WAV file. The backing temp directory is removed when this
/// value drops, so keep it alive for the duration of transcription.
#[derive(Debug)]
pub struct ExtractedAudio {
    wav_path: PathBuf,
    _dir: TempDir,
}

impl ExtractedAudio {
    pub fn path(&self) -> &Path {
        &self.wav_path
    }
}

/// ffmpeg-backed audio extractor
pub struct AudioExtractor {
    ffmpeg: String,
}

impl AudioExtractor {
    pub fn new(ffmpeg: &str) -> Self {
        Self {
            ffmpeg: ffmpeg.to_string(),
        }
    }

    /// Extract the audio track to 16 kHz mono PCM WAV.
    ///
    /// The sample format matches what the transcription backend expects;
    /// resampling here keeps the upload small and deterministic.
    pub async fn extract(&self, video_path: &Path) -> Result<ExtractedAudio, AudioExtractionError> {
        let dir = TempDir::new()?;
        let wav_path = dir.path().join("audio.wav");

        let mut child = Command::new(&self.ffmpeg)
            .arg("-i")
            .arg(video_path)
            .arg("-vn")
            .args(["-acodec", "pcm_s16le"])
            .args(["-ar", "16000"])
            .args(["-ac", "1"])
            .arg("-y")
            .arg(&wav_path)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    AudioExtractionError::ToolNotFound(self.ffmpeg.clone())
                } else {
                    AudioExtractionError::Io(e)
                }
            })?;

        let timeout = Duration::from_secs(EXTRACTION_TIMEOUT_SECS);
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                // kill_on_drop reaps the ffmpeg process
                warn!(
                    video = %video_path.display(),
                    timeout_secs = EXTRACTION_TIMEOUT_SECS,
                    "audio extraction timed out"
                );
                return Err(AudioExtractionError::TimedOut(EXTRACTION_TIMEOUT_SECS));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AudioExtractionError::Failed(
                stderr.lines().last().unwrap_or("unknown error").to_string(),
            ));
        }

        let size = tokio::fs::metadata(&wav_path)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        if size == 0 {
            return Err(AudioExtractionError::EmptyOutput);
        }

        debug!(
            video = %video_path.display(),
            wav = %wav_path.display(),
            bytes = size,
            "extracted audio track"
        );

        Ok(ExtractedAudio {
            wav_path,
            _dir: dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_tool_is_distinguished() {
        let extractor = AudioExtractor::new("/nonexistent/ffmpeg-binary");
        let err = extractor
            .extract(Path::new("/tmp/whatever.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, AudioExtractionError::ToolNotFound(_)));
    }

    #[test]
    fn extracted_audio_cleans_up_on_drop() {
        let dir = TempDir::new().unwrap();
        let wav_path = dir.path().join("audio.wav");
        std::fs::write(&wav_path, b"RIFF").unwrap();
        let dir_path = dir.path().to_path_buf();

        let extracted = ExtractedAudio {
            wav_path,
            _dir: dir,
        };
        assert!(extracted.path().exists());
        drop(extracted);
        assert!(!dir_path.exists());
    }
}
