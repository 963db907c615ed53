//! Video container access
//!
//! `VideoSource` abstracts frame and metadata access so the pipeline can
//! run against scripted fixtures in tests. The production implementation
//! shells out to ffprobe/ffmpeg; no in-process codec bindings.

use crate::types::FrameImage;
use crate::models::VideoMetadata;
use adcheck_common::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Read access to a video container
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Path used in reports and log lines
    fn path(&self) -> &Path;

    /// Container metadata. Implementations degrade to a placeholder record
    /// rather than failing when the probe is unparseable; an unreadable
    /// container is caught at open time.
    async fn metadata(&self) -> Result<VideoMetadata>;

    /// Decode one frame as JPEG bytes. Per-frame failures are soft: the
    /// caller skips the frame and continues.
    async fn read_frame(&self, frame_number: u64) -> anyhow::Result<FrameImage>;
}

/// ffprobe/ffmpeg-backed video source
pub struct FfmpegVideoSource {
    path: PathBuf,
    ffmpeg: String,
    ffprobe: String,
    probed: OnceCell<VideoMetadata>,
}

impl FfmpegVideoSource {
    /// Open a video file. Missing or non-file paths fail here so the
    /// pipeline can report an unopenable container before any analysis.
    pub fn open(path: impl Into<PathBuf>, ffmpeg: &str, ffprobe: &str) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(Error::NotFound(format!(
                "video file not found: {}",
                path.display()
            )));
        }
        Ok(Self {
            path,
            ffmpeg: ffmpeg.to_string(),
            ffprobe: ffprobe.to_string(),
            probed: OnceCell::new(),
        })
    }

    async fn probe(&self) -> VideoMetadata {
        match self.run_probe().await {
            Ok(metadata) => {
                debug!(
                    path = %self.path.display(),
                    total_frames = metadata.total_frames,
                    fps = metadata.fps,
                    "probed video container"
                );
                metadata
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "video probe failed, using placeholder metadata"
                );
                VideoMetadata::placeholder()
            }
        }
    }

    async fn run_probe(&self) -> anyhow::Result<VideoMetadata> {
        let output = Command::new(&self.ffprobe)
            .args(["-v", "quiet"])
            .args(["-print_format", "json"])
            .args(["-show_format", "-show_streams"])
            .arg(&self.path)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            anyhow::bail!("ffprobe exited with {}", output.status);
        }

        let probe: ProbeOutput = serde_json::from_slice(&output.stdout)?;
        let stream = probe
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .ok_or_else(|| anyhow::anyhow!("no video stream in container"))?;

        let fps = stream
            .r_frame_rate
            .as_deref()
            .and_then(parse_frame_rate)
            .unwrap_or(30.0);

        let duration = stream
            .duration
            .as_deref()
            .or(probe.format.as_ref().and_then(|f| f.duration.as_deref()))
            .and_then(|d| d.parse::<f64>().ok())
            .unwrap_or(0.0);

        // nb_frames is absent from many containers; estimate from duration
        let total_frames = stream
            .nb_frames
            .as_deref()
            .and_then(|n| n.parse::<u64>().ok())
            .unwrap_or_else(|| (duration * fps).round() as u64);

        Ok(VideoMetadata::new(
            total_frames,
            fps,
            stream.width.unwrap_or(0),
            stream.height.unwrap_or(0),
        ))
    }
}

#[async_trait]
impl VideoSource for FfmpegVideoSource {
    fn path(&self) -> &Path {
        &self.path
    }

    async fn metadata(&self) -> Result<VideoMetadata> {
        let metadata = self.probed.get_or_init(|| self.probe()).await;
        Ok(metadata.clone())
    }

    async fn read_frame(&self, frame_number: u64) -> anyhow::Result<FrameImage> {
        let select = format!("select=eq(n\\,{})", frame_number);
        let output = Command::new(&self.ffmpeg)
            .args(["-hide_banner", "-loglevel", "error", "-nostdin"])
            .arg("-i")
            .arg(&self.path)
            .args(["-vf", &select])
            .args(["-vframes", "1"])
            .args(["-f", "image2pipe"])
            .args(["-c:v", "mjpeg"])
            .arg("pipe:1")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "ffmpeg frame extraction failed for frame {}: {}",
                frame_number,
                stderr.trim()
            );
        }
        if output.stdout.is_empty() {
            anyhow::bail!("ffmpeg produced no data for frame {}", frame_number);
        }

        let metadata = self.probed.get_or_init(|| self.probe()).await;
        Ok(FrameImage {
            data: output.stdout,
            width: metadata.width,
            height: metadata.height,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    nb_frames: Option<String>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Parse ffprobe's rational frame rate, e.g. "30000/1001"
fn parse_frame_rate(raw: &str) -> Option<f64> {
    if let Some((num, den)) = raw.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 && num > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    raw.parse::<f64>().ok().filter(|&f| f > 0.0)
}
