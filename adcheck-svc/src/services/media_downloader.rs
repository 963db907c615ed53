//! Remote media retrieval
//!
//! Compliance requests reference media by URL; every analysis path works
//! on local files, so content is streamed to a per-download temp
//! directory first. Batch downloads isolate failures: one dead link
//! yields an error string, not a failed batch.

use anyhow::Context;
use futures::StreamExt;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Per-download time budget
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);
/// Refuse to spool more than this to disk
const MAX_DOWNLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// A downloaded file; the backing temp directory is removed on drop
#[derive(Debug)]
pub struct DownloadedMedia {
    pub url: String,
    path: PathBuf,
    _dir: TempDir,
}

impl DownloadedMedia {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub struct MediaDownloader {
    client: Client,
}

impl MediaDownloader {
    pub fn new() -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .context("failed to build download client")?;
        Ok(Self { client })
    }

    /// Stream one URL to a temp file.
    pub async fn download(&self, url: &str) -> anyhow::Result<DownloadedMedia> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            anyhow::bail!("unsupported URL scheme: {}", url);
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("request failed for {}", url))?
            .error_for_status()
            .with_context(|| format!("download rejected for {}", url))?;

        if let Some(length) = response.content_length() {
            if length > MAX_DOWNLOAD_BYTES {
                anyhow::bail!("media too large: {} bytes from {}", length, url);
            }
        }

        let dir = TempDir::new()?;
        let path = dir.path().join(filename_for(url));
        let mut file = tokio::fs::File::create(&path).await?;

        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.with_context(|| format!("stream interrupted for {}", url))?;
            written += chunk.len() as u64;
            if written > MAX_DOWNLOAD_BYTES {
                anyhow::bail!("media too large (streamed) from {}", url);
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        if written == 0 {
            anyhow::bail!("empty response body from {}", url);
        }

        debug!(url, bytes = written, "downloaded media");
        Ok(DownloadedMedia {
            url: url.to_string(),
            path,
            _dir: dir,
        })
    }

    /// Download a batch, collecting failures as error strings.
    pub async fn download_all(&self, urls: &[String]) -> (Vec<DownloadedMedia>, Vec<String>) {
        let mut downloaded = Vec::new();
        let mut errors = Vec::new();
        for url in urls {
            match self.download(url).await {
                Ok(media) => downloaded.push(media),
                Err(e) => {
                    warn!(url, error = %e, "media download failed");
                    errors.push(format!("{}: {}", url, e));
                }
            }
        }
        (downloaded, errors)
    }
}

/// Derive a local filename from the URL path, preserving the extension
fn filename_for(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let candidate = without_query.rsplit('/').next().unwrap_or("");
    if candidate.is_empty() || !candidate.contains('.') {
        "media.bin".to_string()
    } else {
        candidate.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_preserve_extension() {
        assert_eq!(filename_for("https://cdn.example.com/ads/spot.mp4"), "spot.mp4");
        assert_eq!(
            filename_for("https://cdn.example.com/a/b/image.jpg?sig=abc#frag"),
            "image.jpg"
        );
        assert_eq!(filename_for("https://example.com/"), "media.bin");
        assert_eq!(filename_for("https://example.com/no-extension"), "media.bin");
    }

    #[tokio::test]
    async fn rejects_non_http_schemes() {
        let downloader = MediaDownloader::new().unwrap();
        let err = downloader
            .download("file:///etc/passwd")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unsupported URL scheme"));
    }

    #[tokio::test]
    async fn batch_collects_failures_without_aborting() {
        let downloader = MediaDownloader::new().unwrap();
        let urls = vec![
            "ftp://bad.example.com/a.mp4".to_string(),
            "not-a-url".to_string(),
        ];
        let (downloaded, errors) = downloader.download_all(&urls).await;
        assert!(downloaded.is_empty());
        assert_eq!(errors.len(), 2);
    }
}
