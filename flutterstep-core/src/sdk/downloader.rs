//! Async archive retrieval with progress reporting and URL validation.
//!
//! Retrieval sits behind the [`ArchiveSource`] trait so the installer can be
//! driven by a fake source in tests. [`HttpSource`] is the production
//! implementation: a streaming reqwest GET written chunk by chunk into any
//! async writer (a temp file, or an in-memory buffer).

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};
use url::Url;

// ============================================================================
// URL Validation
// ============================================================================

/// Validates that a URL is usable for downloading an SDK archive.
///
/// Checks:
/// - URL scheme must be HTTPS
/// - URL must have a host
pub fn validate_url(url_str: &str) -> Result<()> {
    let url = Url::parse(url_str).with_context(|| format!("Invalid URL: {}", url_str))?;

    if url.scheme() != "https" {
        anyhow::bail!("URL must use HTTPS: {}", url_str);
    }

    if url.host_str().map_or(true, str::is_empty) {
        anyhow::bail!("URL must have a host: {}", url_str);
    }

    Ok(())
}

// ============================================================================
// Download Progress
// ============================================================================

/// Progress information during a download.
#[derive(Debug, Clone)]
pub struct DownloadProgress {
    /// Bytes downloaded so far.
    pub bytes_downloaded: u64,
    /// Total bytes expected (if known from Content-Length header).
    pub total_bytes: Option<u64>,
    /// Progress percentage (0.0 to 100.0), or None if total is unknown.
    pub percent: Option<f32>,
}

impl DownloadProgress {
    fn new(bytes_downloaded: u64, total_bytes: Option<u64>) -> Self {
        let percent = total_bytes.map(|total| {
            if total > 0 {
                (bytes_downloaded as f32 / total as f32) * 100.0
            } else {
                0.0
            }
        });

        Self {
            bytes_downloaded,
            total_bytes,
            percent,
        }
    }
}

/// Progress callback used by [`ArchiveSource::fetch`].
pub type ProgressFn<'a> = &'a (dyn Fn(DownloadProgress) + Send + Sync);

// ============================================================================
// Archive Source
// ============================================================================

/// Something that can deliver the bytes behind a download URL.
#[async_trait]
pub trait ArchiveSource: Send + Sync {
    /// Writes the content at `url` into `sink`, returning the byte count.
    async fn fetch(
        &self,
        url: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
        progress_cb: ProgressFn<'_>,
    ) -> Result<u64>;
}

/// Downloads archives over HTTPS with reqwest.
#[derive(Debug, Clone, Default)]
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArchiveSource for HttpSource {
    /// Streams a download into `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The URL is not a valid HTTPS URL.
    /// - The network request fails.
    /// - The server returns a non-success status code.
    /// - The sink cannot be written.
    async fn fetch(
        &self,
        url: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
        progress_cb: ProgressFn<'_>,
    ) -> Result<u64> {
        info!("Downloading {}", url);

        validate_url(url)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to download from {}", url))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!(
                "Download failed with status {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown error")
            );
        }

        let total_bytes = response.content_length();
        debug!("Content-Length: {:?}", total_bytes);

        let mut stream = response.bytes_stream();
        let mut bytes_downloaded: u64 = 0;

        progress_cb(DownloadProgress::new(0, total_bytes));

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.with_context(|| "Failed to read chunk from response stream")?;

            sink.write_all(&chunk)
                .await
                .with_context(|| "Failed to write downloaded chunk")?;

            bytes_downloaded += chunk.len() as u64;
            progress_cb(DownloadProgress::new(bytes_downloaded, total_bytes));
        }

        sink.flush().await.context("Failed to flush download")?;

        info!("Download complete: {} bytes", bytes_downloaded);

        Ok(bytes_downloaded)
    }
}
