//! Flutter SDK installer.
//!
//! The `SdkInstaller` turns a version string into a download URL, retrieves
//! the archive the way the platform strategy prescribes, and extracts it into
//! a staging directory next to the destination. The archive's top-level
//! `flutter/` folder is then renamed onto the destination directory.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};

use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use super::downloader::{ArchiveSource, DownloadProgress};
use super::extractor::{extract_archive, extract_archive_bytes, make_executable};
use super::paths::sdk_executable_path;
use super::platform::PlatformStrategy;
use super::types::{HostEnv, RetrievalStrategy};

/// Default host serving SDK releases.
pub const DEFAULT_STORAGE_BASE_URL: &str = "https://storage.googleapis.com";

/// Channels the SDK is published on.
const KNOWN_CHANNELS: &[&str] = &["stable", "beta", "dev", "master"];

/// Prefix for the scoped download file.
const TEMP_FILE_PREFIX: &str = "flutter";

/// Prefix for the staging directory created next to the destination.
const STAGING_DIR_PREFIX: &str = ".flutter-staging";

/// Top-level folder every SDK archive unpacks to.
const ARCHIVE_ROOT_DIR: &str = "flutter";

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("Version {0:?} does not end with a release channel (e.g. 3.7.8-stable)")]
    MissingChannel(String),

    #[error("{} has no parent directory to extract into", .0.display())]
    NoParentDir(PathBuf),

    #[error("Temporary file error in {}: {source}", path.display())]
    TempFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not create staging directory in {}: {source}", path.display())]
    Staging {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to download {url}: {cause:#}")]
    Download { url: String, cause: anyhow::Error },

    #[error("Failed to extract SDK archive: {0:#}")]
    Extract(anyhow::Error),

    #[error("SDK archive has no top-level {0}/ folder")]
    ArchiveLayout(&'static str),

    #[error("SDK executable not found at {} after extraction", .0.display())]
    ExecutableMissing(PathBuf),

    #[error("Could not move SDK into {}: {source}", path.display())]
    Promote {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

// ============================================================================
// Version and URL helpers
// ============================================================================

/// Returns the release channel encoded in a version string.
///
/// The channel is the last dash-separated token: `3.7.8-stable` -> `stable`.
pub fn channel_from_version(version: &str) -> Result<&str, InstallError> {
    version
        .rsplit_once('-')
        .map(|(_, channel)| channel)
        .filter(|channel| !channel.is_empty())
        .ok_or_else(|| InstallError::MissingChannel(version.to_string()))
}

/// Returns true if the channel is one the SDK is known to be published on.
pub fn is_known_channel(channel: &str) -> bool {
    KNOWN_CHANNELS.contains(&channel)
}

/// Builds the canonical download URL for an SDK release.
///
/// `{base}/flutter_infra/releases/{channel}/{platform}/flutter_{platform}_v{version}.{ext}`
pub fn download_url(
    base_url: &str,
    strategy: &PlatformStrategy,
    version: &str,
    channel: &str,
) -> String {
    let platform = strategy.platform_id();
    format!(
        "{}/flutter_infra/releases/{}/{}/flutter_{}_v{}.{}",
        base_url.trim_end_matches('/'),
        channel,
        platform,
        platform,
        version,
        strategy.archive_format.extension()
    )
}

// ============================================================================
// SDK Installer
// ============================================================================

/// Downloads and extracts one SDK release.
pub struct SdkInstaller<'a> {
    strategy: &'a PlatformStrategy,
    host: &'a HostEnv,
    source: &'a dyn ArchiveSource,
    base_url: String,
}

impl<'a> SdkInstaller<'a> {
    /// Creates an installer that downloads from the default storage host.
    pub fn new(
        strategy: &'a PlatformStrategy,
        host: &'a HostEnv,
        source: &'a dyn ArchiveSource,
    ) -> Self {
        Self {
            strategy,
            host,
            source,
            base_url: DEFAULT_STORAGE_BASE_URL.to_string(),
        }
    }

    /// Overrides the storage host (e.g. a regional mirror).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Installs `version` so that it ends up at `destination`.
    ///
    /// The archive is extracted into a staging directory next to
    /// `destination`, and its top-level `flutter/` folder is then renamed onto
    /// `destination`. Nothing outside the staging directory is written until
    /// that final rename, and the staging directory is removed on every exit
    /// path.
    pub async fn install(&self, version: &str, destination: &Path) -> Result<(), InstallError> {
        let channel = channel_from_version(version)?;
        if !is_known_channel(channel) {
            warn!("Unrecognized Flutter channel '{}' in version {}", channel, version);
        }

        let parent = extraction_root(destination)?;
        let url = download_url(&self.base_url, self.strategy, version, channel);

        info!(
            "Installing Flutter SDK {} ({} channel) to {}",
            version,
            channel,
            destination.display()
        );

        let staging = create_staging_dir(parent)?;
        debug!("Staging SDK in {}", staging.path().display());

        let result = self
            .fetch_and_extract(&url, staging.path())
            .await
            .and_then(|()| self.promote(staging.path(), destination));

        let staging_path = staging.path().to_path_buf();
        if let Err(e) = staging.close() {
            warn!(
                "Failed to remove staging directory {}: {}",
                staging_path.display(),
                e
            );
        }

        if result.is_ok() {
            info!("Flutter SDK {} installed successfully", version);
        }

        result
    }

    // ========================================================================
    // Helper Methods
    // ========================================================================

    async fn fetch_and_extract(&self, url: &str, target: &Path) -> Result<(), InstallError> {
        let format = self.strategy.archive_format;

        match self.strategy.retrieval {
            RetrievalStrategy::InMemory => {
                let mut buffer: Vec<u8> = Vec::new();
                self.fetch(url, &mut buffer).await?;
                extract_archive_bytes(&buffer, target, format).map_err(InstallError::Extract)
            }
            RetrievalStrategy::TempFile => {
                let temp_dir = &self.host.temp_dir;
                let temp_file = tempfile::Builder::new()
                    .prefix(TEMP_FILE_PREFIX)
                    .suffix(&format!(".{}", format.extension()))
                    .tempfile_in(temp_dir)
                    .map_err(|source| InstallError::TempFile {
                        path: temp_dir.clone(),
                        source,
                    })?;
                debug!("Downloading to {}", temp_file.path().display());

                let outcome = self.download_to_temp(url, &temp_file).await.and_then(|()| {
                    extract_archive(temp_file.path(), target, format).map_err(InstallError::Extract)
                });

                let temp_path = temp_file.path().to_path_buf();
                if let Err(e) = temp_file.close() {
                    warn!(
                        "Failed to remove temporary file {}: {}",
                        temp_path.display(),
                        e
                    );
                }

                outcome
            }
        }
    }

    async fn download_to_temp(
        &self,
        url: &str,
        temp_file: &tempfile::NamedTempFile,
    ) -> Result<(), InstallError> {
        let temp_error = |source: io::Error| InstallError::TempFile {
            path: temp_file.path().to_path_buf(),
            source,
        };

        let mut file = tokio::fs::File::from_std(temp_file.reopen().map_err(temp_error)?);
        self.fetch(url, &mut file).await?;
        file.flush().await.map_err(temp_error)?;
        Ok(())
    }

    async fn fetch(
        &self,
        url: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, InstallError> {
        let last_decile = AtomicU8::new(0);
        // The callback must be Sync, so the decile marker is atomic.
        let report = |progress: DownloadProgress| {
            if let (Some(percent), Some(total)) = (progress.percent, progress.total_bytes) {
                let decile = (percent as u8) / 10;
                if last_decile.fetch_max(decile, Ordering::Relaxed) < decile {
                    debug!(
                        "Flutter SDK download progress: {:.0}% ({} of {} bytes)",
                        percent, progress.bytes_downloaded, total
                    );
                }
            }
        };

        let downloaded = self
            .source
            .fetch(url, sink, &report)
            .await
            .map_err(|cause| InstallError::Download {
                url: url.to_string(),
                cause,
            })?;

        debug!("Downloaded {} bytes from {}", downloaded, url);
        Ok(downloaded)
    }

    /// Checks the staged SDK and moves it into place.
    fn promote(&self, staging: &Path, destination: &Path) -> Result<(), InstallError> {
        let staged_sdk = staging.join(ARCHIVE_ROOT_DIR);
        if !staged_sdk.is_dir() {
            return Err(InstallError::ArchiveLayout(ARCHIVE_ROOT_DIR));
        }

        let exec_path = sdk_executable_path(&staged_sdk);
        if !exec_path.is_file() {
            return Err(InstallError::ExecutableMissing(sdk_executable_path(destination)));
        }
        make_executable(&exec_path).map_err(InstallError::Extract)?;

        std::fs::rename(&staged_sdk, destination).map_err(|source| InstallError::Promote {
            path: destination.to_path_buf(),
            source,
        })?;

        debug!("Moved {} to {}", staged_sdk.display(), destination.display());
        Ok(())
    }
}

/// Returns the directory the archive is extracted into.
fn extraction_root(destination: &Path) -> Result<&Path, InstallError> {
    match destination.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Ok(Path::new(".")),
        Some(parent) => Ok(parent),
        None => Err(InstallError::NoParentDir(destination.to_path_buf())),
    }
}

/// Creates the scoped staging directory, creating `parent` first if needed.
fn create_staging_dir(parent: &Path) -> Result<tempfile::TempDir, InstallError> {
    let staging_error = |source: io::Error| InstallError::Staging {
        path: parent.to_path_buf(),
        source,
    };

    std::fs::create_dir_all(parent).map_err(staging_error)?;
    tempfile::Builder::new()
        .prefix(STAGING_DIR_PREFIX)
        .tempdir_in(parent)
        .map_err(staging_error)
}
