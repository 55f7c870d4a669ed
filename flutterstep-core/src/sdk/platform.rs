//! Platform resolution.
//!
//! The host OS is inspected in exactly one place, [`PlatformStrategy::resolve`].
//! Everything downstream (URL construction, install location, how the archive
//! is retrieved and extracted) reads the resulting strategy as plain data.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

use super::types::{ArchiveFormat, HostEnv, Platform, RetrievalStrategy};

/// Fixed install location on Linux hosts.
const LINUX_INSTALL_DIR: &str = "/opt/flutter";

/// Install location on macOS, relative to the user's home directory.
const MACOS_INSTALL_SUBDIR: &str = "Library/flutter";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlatformError {
    #[error("Unsupported OS: {0}")]
    Unsupported(String),
    #[error("Home directory is not available on this host")]
    HomeDirUnavailable,
}

/// Everything that differs between supported hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformStrategy {
    /// The resolved host platform.
    pub platform: Platform,
    /// Packaging published for this platform.
    pub archive_format: ArchiveFormat,
    /// Where the SDK lives unless the config overrides it.
    pub default_install_dir: PathBuf,
    /// How the downloaded archive reaches the extractor.
    pub retrieval: RetrievalStrategy,
}

impl PlatformStrategy {
    /// Resolves the strategy for the given host.
    ///
    /// Pure: performs no network or filesystem access.
    pub fn resolve(host: &HostEnv) -> Result<Self, PlatformError> {
        let platform =
            Platform::from_os(&host.os).ok_or_else(|| PlatformError::Unsupported(host.os.clone()))?;

        let strategy = match platform {
            Platform::Linux => Self {
                platform,
                archive_format: ArchiveFormat::TarXz,
                default_install_dir: PathBuf::from(LINUX_INSTALL_DIR),
                retrieval: RetrievalStrategy::TempFile,
            },
            Platform::Macos => {
                let home = host
                    .home_dir
                    .as_ref()
                    .ok_or(PlatformError::HomeDirUnavailable)?;
                Self {
                    platform,
                    archive_format: ArchiveFormat::Zip,
                    default_install_dir: home.join(MACOS_INSTALL_SUBDIR),
                    retrieval: RetrievalStrategy::InMemory,
                }
            }
        };

        Ok(strategy)
    }

    /// Returns the channel-platform segment used in release URLs.
    pub fn platform_id(&self) -> &'static str {
        self.platform.as_str()
    }
}
