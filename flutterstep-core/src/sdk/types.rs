//! Core types for Flutter SDK management.
//!
//! This module defines the foundational types used across the SDK
//! infrastructure: the host environment capability object, supported
//! platforms, archive formats and retrieval strategies.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

// ============================================================================
// Host Environment
// ============================================================================

/// Capabilities of the host the step runs on.
///
/// Everything the platform resolver and installer need from the process-wide
/// environment is read once into this struct, so tests can hand in fixtures
/// instead of depending on the real host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostEnv {
    /// Operating system identifier, as in `std::env::consts::OS`.
    pub os: String,
    /// Home directory of the current user, if known.
    pub home_dir: Option<PathBuf>,
    /// Directory for scratch files.
    pub temp_dir: PathBuf,
}

impl HostEnv {
    /// Reads the capabilities of the real host.
    pub fn current() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            home_dir: dirs::home_dir(),
            temp_dir: std::env::temp_dir(),
        }
    }
}

// ============================================================================
// Platform Detection
// ============================================================================

/// Host platforms the Flutter SDK is published for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Macos,
}

impl Platform {
    /// Maps an OS identifier to a supported platform.
    ///
    /// Returns `None` if the platform is unsupported.
    pub fn from_os(os: &str) -> Option<Self> {
        match os {
            "linux" => Some(Self::Linux),
            "macos" => Some(Self::Macos),
            _ => None,
        }
    }

    /// Returns the platform segment used in release URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Macos => "macos",
        }
    }

    /// Returns a human-readable description of the platform.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Linux => "Linux",
            Self::Macos => "macOS",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Archive Format
// ============================================================================

/// Archive format of a published SDK package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArchiveFormat {
    /// XZ-compressed tar archive (.tar.xz)
    TarXz,
    /// ZIP archive (.zip)
    Zip,
}

impl ArchiveFormat {
    /// Returns the file extension, without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::TarXz => "tar.xz",
            Self::Zip => "zip",
        }
    }
}

// ============================================================================
// Retrieval Strategy
// ============================================================================

/// How the archive travels from the network to the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RetrievalStrategy {
    /// Download into a scoped temp file, then extract from it.
    TempFile,
    /// Stream the body into memory and extract from the buffer.
    InMemory,
}
