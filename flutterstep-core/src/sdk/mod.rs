//! Flutter SDK management.
//!
//! This module provides everything needed to get a given SDK release onto
//! disk: resolving what the host needs, checking whether the SDK is already
//! present, and downloading and extracting it if not.
//!
//! # Architecture
//!
//! - `types`: Core types (HostEnv, Platform, ArchiveFormat, RetrievalStrategy)
//! - `platform`: Single dispatch from host OS to a `PlatformStrategy`
//! - `paths`: SDK layout and the presence check
//! - `downloader`: `ArchiveSource` trait and the streaming HTTPS source
//! - `extractor`: Archive extraction (zip, tar.xz)
//! - `installer`: Channel parsing, URL construction, install with cleanup
//! - `env`: `PATH` setup for processes that use the SDK
//!
//! # Example
//!
//! ```ignore
//! use flutterstep_core::sdk::{HostEnv, HttpSource, PlatformStrategy, SdkInstaller};
//!
//! let host = HostEnv::current();
//! let strategy = PlatformStrategy::resolve(&host)?;
//! let source = HttpSource::new();
//!
//! SdkInstaller::new(&strategy, &host, &source)
//!     .install("3.7.8-stable", &strategy.default_install_dir)
//!     .await?;
//! ```

pub mod downloader;
pub mod env;
pub mod extractor;
pub mod installer;
pub mod paths;
pub mod platform;
pub mod types;

// Re-export commonly used types
pub use downloader::{validate_url, ArchiveSource, DownloadProgress, HttpSource};
pub use env::{apply_to_command, prepend_sdk_to_path};
pub use installer::{
    channel_from_version, download_url, is_known_channel, InstallError, SdkInstaller,
    DEFAULT_STORAGE_BASE_URL,
};
pub use paths::{sdk_bin_dir, sdk_dir_exists, sdk_executable_path};
pub use platform::{PlatformError, PlatformStrategy};
pub use types::{ArchiveFormat, HostEnv, Platform, RetrievalStrategy};
