//! flutterstep Core Library
//!
//! This crate provides everything behind the `flutterstep` CI step:
//!
//! - Step configuration read from environment variables
//! - Host platform resolution (Linux, macOS)
//! - Flutter SDK presence check, download and extraction
//! - Sequential execution of flutter commands in a working directory
//! - Exit-code mapping for every failure category

pub mod config;
pub mod error;
pub mod preflight;
pub mod runner;
pub mod sdk;
pub mod step;

#[cfg(test)]
mod test_support;

// Re-exports for convenience
pub use config::{Config, ConfigError, InvocationMode};
pub use error::StepError;
pub use preflight::{check_android_sdk, PreflightError};
pub use runner::{CommandError, CommandRunner};
pub use sdk::{
    ArchiveSource, HostEnv, HttpSource, InstallError, PlatformError, PlatformStrategy,
    SdkInstaller,
};
pub use step::{run, run_from_env, StepOutcome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
