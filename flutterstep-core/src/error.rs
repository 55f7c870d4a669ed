//! Top-level step errors and their process exit codes.

use std::io;
use thiserror::Error;

use crate::config::ConfigError;
use crate::preflight::PreflightError;
use crate::runner::CommandError;
use crate::sdk::{InstallError, PlatformError};

/// Any failure that ends the step.
///
/// Each variant maps to its own exit code so CI automation can tell the
/// failure categories apart:
///
/// | code | category                       |
/// |------|--------------------------------|
/// | 1    | SDK presence check failed      |
/// | 2    | SDK download/extraction failed |
/// | 3    | a flutter command failed       |
/// | 4    | invalid configuration          |
/// | 5    | unsupported host platform      |
/// | 6    | Android SDK preflight failed   |
#[derive(Debug, Error)]
pub enum StepError {
    #[error("Could not setup Android SDK: {0}")]
    Preflight(#[from] PreflightError),

    #[error("Could not validate config: {0}")]
    Config(#[from] ConfigError),

    #[error("Could not resolve Flutter SDK destination dir: {0}")]
    Platform(#[from] PlatformError),

    #[error("Could not check if Flutter SDK is installed: {0}")]
    PresenceCheck(#[source] io::Error),

    #[error("Could not install Flutter SDK: {0}")]
    Install(#[from] InstallError),

    #[error("Flutter invocation failed: {0}")]
    Command(#[from] CommandError),
}

impl StepError {
    /// Process exit code for this failure category.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::PresenceCheck(_) => 1,
            Self::Install(_) => 2,
            Self::Command(_) => 3,
            Self::Config(_) => 4,
            Self::Platform(_) => 5,
            Self::Preflight(_) => 6,
        }
    }
}
