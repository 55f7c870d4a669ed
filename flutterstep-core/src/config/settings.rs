//! Step configuration.
//!
//! All inputs arrive as environment variables set by the CI system before the
//! step starts. They are read once into an immutable [`Config`].

use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::sdk::{channel_from_version, validate_url, DEFAULT_STORAGE_BASE_URL};

// =============================================================================
// Input Names
// =============================================================================

/// SDK version to install, e.g. `3.7.8-stable`.
pub const VERSION_KEY: &str = "version";
/// Directory the commands run in.
pub const WORKING_DIR_KEY: &str = "working_dir";
/// Newline-separated flutter commands.
pub const COMMANDS_KEY: &str = "commands";
/// Optional install directory override.
pub const SDK_DIR_KEY: &str = "sdk_dir";
/// Optional switch to evaluate commands through a shell.
pub const USE_SHELL_KEY: &str = "use_shell";
/// Optional mirror for SDK downloads (same variable the flutter tool honours).
pub const STORAGE_BASE_URL_KEY: &str = "FLUTTER_STORAGE_BASE_URL";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Required input '{0}' is not set")]
    Missing(&'static str),

    #[error("Working directory does not exist: {}", .0.display())]
    WorkingDirNotFound(PathBuf),

    #[error("Version {0:?} has no channel suffix (expected e.g. 3.7.8-stable)")]
    MissingChannel(String),

    #[error("Input '{key}' must be a boolean, got {value:?}")]
    InvalidBool { key: &'static str, value: String },

    #[error("Invalid storage base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

// =============================================================================
// Invocation Mode
// =============================================================================

/// How a configured command is turned into a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum InvocationMode {
    /// Run the executable directly with the command split into arguments.
    #[default]
    Direct,
    /// Hand `<executable> <command>` to `bash -c`.
    Shell,
}

impl std::fmt::Display for InvocationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Shell => write!(f, "shell"),
        }
    }
}

// =============================================================================
// Step Configuration
// =============================================================================

/// Resolved step configuration. Read-only after loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    version: String,
    working_dir: PathBuf,
    commands: Vec<String>,
    sdk_dir: Option<PathBuf>,
    invocation: InvocationMode,
    storage_base_url: String,
}

impl Config {
    /// Loads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let version = non_empty(VERSION_KEY).ok_or(ConfigError::Missing(VERSION_KEY))?;
        if channel_from_version(&version).is_err() {
            return Err(ConfigError::MissingChannel(version));
        }

        let working_dir =
            PathBuf::from(non_empty(WORKING_DIR_KEY).ok_or(ConfigError::Missing(WORKING_DIR_KEY))?);
        if !working_dir.is_dir() {
            return Err(ConfigError::WorkingDirNotFound(working_dir));
        }

        let commands = lookup(COMMANDS_KEY)
            .map(|raw| parse_commands(&raw))
            .unwrap_or_default();

        let sdk_dir = non_empty(SDK_DIR_KEY).map(PathBuf::from);

        let use_shell = non_empty(USE_SHELL_KEY)
            .map(|value| parse_bool(USE_SHELL_KEY, &value))
            .transpose()?
            .unwrap_or(false);
        let invocation = if use_shell {
            InvocationMode::Shell
        } else {
            InvocationMode::Direct
        };

        let storage_base_url =
            non_empty(STORAGE_BASE_URL_KEY).unwrap_or_else(|| DEFAULT_STORAGE_BASE_URL.to_string());
        validate_url(&storage_base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: storage_base_url.clone(),
            reason: format!("{:#}", e),
        })?;

        Ok(Self {
            version,
            working_dir,
            commands,
            sdk_dir,
            invocation,
            storage_base_url,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Commands in the order they run.
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Install directory override, if any.
    pub fn sdk_dir(&self) -> Option<&Path> {
        self.sdk_dir.as_deref()
    }

    pub fn invocation(&self) -> InvocationMode {
        self.invocation
    }

    pub fn storage_base_url(&self) -> &str {
        &self.storage_base_url
    }

    /// Logs the resolved configuration for the build log.
    pub fn dump(&self) {
        info!("Configs:");
        info!("- Version: {}", self.version);
        info!("- WorkingDir: {}", self.working_dir.display());
        info!("- Commands: {}", self.commands.len());
        for (i, command) in self.commands.iter().enumerate() {
            info!("  {}. {}", i + 1, command);
        }
        match &self.sdk_dir {
            Some(dir) => info!("- SdkDir: {}", dir.display()),
            None => info!("- SdkDir: (platform default)"),
        }
        info!("- Invocation: {}", self.invocation);
        info!("- StorageBaseUrl: {}", self.storage_base_url);

        match serde_json::to_string(self) {
            Ok(json) => debug!("Resolved config: {}", json),
            Err(e) => debug!("Could not serialize config: {}", e),
        }
    }
}

/// Splits the raw `commands` input into one command per non-blank line.
fn parse_commands(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key,
            value: value.to_string(),
        }),
    }
}
