//! Runs the configured commands against the SDK executable.
//!
//! Each command runs to completion in the working directory with the step's
//! stdout/stderr inherited, so its output streams straight into the build
//! log. The first failure stops the sequence.

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::InvocationMode;
use crate::sdk::{apply_to_command, sdk_executable_path};

/// Shell used when commands are evaluated instead of executed directly.
const SHELL: &str = "bash";
const SHELL_ARG: &str = "-c";

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Command #{index} `{command}` could not be started: {source}")]
    Spawn {
        index: usize,
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Command #{index} `{command}` failed: {status}")]
    Failed {
        index: usize,
        command: String,
        status: ExitStatus,
    },

    #[error("Could not prepare environment for command #{index} `{command}`: {cause:#}")]
    Environment {
        index: usize,
        command: String,
        cause: anyhow::Error,
    },
}

impl CommandError {
    /// 1-based position of the failing command.
    pub fn index(&self) -> usize {
        match self {
            Self::Spawn { index, .. }
            | Self::Failed { index, .. }
            | Self::Environment { index, .. } => *index,
        }
    }

    /// Text of the failing command, as configured.
    pub fn command(&self) -> &str {
        match self {
            Self::Spawn { command, .. }
            | Self::Failed { command, .. }
            | Self::Environment { command, .. } => command,
        }
    }
}

/// Executes commands against an installed SDK.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    sdk_dir: PathBuf,
    working_dir: PathBuf,
    mode: InvocationMode,
}

impl CommandRunner {
    pub fn new(sdk_dir: &Path, working_dir: &Path, mode: InvocationMode) -> Self {
        Self {
            sdk_dir: sdk_dir.to_path_buf(),
            working_dir: working_dir.to_path_buf(),
            mode,
        }
    }

    /// Runs every command in order, stopping at the first failure.
    pub async fn run_all(&self, commands: &[String]) -> Result<(), CommandError> {
        for (i, command) in commands.iter().enumerate() {
            self.run_one(i + 1, command).await?;
        }
        Ok(())
    }

    async fn run_one(&self, index: usize, command: &str) -> Result<(), CommandError> {
        info!("Executing Flutter command: {}", command);

        let mut cmd = self.build_command(command);
        apply_to_command(&mut cmd, &self.sdk_dir).map_err(|cause| CommandError::Environment {
            index,
            command: command.to_string(),
            cause,
        })?;

        let status = cmd.status().await.map_err(|source| CommandError::Spawn {
            index,
            command: command.to_string(),
            source,
        })?;

        if !status.success() {
            return Err(CommandError::Failed {
                index,
                command: command.to_string(),
                status,
            });
        }

        debug!("Command #{} finished: {}", index, status);
        Ok(())
    }

    fn build_command(&self, command: &str) -> Command {
        let executable = sdk_executable_path(&self.sdk_dir);

        let mut cmd = match self.mode {
            InvocationMode::Direct => {
                let mut cmd = Command::new(&executable);
                cmd.args(command.split_whitespace());
                cmd
            }
            InvocationMode::Shell => {
                let script = format!("{} {}", shell_quote(&executable), command);
                debug!("{} {} {}", SHELL, SHELL_ARG, script);
                let mut cmd = Command::new(SHELL);
                cmd.arg(SHELL_ARG).arg(script);
                cmd
            }
        };

        cmd.current_dir(&self.working_dir);
        cmd
    }
}

/// Single-quotes a path for POSIX shells.
fn shell_quote(path: &Path) -> String {
    format!("'{}'", path.to_string_lossy().replace('\'', r"'\''"))
}
