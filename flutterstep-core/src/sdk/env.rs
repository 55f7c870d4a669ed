//! Environment helpers for processes that use the SDK.
//!
//! Commands run against the SDK get its `bin` directory at the front of
//! `PATH`, so tools the SDK shells out to (`dart`, `flutter` itself) resolve
//! to the installed version rather than whatever the host has.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

use super::paths::sdk_bin_dir;

/// Prepends the SDK `bin` directory to an existing `PATH` value.
///
/// Falls back to the process `PATH` when `existing` is `None`. Empty entries
/// and an existing copy of the SDK entry are dropped.
pub fn prepend_sdk_to_path(sdk_dir: &Path, existing: Option<OsString>) -> Result<OsString> {
    let bin_dir = sdk_bin_dir(sdk_dir);
    let base = existing.or_else(|| std::env::var_os("PATH"));

    let mut entries: Vec<PathBuf> = vec![bin_dir.clone()];
    if let Some(base) = base {
        entries.extend(
            std::env::split_paths(&base).filter(|p| !p.as_os_str().is_empty() && *p != bin_dir),
        );
    }

    std::env::join_paths(entries)
        .with_context(|| format!("Cannot add {} to PATH", bin_dir.display()))
}

/// Applies SDK environment overrides to a Command.
pub fn apply_to_command(cmd: &mut Command, sdk_dir: &Path) -> Result<()> {
    let new_path = prepend_sdk_to_path(sdk_dir, None)?;
    debug!("PATH for SDK commands: {:?}", new_path);
    cmd.env("PATH", new_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_prepend_sdk_to_path() {
        let result =
            prepend_sdk_to_path(Path::new("/opt/flutter"), Some("/usr/bin:/bin".into())).unwrap();
        assert_eq!(result, OsString::from("/opt/flutter/bin:/usr/bin:/bin"));
    }

    #[cfg(unix)]
    #[test]
    fn test_prepend_sdk_to_path_no_duplicate() {
        let result = prepend_sdk_to_path(
            Path::new("/opt/flutter"),
            Some("/opt/flutter/bin:/usr/bin".into()),
        )
        .unwrap();
        assert_eq!(result, OsString::from("/opt/flutter/bin:/usr/bin"));
    }

    #[test]
    fn test_prepend_sdk_to_empty_path() {
        let result = prepend_sdk_to_path(Path::new("/opt/flutter"), Some(OsString::new())).unwrap();
        assert_eq!(PathBuf::from(result), sdk_bin_dir(Path::new("/opt/flutter")));
    }

    #[test]
    fn test_prepend_sdk_rejects_separator_in_dir() {
        #[cfg(unix)]
        let weird = Path::new("/opt/flu:tter");
        #[cfg(windows)]
        let weird = Path::new("C:\\flu;tter");

        assert!(prepend_sdk_to_path(weird, Some(OsString::new())).is_err());
    }
}
