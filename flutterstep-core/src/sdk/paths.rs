//! Path helpers for an SDK installation.
//!
//! An installed SDK is a directory laid out like the published archive:
//!
//! - `{sdk}/bin/`          - executables, prepended to `PATH` for commands
//! - `{sdk}/bin/flutter`   - the executable every command is run against
//!
//! The presence of `{sdk}` is the only installation state that exists; there
//! is no manifest and no version stamp.

use std::io;
use std::path::{Path, PathBuf};

/// Name of the SDK's `bin` subdirectory.
const SDK_BIN_DIR: &str = "bin";

/// Name of the SDK executable.
const SDK_EXECUTABLE: &str = "flutter";

/// Returns the SDK's `bin` directory.
///
/// Path: `{sdk}/bin/`
pub fn sdk_bin_dir(sdk_dir: &Path) -> PathBuf {
    sdk_dir.join(SDK_BIN_DIR)
}

/// Returns the path to the SDK executable.
///
/// Path: `{sdk}/bin/flutter`
pub fn sdk_executable_path(sdk_dir: &Path) -> PathBuf {
    sdk_bin_dir(sdk_dir).join(SDK_EXECUTABLE)
}

/// Checks whether the SDK directory is present.
///
/// A directory at `path` counts as an installed SDK, whatever it contains.
///
/// # Errors
///
/// Returns an error if the path cannot be inspected, or if something other
/// than a directory occupies it.
pub fn sdk_dir_exists(path: &Path) -> io::Result<bool> {
    match std::fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => Ok(true),
        Ok(_) => Err(io::Error::new(
            io::ErrorKind::Other,
            format!("{} exists but is not a directory", path.display()),
        )),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_executable_path_is_under_bin() {
        let sdk = Path::new("/opt/flutter");
        assert_eq!(sdk_bin_dir(sdk), PathBuf::from("/opt/flutter/bin"));
        assert_eq!(
            sdk_executable_path(sdk),
            PathBuf::from("/opt/flutter/bin/flutter")
        );
    }

    #[test]
    fn test_sdk_dir_exists_for_directory() {
        let temp_dir = TempDir::new().unwrap();
        assert!(sdk_dir_exists(temp_dir.path()).unwrap());
    }

    #[test]
    fn test_sdk_dir_exists_for_empty_directory() {
        // An empty (stale) directory still counts as installed.
        let temp_dir = TempDir::new().unwrap();
        let sdk = temp_dir.path().join("flutter");
        std::fs::create_dir(&sdk).unwrap();
        assert!(sdk_dir_exists(&sdk).unwrap());
    }

    #[test]
    fn test_sdk_dir_exists_missing() {
        let temp_dir = TempDir::new().unwrap();
        assert!(!sdk_dir_exists(&temp_dir.path().join("flutter")).unwrap());
    }

    #[test]
    fn test_sdk_dir_exists_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("flutter");
        std::fs::write(&file, b"not a directory").unwrap();
        assert!(sdk_dir_exists(&file).is_err());
    }
}
