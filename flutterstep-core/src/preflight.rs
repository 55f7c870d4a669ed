//! Host checks run before the step touches anything.

use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

/// Variables that locate an Android SDK, in lookup order.
const ANDROID_SDK_VARS: &[&str] = &["ANDROID_HOME", "ANDROID_SDK_ROOT"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PreflightError {
    #[error("{var} points to {}, which is not a directory", path.display())]
    AndroidSdkNotFound { var: &'static str, path: PathBuf },
}

/// Verifies the Android SDK the host advertises actually exists.
///
/// Every variable in [`ANDROID_SDK_VARS`] that is set must name a directory.
/// A host without any of them passes with a warning, since iOS and web
/// builds do not need it.
pub fn check_android_sdk<F>(lookup: F) -> Result<Option<PathBuf>, PreflightError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut found = None;

    for &var in ANDROID_SDK_VARS {
        let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) else {
            continue;
        };

        let path = PathBuf::from(value.trim());
        if !path.is_dir() {
            return Err(PreflightError::AndroidSdkNotFound { var, path });
        }

        found.get_or_insert(path);
    }

    match &found {
        Some(path) => info!("Android SDK: {}", path.display()),
        None => warn!(
            "No Android SDK configured ({}); Android builds will fail",
            ANDROID_SDK_VARS.join(", ")
        ),
    }

    Ok(found)
}
