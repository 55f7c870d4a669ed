//! The step itself: make sure the SDK is there, then run the commands.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::StepError;
use crate::preflight::check_android_sdk;
use crate::runner::CommandRunner;
use crate::sdk::{
    sdk_dir_exists, ArchiveSource, HostEnv, HttpSource, PlatformStrategy, SdkInstaller,
};

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    /// Where the SDK lives.
    pub sdk_dir: PathBuf,
    /// Whether this run downloaded the SDK.
    pub installed: bool,
    /// Number of commands that ran.
    pub commands_run: usize,
}

/// Runs the whole step against the real process environment and host.
pub async fn run_from_env() -> Result<StepOutcome, StepError> {
    check_android_sdk(|key| std::env::var(key).ok())?;

    let config = Config::from_env()?;
    config.dump();

    let host = HostEnv::current();
    let source = HttpSource::new();

    run(&config, &host, &source).await
}

/// Ensures the SDK is installed and runs the configured commands.
///
/// The SDK is installed at most once, and only when its directory is absent.
pub async fn run(
    config: &Config,
    host: &HostEnv,
    source: &dyn ArchiveSource,
) -> Result<StepOutcome, StepError> {
    let strategy = PlatformStrategy::resolve(host)?;
    if let Ok(json) = serde_json::to_string(&strategy) {
        debug!("Platform strategy: {}", json);
    }

    let sdk_dir = config
        .sdk_dir()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| strategy.default_install_dir.clone());
    info!("Flutter SDK dir: {}", sdk_dir.display());

    let installed = if sdk_dir_exists(&sdk_dir).map_err(StepError::PresenceCheck)? {
        info!("Flutter SDK folder already exists, skipping installation.");
        false
    } else {
        SdkInstaller::new(&strategy, host, source)
            .with_base_url(config.storage_base_url())
            .install(config.version(), &sdk_dir)
            .await?;
        true
    };

    CommandRunner::new(&sdk_dir, config.working_dir(), config.invocation())
        .run_all(config.commands())
        .await?;

    Ok(StepOutcome {
        sdk_dir,
        installed,
        commands_run: config.commands().len(),
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::sdk::sdk_executable_path;
    use crate::test_support::{flutter_tar_xz, FakeSource, FAKE_FLUTTER_SCRIPT};
    use std::collections::HashMap;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    struct Fixture {
        scratch: TempDir,
        sdk_root: TempDir,
        work: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                scratch: TempDir::new().unwrap(),
                sdk_root: TempDir::new().unwrap(),
                work: TempDir::new().unwrap(),
            }
        }

        fn sdk_dir(&self) -> PathBuf {
            self.sdk_root.path().join("flutter")
        }

        fn host(&self, os: &str) -> HostEnv {
            HostEnv {
                os: os.to_string(),
                home_dir: Some(self.sdk_root.path().to_path_buf()),
                temp_dir: self.scratch.path().to_path_buf(),
            }
        }

        fn config(&self, commands: &str) -> Config {
            let vars: HashMap<&str, String> = HashMap::from([
                ("version", "1.7.8-beta".to_string()),
                ("working_dir", self.work.path().to_str().unwrap().to_string()),
                ("sdk_dir", self.sdk_dir().to_str().unwrap().to_string()),
                ("commands", commands.to_string()),
            ]);
            Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
        }

        fn preinstall(&self) {
            let exec_path = sdk_executable_path(&self.sdk_dir());
            std::fs::create_dir_all(exec_path.parent().unwrap()).unwrap();
            std::fs::write(&exec_path, FAKE_FLUTTER_SCRIPT).unwrap();
            std::fs::set_permissions(&exec_path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        fn invocations(&self) -> Vec<String> {
            std::fs::read_to_string(self.work.path().join("invocations.log"))
                .unwrap_or_default()
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    #[tokio::test]
    async fn test_existing_sdk_skips_install() {
        let fx = Fixture::new();
        fx.preinstall();
        let source = FakeSource::serving(b"never fetched".to_vec());

        let outcome = run(&fx.config("doctor"), &fx.host("linux"), &source)
            .await
            .unwrap();

        assert!(!outcome.installed);
        assert_eq!(source.calls(), 0);
        assert_eq!(fx.invocations(), vec!["doctor"]);
    }

    #[tokio::test]
    async fn test_missing_sdk_is_installed_once_then_used() {
        let fx = Fixture::new();
        let source = FakeSource::serving(flutter_tar_xz());

        let outcome = run(&fx.config("doctor\nbuild apk"), &fx.host("linux"), &source)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            StepOutcome {
                sdk_dir: fx.sdk_dir(),
                installed: true,
                commands_run: 2,
            }
        );
        assert_eq!(source.calls(), 1);
        assert!(sdk_executable_path(&fx.sdk_dir()).is_file());
        assert_eq!(fx.invocations(), vec!["doctor", "build apk"]);
        assert!(std::fs::read_dir(fx.scratch.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_second_run_reuses_sdk() {
        let fx = Fixture::new();
        let source = FakeSource::serving(flutter_tar_xz());
        let config = fx.config("doctor");

        run(&config, &fx.host("linux"), &source).await.unwrap();
        let second = run(&config, &fx.host("linux"), &source).await.unwrap();

        assert!(!second.installed);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_platform_does_nothing() {
        let fx = Fixture::new();
        let source = FakeSource::serving(flutter_tar_xz());

        let err = run(&fx.config("doctor"), &fx.host("windows"), &source)
            .await
            .unwrap_err();

        assert!(matches!(err, StepError::Platform(_)));
        assert_eq!(err.exit_code(), 5);
        assert_eq!(source.calls(), 0);
        assert!(!fx.sdk_dir().exists());
        assert!(fx.invocations().is_empty());
    }

    #[tokio::test]
    async fn test_failing_command_stops_the_rest() {
        let fx = Fixture::new();
        fx.preinstall();
        let source = FakeSource::serving(Vec::new());

        let err = run(&fx.config("first\nfail\nthird"), &fx.host("linux"), &source)
            .await
            .unwrap_err();

        assert_eq!(err.exit_code(), 3);
        match &err {
            StepError::Command(cmd_err) => {
                assert_eq!(cmd_err.index(), 2);
                assert_eq!(cmd_err.command(), "fail");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fx.invocations(), vec!["first", "fail"]);
    }

    #[tokio::test]
    async fn test_install_failure_runs_no_commands() {
        let fx = Fixture::new();
        let source = FakeSource::failing("503 Service Unavailable");

        let err = run(&fx.config("doctor"), &fx.host("linux"), &source)
            .await
            .unwrap_err();

        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("503 Service Unavailable"));
        assert!(fx.invocations().is_empty());
        assert!(!fx.sdk_dir().exists());
        assert!(std::fs::read_dir(fx.scratch.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_file_at_sdk_dir_is_presence_error() {
        let fx = Fixture::new();
        std::fs::write(fx.sdk_dir(), b"oops").unwrap();
        let source = FakeSource::serving(flutter_tar_xz());

        let err = run(&fx.config("doctor"), &fx.host("linux"), &source)
            .await
            .unwrap_err();

        assert!(matches!(err, StepError::PresenceCheck(_)));
        assert_eq!(err.exit_code(), 1);
        assert_eq!(source.calls(), 0);
    }
}
