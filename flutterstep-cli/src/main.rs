//! flutterstep CLI
//!
//! CI step that installs the requested Flutter SDK if it is missing and runs
//! the configured flutter commands. All inputs come from the environment; see
//! `flutterstep_core::config` for the variable names.

use std::process::ExitCode;

use flutterstep_core::run_from_env;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

/// Extra verbosity for the step's own crate on top of `RUST_LOG`.
const CORE_LOG_DIRECTIVE: &str = "flutterstep_core=debug";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_target(false)
        .init();

    tracing::info!("Starting flutterstep v{}", flutterstep_core::VERSION);

    match run_from_env().await {
        Ok(outcome) => {
            tracing::info!(
                sdk_dir = %outcome.sdk_dir.display(),
                installed = outcome.installed,
                commands = outcome.commands_run,
                "Step finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

/// `RUST_LOG` plus [`CORE_LOG_DIRECTIVE`], defaulting everything else to INFO.
fn log_filter() -> EnvFilter {
    let filter = EnvFilter::from_default_env();
    let filter = match CORE_LOG_DIRECTIVE.parse::<Directive>() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    filter.add_directive(tracing::Level::INFO.into())
}
