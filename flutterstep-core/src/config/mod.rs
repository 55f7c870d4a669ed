//! Configuration module for flutterstep.
//!
//! Reads the step inputs from the environment.

mod settings;

pub use settings::{
    Config, ConfigError, InvocationMode, COMMANDS_KEY, SDK_DIR_KEY, STORAGE_BASE_URL_KEY,
    USE_SHELL_KEY, VERSION_KEY, WORKING_DIR_KEY,
};
