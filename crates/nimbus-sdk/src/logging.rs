//! Logging setup

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{Result, SdkError};

/// Filter directives enabling `level` for the nimbus crates
pub fn default_directives(level: &str) -> String {
    format!(
        "nimbus_core={0},nimbus_runtime={0},nimbus_sdk={0}",
        level.to_ascii_lowercase()
    )
}

/// Install a global fmt subscriber. `RUST_LOG` takes precedence over `level`.
pub fn init_logging(level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directives(level))
            .map_err(|e| SdkError::ConfigError(format!("Invalid log level '{}': {}", level, e)))?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| SdkError::ConfigError(format!("Failed to initialize logging: {}", e)))
}
