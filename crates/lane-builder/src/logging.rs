//! Tracing subscriber setup.
//!
//! Installs a global `tracing-subscriber` registry with an `EnvFilter`
//! (`RUST_LOG` wins over the configured level) and either a pretty or a
//! JSON `fmt` layer.

use crate::config::LoggingConfig;
use crate::error::{BlockBuilderError, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging for the process.
///
/// Returns an error if the filter is malformed or a global subscriber is
/// already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| BlockBuilderError::InvalidConfig(e.to_string()))?;

    if config.json {
        // JSON output for containers/production
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
            .map_err(|e| BlockBuilderError::InvalidConfig(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| BlockBuilderError::InvalidConfig(e.to_string()))?;
    }

    tracing::info!(
        level = %config.level,
        json = config.json,
        "[builder] logging initialized"
    );

    Ok(())
}
