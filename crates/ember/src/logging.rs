//! Logging setup.
//!
//! Mod log calls are recorded by the host and re-emitted as `tracing`
//! events carrying a `module` field, so they end up here with everything
//! else. `RUST_LOG` overrides the configured level.

use crate::config::LoggingSettings;
use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the global subscriber. JSON output is used when either the
/// config or the `--json-logs` flag asks for it.
pub fn setup_logging(config: &LoggingSettings, json_format: bool) -> Result<()> {
    let level = config.level.as_str();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    if json_format || config.json_format {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_file(false)
                    .with_line_number(false)
                    .with_target(true),
            )
            .try_init()
            .context("failed to install JSON log subscriber")?;
    } else {
        registry
            .with(fmt::layer().with_target(false))
            .try_init()
            .context("failed to install log subscriber")?;
    }

    info!("Logging initialized with level: {}", level);
    Ok(())
}
