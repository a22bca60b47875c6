//! Subscriber setup for the host binary

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;

/// Install a global `fmt` subscriber writing to stderr
///
/// `RUST_LOG`, when set, takes precedence over `level`.
pub fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .with_context(|| format!("Invalid log level '{}'", level))?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow!("Failed to install log subscriber: {}", e))
}
