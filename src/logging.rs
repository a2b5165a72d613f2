use anyhow::{anyhow, Result};
use std::io;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber, logging to stderr.
///
/// `RUST_LOG` wins over `default_filter` when set.
pub fn init(default_filter: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|err| anyhow!("Invalid log filter `{default_filter}`: {err}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow!("Failed to install logger: {err}"))
}
