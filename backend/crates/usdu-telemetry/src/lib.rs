//! Tracing setup shared by the binaries

use anyhow::anyhow;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Install the global `fmt` subscriber, filtered by `RUST_LOG` (default `info`)
pub fn init() -> anyhow::Result<()> {
  let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))?;

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .try_init()
    .map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))?;

  tracing::debug!("Telemetry initialized");
  Ok(())
}
