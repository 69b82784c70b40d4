//! Structured logging setup using the tracing crate.

use std::error::Error;
use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber for the process.
///
/// Filtering is driven by `RUST_LOG` (default `warn`, so batch runs stay
/// quiet under the progress bar) and output goes to stderr, keeping stdout
/// clean for shell pipelines.
pub fn init_subscriber() -> Result<(), Box<dyn Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()?;

    Ok(())
}
