//! Tracing subscriber setup
//!
//! Logs go to stderr so hosts that read snapshots from stdout are unaffected.

use crate::shared::errors::{EngineError, EngineResult};
use crate::shared::settings::EngineSettings;
use std::io;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global subscriber with the configured filter.
///
/// Calling it again once a subscriber is installed is a no-op.
///
/// # Errors
///
/// Returns `EngineError::Settings` if `log_filter` is not a valid directive
pub fn init_logging(settings: &EngineSettings) -> EngineResult<()> {
    let filter = EnvFilter::try_new(&settings.log_filter)
        .map_err(|e| EngineError::Settings(format!("Invalid log filter '{}': {}", settings.log_filter, e)))?;

    let layer = fmt::layer()
        .with_target(true)
        .with_writer(io::stderr);

    if tracing_subscriber::registry().with(filter).with(layer).try_init().is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
    Ok(())
}
