// src/logging.rs
//! Logging setup for the command-line tool
//!
//! Log lines go to stderr so stdout stays free for fix output. The level
//! comes from `RUST_LOG` when set, otherwise from the caller.

use crate::error::{GpsError, Result};
use std::io;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(default_level: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| GpsError::Other(format!("Failed to initialise logging: {}", e)))
}
