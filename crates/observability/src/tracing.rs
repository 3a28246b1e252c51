//! Tracing/logging initialization.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize JSON logging for the process.
///
/// The filter comes from `RUST_LOG`, defaulting to `info`. Safe to call
/// multiple times; subsequent calls are no-ops (matters for tests that spin
/// up the full app repeatedly).
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let format = fmt::layer()
        .json()
        .with_timer(fmt::time::SystemTime)
        .with_target(false);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .try_init();
}
