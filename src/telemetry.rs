//! Tracing subscriber setup.
//!
//! Every subsystem logs through `tracing` with structured fields (`method`, `path`,
//! `route_pattern`, `handler`, `status`, `duration_us`). This module installs the global
//! subscriber that turns those events into output.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

/// Install a global fmt (or JSON) subscriber.
///
/// `RUST_LOG` takes precedence over `config.level`; an unparsable level falls back to
/// `info`.
///
/// # Returns
///
/// `false` if a global subscriber was already installed, in which case nothing changes.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new(Level::INFO.as_str()));

    let fmt_layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_span_list(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .is_ok()
}
