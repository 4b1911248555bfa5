//! Tracing subscriber setup.
//!
//! The filter comes from `RUST_LOG` when set; otherwise the configured
//! level applies crate-wide with sqlx statement logging capped at warn,
//! so query spam needs an explicit opt-in. Request lifecycle events are
//! emitted by the request-id middleware, not by span close events here.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Installs the global tracing subscriber. Called once at startup, before
/// the first log line.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},sqlx=warn", config.level)));

    let registry = tracing_subscriber::registry().with(filter);

    if config.format == "json" {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true),
            )
            .init();
    } else {
        registry.with(fmt::layer().pretty().with_target(true)).init();
    }
}
