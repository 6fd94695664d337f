//! Tracing subscriber initialization.

use crate::config::Config;

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the configured log level applies.
/// Call once at startup, before the first ledger operation.
pub fn init(config: &Config) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .init();
}
