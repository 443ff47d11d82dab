//! Logging Infrastructure
//!
//! Structured logging setup for development and production runs.

use tracing_subscriber::EnvFilter;

/// Initialize the logger
///
/// Level comes from `RUST_LOG`, falling back to `info`. Production runs
/// (`ENVIRONMENT=production`) emit JSON lines; everything else stays
/// human-readable.
pub fn init_logger(environment: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    if environment == "production" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
