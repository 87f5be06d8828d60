//! Logging setup for the binary.
//!
//! Logs go to stderr so stdout stays clean for reports and JSON output.
//! `RUST_LOG` takes precedence over the `--log-level` flag.

use tracing_subscriber::EnvFilter;

pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
