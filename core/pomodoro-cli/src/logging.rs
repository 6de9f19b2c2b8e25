//! Process-wide logging setup (spec §10.2).
//!
//! Structured diagnostics via `tracing`, honoring `RUST_LOG` (default
//! `info`), written exclusively to stderr so nothing ever corrupts
//! `status`'s machine-readable stdout.

use tracing_subscriber::EnvFilter;

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
