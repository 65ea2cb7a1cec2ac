//! Shared tracing setup for the `api` and `cli` binaries, so both honor
//! `RUST_LOG` the same way instead of each calling `fmt::init()` raw.

use tracing_subscriber::EnvFilter;

/// Installs a compact `tracing_subscriber` formatter driven by `RUST_LOG`,
/// defaulting to `info` when unset.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .compact()
        .init();
}
