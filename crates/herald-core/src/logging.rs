//! `tracing` subscriber setup.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber with stderr output.
///
/// `RUST_LOG` takes precedence over `level` when set. Returns `false` when a
/// global subscriber was already installed, in which case nothing changes.
pub fn init_subscriber(level: &str) -> bool {
    let from_env = std::env::var_os(EnvFilter::DEFAULT_ENV).is_some();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    if subscriber.try_init().is_err() {
        return false;
    }
    tracing::debug!(level, from_env, "tracing subscriber installed");
    true
}
