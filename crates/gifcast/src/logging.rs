//! Tracing subscriber setup for binaries and tests embedding the recorder.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "gifcast=info";

/// Install a global fmt subscriber
///
/// `RUST_LOG` takes precedence over `default_filter`. Returns `false` if a
/// global subscriber was already installed.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init()
        .is_ok()
}

/// Install a global subscriber emitting one JSON object per event
pub fn init_json_tracing(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init()
        .is_ok()
}
