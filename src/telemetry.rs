//! Log output for the binaries
//!
//! `RUST_LOG` picks the filter; `info` otherwise.

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber
///
/// Safe to call more than once; later calls are ignored.
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}
