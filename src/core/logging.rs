//! Tracing setup for hosts that want the library's default wiring.
//!
//! The crate only emits `tracing` events; embedding applications usually
//! install their own subscriber. `init()` is a convenience for binaries and
//! examples: stderr output, level filtered by `LEDGERLINK_LOG`.

use tracing_subscriber::EnvFilter;

const LOG_LEVEL_ENV: &str = "LEDGERLINK_LOG";

/// Default filter when `LEDGERLINK_LOG` is unset.
const DEFAULT_FILTER: &str = "ledgerlink=warn";

/// Install a stderr subscriber filtered by `LEDGERLINK_LOG`.
///
/// Safe to call more than once; later calls are ignored if a global
/// subscriber is already set.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_LEVEL_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init();
        init();
    }
}
