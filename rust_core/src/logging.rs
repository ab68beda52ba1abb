//! Tracing setup for binaries and tests embedding the engine.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "heatcheck_core=info";

/// Install a fmt subscriber filtered by `RUST_LOG` (default `heatcheck_core=info`).
///
/// Returns `false` when a global subscriber is already installed, which is
/// expected when a host server has set up its own.
pub fn init_tracing() -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_repeatable() {
        init_tracing();
        assert!(!init_tracing());
    }
}
