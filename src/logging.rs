//! Diagnostic logging setup.

use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs the stderr tracing subscriber (if one is not already active).
///
/// `default_directive` is used when `RUST_LOG` is absent. Calling this
/// function multiple times is harmless; the first call wins.
pub fn init_tracing(default_directive: &str) {
    if TRACING_INIT.get().is_some() {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();

    let _ = TRACING_INIT.set(());
}
