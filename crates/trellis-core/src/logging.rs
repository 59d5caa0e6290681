//! Optional tracing-subscriber setup.
//!
//! Trellis emits diagnostics through [`tracing`] everywhere; this module,
//! available behind the `logging` feature, installs a sensible default
//! subscriber for applications that do not configure their own.

use std::sync::Once;

static INIT: Once = Once::new();

/// Install a global tracing subscriber reading `RUST_LOG`.
///
/// Safe to call more than once; only the first call installs. Applications
/// with their own subscriber should skip this and configure `tracing`
/// directly.
pub fn init() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init();
    });
}
