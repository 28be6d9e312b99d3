//! Log facade setup: `log` macros bridged onto a `tracing` subscriber.

use tracing_log::LogTracer;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Safe to call more than once; later calls
/// are no-ops.
///
/// The filter honors `RUST_LOG` and defaults to `info`.
pub fn init() {
    let _ = LogTracer::init();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
