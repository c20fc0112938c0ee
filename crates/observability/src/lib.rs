//! Process-wide logging setup shared by FleetDesk binaries and test suites.

/// Initialize tracing with settings read from the environment.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init();
}

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use tracing::{LogFormat, TracingConfig};
