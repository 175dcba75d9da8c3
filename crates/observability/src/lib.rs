//! Tracing/logging setup shared by every process that embeds the engine.

/// Initialize process-wide tracing with JSON output.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(tracing::LogFormat::from_env());
}

/// Human-readable output captured by the test harness.
pub fn init_for_tests() {
    tracing::init_test_writer();
}

/// Tracing configuration (filters, formats).
pub mod tracing;

pub use tracing::LogFormat;
