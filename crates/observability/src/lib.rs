//! Process-wide logging setup shared by every docflow binary and test harness.

pub mod logging;

pub use logging::{LogConfig, LogFormat};

/// Initialize JSON logging filtered by `RUST_LOG` (default `info`).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    logging::init(&LogConfig::default());
}
