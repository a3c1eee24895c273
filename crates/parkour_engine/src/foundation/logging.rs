//! Logging setup
//!
//! The crate logs through the `log` facade; binaries pick the backend.
//! [`init_with_level`] wires up `env_logger` the way the demo expects.

pub use log::{debug, error, info, trace, warn};

/// Initialize `env_logger`, falling back to `level` when `RUST_LOG` is unset
///
/// Later calls are ignored, so tests and binaries can both call it.
pub fn init_with_level(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    if env_logger::Builder::from_env(env).try_init().is_ok() {
        log::debug!("Logging initialised (default filter: {})", level);
    }
}
