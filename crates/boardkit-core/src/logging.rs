//! Logging bootstrap.
//!
//! Library code only emits `tracing` events. Applications call
//! [`init_stdout`] once at startup to print them.

use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    prelude::*,
};

/// Install a stdout subscriber filtered by `RUST_LOG`, defaulting to INFO.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_stdout() -> bool {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var("RUST_LOG")
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
