//! Tracing subscriber setup
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! the embedding process, which can use this helper.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{EngineConfig, LogFormat};

/// Install a global `fmt` subscriber configured from `config`.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing(config: &EngineConfig) -> bool {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match config.log_format {
        LogFormat::Json => fmt()
            .with_env_filter(filter)
            .json()
            .with_target(false)
            .try_init(),
        LogFormat::Compact => fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .try_init(),
    };

    result.is_ok()
}
