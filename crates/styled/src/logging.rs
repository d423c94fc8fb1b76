//! Structured logging setup.
//!
//! The library itself only emits `tracing` events. Binaries and test
//! harnesses that want to see them call [`init_logging`] once.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::StyledError;
use crate::config::LoggingConfig;

/// Initialize the global subscriber based on configuration.
///
/// `RUST_LOG` wins over `config.level` when set. Fails if a global
/// subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), StyledError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| StyledError::Logging {
            message: format!("invalid log filter {:?}: {}", config.level, e),
        })?;

    let fmt_layer = fmt::layer().with_target(true).with_file(true).with_line_number(true);

    let result = if config.json {
        tracing_subscriber::registry().with(filter).with(fmt_layer.json()).try_init()
    } else {
        tracing_subscriber::registry().with(filter).with(fmt_layer).try_init()
    };

    result.map_err(|e| StyledError::Logging { message: e.to_string() })
}
