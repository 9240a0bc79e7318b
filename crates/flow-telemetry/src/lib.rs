//! # Flow Telemetry
//!
//! Logging bootstrap shared by Ledger-Flow binaries.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use flow_telemetry::{TelemetryConfig, init_telemetry};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(TelemetryConfig::from_env())?;
//!     // Application code; tracing macros now reach the subscriber
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `FLOW_SERVICE_NAME` | `ledger-flow` | Service name in log lines |
//! | `FLOW_LOG_LEVEL` | `info` | Log level filter (`RUST_LOG` also honoured) |
//! | `FLOW_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `FLOW_JSON_LOGS` | `false` (`true` in containers) | JSON formatted logs |

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::init_logging;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to install tracing subscriber: {0}")]
    SubscriberInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging.
///
/// Returns a guard that should be held for the lifetime of the application;
/// dropping it logs the shutdown.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    logging::init_logging(&config)?;
    Ok(TelemetryGuard {
        service_name: config.service_name,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    service_name: String,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Shutting down telemetry");
    }
}

/// Convenience macro for creating a span with component context.
///
/// # Example
///
/// ```rust,ignore
/// use flow_telemetry::component_span;
///
/// let _span = component_span!("run_step", component = "runner", step_id = 2).entered();
/// ```
#[macro_export]
macro_rules! component_span {
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!($name, $($field)*)
    };
}
