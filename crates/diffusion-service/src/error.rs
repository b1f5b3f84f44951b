//! Service errors.

#![allow(missing_docs)]

use smol_str::SmolStr;
use thiserror::Error;

use diffusion_telemetry::TelemetryError;

/// Errors raised while configuring or starting the service.
///
/// Request outcomes never surface here; they travel in the response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Configuration error.
    #[error("invalid config '{0}'")]
    InvalidConfig(SmolStr),

    /// Network registry document could not be loaded.
    #[error("invalid network registry '{0}'")]
    InvalidRegistry(SmolStr),

    /// HTTP server error.
    #[error("web server error '{0}'")]
    Server(SmolStr),

    /// Telemetry settings rejected.
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
}
