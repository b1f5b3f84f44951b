//! Telemetry errors.

#![allow(missing_docs)]

use smol_str::SmolStr;
use thiserror::Error;

/// Errors raised inside the telemetry client.
///
/// Only configuration callers ever see these; the logging entry points
/// absorb them into local diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TelemetryError {
    /// Port property is not a valid non-zero port number.
    #[error("invalid syslog server port '{0}'")]
    InvalidPort(SmolStr),

    /// Hostname property is empty or malformed.
    #[error("invalid hostname '{0}'")]
    InvalidHostname(SmolStr),

    /// Hostname does not resolve to any address.
    #[error("unresolvable host '{0}'")]
    UnresolvableHost(SmolStr),

    /// Sender address lookup failed at the transport level.
    #[error("sender address discovery failed '{0}'")]
    Discovery(SmolStr),

    /// Sender address service replied with an unusable body.
    #[error("malformed sender address response '{0}'")]
    MalformedResponse(SmolStr),

    /// Record could not be handed to the transport.
    #[error("telemetry send failed '{0}'")]
    Transport(SmolStr),
}
