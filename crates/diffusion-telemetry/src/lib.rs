//! `diffusion-telemetry` - best-effort remote syslog telemetry.
//!
//! Records are RFC 5424 syslog messages sent over UDP. Delivery is never
//! confirmed and failures never reach the caller: they end up as local
//! `tracing` diagnostics.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Sender address discovery and caching.
pub mod address;
/// Telemetry settings and reload.
pub mod config;
/// Telemetry errors.
pub mod error;
/// Remote logger facade.
pub mod logger;
/// RFC 5424 message construction.
pub mod syslog;
/// Connectionless record transport.
pub mod transport;

pub use address::{AddressLookup, HttpAddressLookup, SenderAddress, UNKNOWN_ADDRESS};
pub use config::{TelemetryConfig, TelemetryProperties, TelemetrySettings};
pub use error::TelemetryError;
pub use logger::RemoteLogger;
pub use transport::{Transport, UdpTransport};
