//! Telemetry settings snapshot and reload.

#![allow(missing_docs)]

use std::net::ToSocketAddrs;
use std::sync::Arc;

use parking_lot::RwLock;
use smol_str::SmolStr;
use tracing::{error, info};

use crate::error::TelemetryError;

/// Default syslog sink host.
pub const DEFAULT_SYSLOG_SERVER_HOSTNAME: &str = "35.197.10.101";
/// Default syslog sink port.
pub const DEFAULT_SYSLOG_SERVER_PORT: u16 = 3333;
/// Default host answering sender address lookups.
pub const DEFAULT_SENDER_ADDRESS_SERVICE_HOSTNAME: &str = "35.197.44.209";

/// Property enabling telemetry when set to `true`.
pub const SHARE_STATISTICS: &str = "installoptions.shareStatistics";
/// Property naming the syslog sink host.
pub const SYSLOG_SERVER: &str = "cytoscape.remotelogging.syslogserver";
/// Property naming the syslog sink port.
pub const SYSLOG_SERVER_PORT: &str = "cytoscape.remotelogging.syslogserverport";
/// Property naming the sender address service host.
pub const SENDER_ADDRESS_SERVICE_HOSTNAME: &str =
    "cytoscape.remotelogging.senderaddressservicehostname";

/// Immutable telemetry configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Opt-in gate checked before any network I/O.
    pub enabled: bool,
    /// Syslog sink host.
    pub remote_host: SmolStr,
    /// Syslog sink port.
    pub remote_port: u16,
    /// Host answering sender address lookups.
    pub address_discovery_host: SmolStr,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            remote_host: SmolStr::new(DEFAULT_SYSLOG_SERVER_HOSTNAME),
            remote_port: DEFAULT_SYSLOG_SERVER_PORT,
            address_discovery_host: SmolStr::new(DEFAULT_SENDER_ADDRESS_SERVICE_HOSTNAME),
        }
    }
}

/// Raw property strings read from external settings.
///
/// Absent properties keep their compiled-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetryProperties {
    pub share_statistics: Option<String>,
    pub syslog_server: Option<String>,
    pub syslog_server_port: Option<String>,
    pub sender_address_service_hostname: Option<String>,
}

impl TelemetryProperties {
    /// Builds properties from dotted property keys (see the `*` constants).
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut properties = Self::default();
        for (key, value) in pairs {
            let value = Some(value.to_string());
            match key {
                SHARE_STATISTICS => properties.share_statistics = value,
                SYSLOG_SERVER => properties.syslog_server = value,
                SYSLOG_SERVER_PORT => properties.syslog_server_port = value,
                SENDER_ADDRESS_SERVICE_HOSTNAME => {
                    properties.sender_address_service_hostname = value;
                }
                _ => {}
            }
        }
        properties
    }
}

impl TelemetryConfig {
    /// Validates every property and builds a complete configuration.
    ///
    /// Fails on the first invalid property; nothing is partially applied.
    pub fn from_properties(properties: &TelemetryProperties) -> Result<Self, TelemetryError> {
        let defaults = Self::default();
        let enabled = properties
            .share_statistics
            .as_deref()
            .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"));
        let remote_port = match properties.syslog_server_port.as_deref() {
            Some(text) => parse_port(text)?,
            None => defaults.remote_port,
        };
        let remote_host = match properties.syslog_server.as_deref() {
            Some(text) => resolve_host(text)?,
            None => defaults.remote_host,
        };
        let address_discovery_host = match properties.sender_address_service_hostname.as_deref() {
            Some(text) => parse_hostname(text)?,
            None => defaults.address_discovery_host,
        };
        Ok(Self {
            enabled,
            remote_host,
            remote_port,
            address_discovery_host,
        })
    }
}

fn parse_port(text: &str) -> Result<u16, TelemetryError> {
    let trimmed = text.trim();
    match trimmed.parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(TelemetryError::InvalidPort(trimmed.into())),
    }
}

fn parse_hostname(text: &str) -> Result<SmolStr, TelemetryError> {
    let trimmed = text.trim();
    let malformed = trimmed.is_empty()
        || trimmed
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#'));
    if malformed {
        return Err(TelemetryError::InvalidHostname(trimmed.into()));
    }
    Ok(SmolStr::new(trimmed))
}

fn resolve_host(text: &str) -> Result<SmolStr, TelemetryError> {
    let host = parse_hostname(text)?;
    let resolves = (host.as_str(), 0)
        .to_socket_addrs()
        .map(|mut addrs| addrs.next().is_some())
        .unwrap_or(false);
    if !resolves {
        return Err(TelemetryError::UnresolvableHost(host));
    }
    Ok(host)
}

/// Shared telemetry configuration, swapped as a whole on every update.
#[derive(Debug)]
pub struct TelemetrySettings {
    current: RwLock<Arc<TelemetryConfig>>,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self::new(TelemetryConfig::default())
    }
}

impl TelemetrySettings {
    #[must_use]
    pub fn new(config: TelemetryConfig) -> Self {
        Self {
            current: RwLock::new(Arc::new(config)),
        }
    }

    /// Returns the configuration in effect right now.
    pub fn snapshot(&self) -> Arc<TelemetryConfig> {
        self.current.read().clone()
    }

    /// Applies a configuration load from external settings.
    ///
    /// All-or-nothing: on failure every setting falls back to its default.
    pub fn reload(
        &self,
        properties: &TelemetryProperties,
    ) -> Result<Arc<TelemetryConfig>, TelemetryError> {
        match TelemetryConfig::from_properties(properties) {
            Ok(config) => {
                info!(
                    enabled = config.enabled,
                    host = %config.remote_host,
                    port = config.remote_port,
                    discovery = %config.address_discovery_host,
                    "telemetry settings reloaded"
                );
                let config = Arc::new(config);
                *self.current.write() = config.clone();
                Ok(config)
            }
            Err(err) => {
                error!("Could not configure syslog server from properties: {err}");
                self.reset();
                Err(err)
            }
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        let mut guard = self.current.write();
        if guard.enabled != enabled {
            let mut next = TelemetryConfig::clone(&guard);
            next.enabled = enabled;
            *guard = Arc::new(next);
        }
    }

    /// Restores the compiled-in defaults for every setting.
    pub fn reset(&self) {
        *self.current.write() = Arc::new(TelemetryConfig::default());
    }
}
