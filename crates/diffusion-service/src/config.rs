//! Service configuration (`diffusion.toml`).

#![allow(missing_docs)]

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use smol_str::SmolStr;

use diffusion_telemetry::TelemetryProperties;

use crate::error::ServiceError;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:1234";
pub const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:8080/v1";
pub const DEFAULT_SERVICE_TIMEOUT_MS: u64 = 60_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebConfig {
    pub enabled: bool,
    pub listen: SmolStr,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen: SmolStr::new(DEFAULT_LISTEN),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteServiceConfig {
    pub url: SmolStr,
    pub timeout: Duration,
}

impl Default for RemoteServiceConfig {
    fn default() -> Self {
        Self {
            url: SmolStr::new(DEFAULT_SERVICE_URL),
            timeout: Duration::from_millis(DEFAULT_SERVICE_TIMEOUT_MS),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceConfig {
    pub web: WebConfig,
    /// Default `tracing` directive, e.g. `info`.
    pub log_level: Option<SmolStr>,
    pub service: RemoteServiceConfig,
    /// Raw telemetry properties, validated by the telemetry settings reload.
    pub telemetry: TelemetryProperties,
}

impl ServiceConfig {
    /// Loads `path`; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ServiceError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|err| {
            ServiceError::InvalidConfig(format!("{}: {err}", path.display()).into())
        })?;
        Self::from_contents(&text)
    }

    pub fn from_contents(text: &str) -> Result<Self, ServiceError> {
        let raw: ServiceToml = toml::from_str(text)
            .map_err(|err| ServiceError::InvalidConfig(format!("diffusion.toml: {err}").into()))?;
        raw.into_config()
    }
}

#[derive(Debug, Default, Deserialize)]
struct ServiceToml {
    web: Option<WebSection>,
    log: Option<LogSection>,
    service: Option<RemoteServiceSection>,
    telemetry: Option<TelemetrySection>,
}

#[derive(Debug, Deserialize)]
struct WebSection {
    enabled: Option<bool>,
    listen: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LogSection {
    level: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RemoteServiceSection {
    url: Option<String>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TelemetrySection {
    share_statistics: Option<PropertyValue>,
    syslog_server: Option<PropertyValue>,
    syslog_server_port: Option<PropertyValue>,
    sender_address_service_hostname: Option<PropertyValue>,
}

/// Property values are strings; integers and booleans are accepted as-is.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PropertyValue {
    Text(String),
    Integer(i64),
    Bool(bool),
}

impl PropertyValue {
    fn into_string(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Integer(value) => value.to_string(),
            Self::Bool(value) => value.to_string(),
        }
    }
}

impl ServiceToml {
    fn into_config(self) -> Result<ServiceConfig, ServiceError> {
        let web = match self.web {
            Some(section) => WebConfig {
                enabled: section.enabled.unwrap_or(true),
                listen: section
                    .listen
                    .map_or_else(|| SmolStr::new(DEFAULT_LISTEN), SmolStr::from),
            },
            None => WebConfig::default(),
        };
        if web.listen.trim().is_empty() {
            return Err(ServiceError::InvalidConfig(
                "web.listen must not be empty".into(),
            ));
        }

        let service = match self.service {
            Some(section) => {
                let timeout_ms = section.timeout_ms.unwrap_or(DEFAULT_SERVICE_TIMEOUT_MS);
                if timeout_ms == 0 {
                    return Err(ServiceError::InvalidConfig(
                        "service.timeout_ms must be greater than zero".into(),
                    ));
                }
                RemoteServiceConfig {
                    url: section
                        .url
                        .map_or_else(|| SmolStr::new(DEFAULT_SERVICE_URL), SmolStr::from),
                    timeout: Duration::from_millis(timeout_ms),
                }
            }
            None => RemoteServiceConfig::default(),
        };

        let telemetry = self
            .telemetry
            .map(|section| TelemetryProperties {
                share_statistics: section.share_statistics.map(PropertyValue::into_string),
                syslog_server: section.syslog_server.map(PropertyValue::into_string),
                syslog_server_port: section.syslog_server_port.map(PropertyValue::into_string),
                sender_address_service_hostname: section
                    .sender_address_service_hostname
                    .map(PropertyValue::into_string),
            })
            .unwrap_or_default();

        Ok(ServiceConfig {
            web,
            log_level: self.log.and_then(|log| log.level).map(SmolStr::from),
            service,
            telemetry,
        })
    }
}
