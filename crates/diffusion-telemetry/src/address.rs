//! Sender (public) address discovery and caching.

#![allow(missing_docs)]

use std::time::Duration;

use once_cell::sync::OnceCell;
use serde_json::Value;
use tracing::debug;

use crate::error::TelemetryError;

/// Returned whenever discovery has not succeeded yet.
pub const UNKNOWN_ADDRESS: &str = "0.0.0.0";

const SENDER_ADDRESS_FIELD: &str = "sender_address";

/// Looks up the outbound public address of this process.
pub trait AddressLookup: Send + Sync {
    /// Queries `host` once; no caching at this level.
    fn lookup(&self, host: &str) -> Result<String, TelemetryError>;
}

/// Queries `http://<host>` and reads `sender_address` from the JSON body.
pub struct HttpAddressLookup {
    agent: ureq::Agent,
}

impl HttpAddressLookup {
    #[must_use]
    pub fn new(connect_timeout: Duration, read_timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(connect_timeout)
            .timeout_read(read_timeout)
            .build();
        Self { agent }
    }
}

impl Default for HttpAddressLookup {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_millis(800))
    }
}

impl AddressLookup for HttpAddressLookup {
    fn lookup(&self, host: &str) -> Result<String, TelemetryError> {
        let url = format!("http://{host}");
        let response = self
            .agent
            .get(&url)
            .call()
            .map_err(|err| TelemetryError::Discovery(format!("{url}: {err}").into()))?;
        let body = response
            .into_string()
            .map_err(|err| TelemetryError::Discovery(format!("{url}: {err}").into()))?;
        parse_sender_address(&body)
    }
}

/// Extracts the sender address field from a discovery response body.
pub fn parse_sender_address(body: &str) -> Result<String, TelemetryError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|err| TelemetryError::MalformedResponse(err.to_string().into()))?;
    value
        .get(SENDER_ADDRESS_FIELD)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .map(str::to_string)
        .ok_or_else(|| TelemetryError::MalformedResponse("missing sender_address".into()))
}

/// Process-lifetime cache of the first successfully discovered address.
///
/// Failures are never cached: every call retries until one lookup succeeds.
#[derive(Debug, Default)]
pub struct SenderAddress {
    cached: OnceCell<String>,
}

impl SenderAddress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached address, or a fresh lookup; [`UNKNOWN_ADDRESS`] on failure.
    pub fn resolve(&self, lookup: &dyn AddressLookup, host: &str) -> String {
        if let Some(address) = self.cached.get() {
            return address.clone();
        }
        match lookup.lookup(host) {
            Ok(address) => self.cached.get_or_init(|| address).clone(),
            Err(err) => {
                debug!("sender address discovery via {host} failed: {err}");
                UNKNOWN_ADDRESS.to_string()
            }
        }
    }

    pub fn cached(&self) -> Option<&str> {
        self.cached.get().map(String::as_str)
    }
}
