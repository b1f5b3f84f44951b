//! Remote logger facade.
//!
//! Every entry point is best-effort: the enablement gate is checked before
//! any discovery or message construction, and every fault (including a
//! panic inside a lookup or transport implementation) ends as a local
//! `tracing` diagnostic.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::error;

use crate::address::{AddressLookup, HttpAddressLookup, SenderAddress};
use crate::config::{TelemetryConfig, TelemetrySettings};
use crate::error::TelemetryError;
use crate::syslog::SyslogMessage;
use crate::transport::{Transport, UdpTransport};

/// Process identifier field (`<pid>@<host>`) prepended to every record.
///
/// Keyed `jvmName` for compatibility with the existing collector.
pub const PROCESS_NAME: &str = "jvmName";
/// Sender address field prepended to every record.
pub const PUBLIC_IP: &str = "publicIP";
/// HTTP method field.
pub const HTTP_METHOD: &str = "httpMethod";
/// Request path field.
pub const PATH: &str = "path";
/// Response status field.
pub const RESPONSE_CODE: &str = "responseCode";
/// Error identifier field.
pub const ERROR_TYPE: &str = "errorType";
/// Remote service URL field.
pub const SERVICE_URL: &str = "serviceUrl";

/// Sends structured telemetry records to the configured syslog sink.
pub struct RemoteLogger {
    settings: Arc<TelemetrySettings>,
    sender_address: SenderAddress,
    lookup: Box<dyn AddressLookup>,
    transport: Box<dyn Transport>,
    hostname: String,
    process_name: String,
}

impl RemoteLogger {
    /// Logger using HTTP discovery and UDP delivery.
    #[must_use]
    pub fn new(settings: Arc<TelemetrySettings>) -> Self {
        Self::with_parts(
            settings,
            Box::new(HttpAddressLookup::default()),
            Box::new(UdpTransport::default()),
        )
    }

    /// Logger with explicit discovery and delivery implementations.
    #[must_use]
    pub fn with_parts(
        settings: Arc<TelemetrySettings>,
        lookup: Box<dyn AddressLookup>,
        transport: Box<dyn Transport>,
    ) -> Self {
        let hostname = std::env::var("HOSTNAME").unwrap_or_default();
        let process_host = if hostname.is_empty() {
            "localhost"
        } else {
            hostname.as_str()
        };
        let process_name = format!("{}@{process_host}", std::process::id());
        Self {
            settings,
            sender_address: SenderAddress::new(),
            lookup,
            transport,
            hostname,
            process_name,
        }
    }

    /// Shared settings handle, used for reloads.
    pub fn settings(&self) -> &Arc<TelemetrySettings> {
        &self.settings
    }

    /// Current value of the opt-in gate.
    pub fn is_enabled(&self) -> bool {
        self.settings.snapshot().enabled
    }

    /// `<pid>@<hostname>` identifier stamped on every record.
    pub fn process_name(&self) -> &str {
        &self.process_name
    }

    /// Discovered sender address, retried on every call until one succeeds.
    pub fn public_address(&self) -> String {
        let config = self.settings.snapshot();
        self.sender_address
            .resolve(self.lookup.as_ref(), &config.address_discovery_host)
    }

    /// Sends one record with the caller's fields; never fails.
    pub fn log(&self, fields: &[(&str, &str)]) {
        self.log_batch(&[fields]);
    }

    /// Sends several records sharing one sender address lookup.
    pub fn log_batch(&self, records: &[&[(&str, &str)]]) {
        let config = self.settings.snapshot();
        if !config.enabled || records.is_empty() {
            return;
        }
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let public_ip = self
                .sender_address
                .resolve(self.lookup.as_ref(), &config.address_discovery_host);
            for fields in records {
                if let Err(err) = self.send(&config, &public_ip, fields) {
                    error!("Error sending message: {err}");
                }
            }
        }));
        if outcome.is_err() {
            error!("Error sending message: telemetry sender panicked");
        }
    }

    /// Reports a completed request.
    pub fn log_resource_response(&self, http_method: &str, path: &str, response_code: u16) {
        let code = response_code.to_string();
        self.log(&[
            (HTTP_METHOD, http_method),
            (PATH, path),
            (RESPONSE_CODE, code.as_str()),
        ]);
    }

    /// Reports one error record of a failed request.
    pub fn log_resource_error(
        &self,
        http_method: &str,
        path: &str,
        response_code: u16,
        error_type: &str,
    ) {
        let code = response_code.to_string();
        self.log(&[
            (HTTP_METHOD, http_method),
            (PATH, path),
            (RESPONSE_CODE, code.as_str()),
            (ERROR_TYPE, error_type),
        ]);
    }

    /// Reports every error record of one failed request.
    pub fn log_resource_errors(&self, http_method: &str, path: &str, errors: &[(u16, &str)]) {
        self.log_errors(&[(HTTP_METHOD, http_method), (PATH, path)], errors);
    }

    /// Reports every error returned by one remote service call.
    pub fn log_service_errors(&self, service_url: &str, http_method: &str, errors: &[(u16, &str)]) {
        self.log_errors(&[(SERVICE_URL, service_url), (HTTP_METHOD, http_method)], errors);
    }

    /// Reports a failed call to a remote service made on behalf of a request.
    pub fn log_service_error(
        &self,
        service_url: &str,
        http_method: &str,
        response_code: u16,
        error_type: &str,
    ) {
        let code = response_code.to_string();
        self.log(&[
            (SERVICE_URL, service_url),
            (HTTP_METHOD, http_method),
            (RESPONSE_CODE, code.as_str()),
            (ERROR_TYPE, error_type),
        ]);
    }

    fn log_errors(&self, leading: &[(&str, &str)], errors: &[(u16, &str)]) {
        let codes: Vec<String> = errors.iter().map(|(code, _)| code.to_string()).collect();
        let records: Vec<Vec<(&str, &str)>> = errors
            .iter()
            .zip(&codes)
            .map(|((_, error_type), code)| {
                let mut fields: Vec<(&str, &str)> = leading.to_vec();
                fields.push((RESPONSE_CODE, code.as_str()));
                fields.push((ERROR_TYPE, *error_type));
                fields
            })
            .collect();
        let records: Vec<&[(&str, &str)]> = records.iter().map(Vec::as_slice).collect();
        self.log_batch(&records);
    }

    fn send(
        &self,
        config: &TelemetryConfig,
        public_ip: &str,
        fields: &[(&str, &str)],
    ) -> Result<(), TelemetryError> {
        let mut message = SyslogMessage::new(self.hostname.as_str())
            .with_param(PROCESS_NAME, self.process_name.as_str())
            .with_param(PUBLIC_IP, public_ip);
        for (name, value) in fields {
            message = message.with_param(*name, *value);
        }
        let payload = message.encode();
        self.transport
            .send(&config.remote_host, config.remote_port, payload.as_bytes())
    }
}
