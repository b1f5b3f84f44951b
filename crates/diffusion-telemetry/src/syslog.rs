//! RFC 5424 syslog message construction.

#![allow(missing_docs)]

use std::fmt::Write as _;

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Application name stamped on every record.
pub const APP_NAME: &str = "cytoscape";
/// Structured data element id carrying the record fields.
pub const SD_ID: &str = "diffusion@cytoscape";

const NIL: &str = "-";

/// Syslog facility codes used by this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facility {
    /// User-level messages.
    User = 1,
}

/// Syslog severity codes used by this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Informational messages.
    Informational = 6,
}

/// One syslog record with a single structured data element.
#[derive(Debug, Clone)]
pub struct SyslogMessage {
    pub(crate) timestamp: OffsetDateTime,
    pub(crate) facility: Facility,
    pub(crate) severity: Severity,
    pub(crate) hostname: String,
    pub(crate) params: Vec<(String, String)>,
}

impl SyslogMessage {
    /// Informational user-facility record stamped with the current time.
    #[must_use]
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            timestamp: OffsetDateTime::now_utc(),
            facility: Facility::User,
            severity: Severity::Informational,
            hostname: hostname.into(),
            params: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: OffsetDateTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Appends a structured data parameter; order is preserved on the wire.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Field values in wire order.
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    fn priority(&self) -> u8 {
        (self.facility as u8) * 8 + self.severity as u8
    }

    /// Renders the record as an RFC 5424 line (no trailing newline).
    #[must_use]
    pub fn encode(&self) -> String {
        let timestamp = self
            .timestamp
            .format(&Rfc3339)
            .unwrap_or_else(|_| NIL.to_string());
        let hostname = if self.hostname.is_empty() {
            NIL
        } else {
            self.hostname.as_str()
        };
        let mut line = format!(
            "<{}>1 {timestamp} {hostname} {APP_NAME} {NIL} {NIL} [{SD_ID}",
            self.priority()
        );
        for (name, value) in &self.params {
            let _ = write!(line, " {name}=\"{}\"", escape_param_value(value));
        }
        line.push_str("] ");
        line.push_str(NIL);
        line
    }
}

/// Escapes the three characters RFC 5424 reserves inside PARAM-VALUE.
fn escape_param_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | '\\' | ']') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
