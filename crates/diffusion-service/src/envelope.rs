//! Response envelope and error records.
//!
//! Pure construction helpers: no I/O and no shared state.

use serde::{Deserialize, Serialize};

/// Root namespace of every error identifier.
pub const ERROR_ROOT: &str = "urn:cytoscape:ci:diffusion-app:v1";

/// Per-cause error codes appended to the identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Network (primary resource) not found.
    NetworkNotFound,
    /// Network view (dependent resource) not found.
    NetworkViewNotFound,
    /// The unit of work failed.
    TaskExecution,
}

impl ErrorCode {
    /// Numeric suffix used on the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NetworkNotFound => "1",
            ErrorCode::NetworkViewNotFound => "2",
            ErrorCode::TaskExecution => "3",
        }
    }
}

/// `<root>:<resource path>:<code>`
#[must_use]
pub fn error_type(resource_path: &str, code: ErrorCode) -> String {
    format!("{ERROR_ROOT}:{resource_path}:{}", code.as_str())
}

/// One classified failure, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// HTTP status associated with this failure.
    pub status: u16,
    /// Hierarchical error identifier.
    #[serde(rename = "type")]
    pub error_type: String,
    /// Human readable message.
    pub message: String,
}

impl ErrorRecord {
    /// Builds a record with a deterministic identifier for `resource_path`.
    #[must_use]
    pub fn new(status: u16, resource_path: &str, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status,
            error_type: error_type(resource_path, code),
            message: message.into(),
        }
    }
}

/// Placeholder payload, serialized as `{}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

/// Uniform success/error wrapper; any error makes it a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope<T> {
    /// Payload, a placeholder on failure.
    pub data: T,
    /// Error records in the order they were observed.
    #[serde(default)]
    pub errors: Vec<ErrorRecord>,
}

impl<T> ResponseEnvelope<T> {
    /// Envelope with `data` and no errors.
    pub fn new(data: T) -> Self {
        Self {
            data,
            errors: Vec::new(),
        }
    }

    /// Envelope carrying a single error.
    pub fn failure(data: T, error: ErrorRecord) -> Self {
        Self {
            data,
            errors: vec![error],
        }
    }

    /// `true` when no error was recorded.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Appends one error record.
    pub fn push_error(&mut self, error: ErrorRecord) {
        self.errors.push(error);
    }
}
