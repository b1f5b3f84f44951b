//! `diffusion-service` - HTTP execution bridge for network diffusion analysis.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Request orchestration: resolve, execute, capture, report.
pub mod bridge;
/// Remote diffusion service unit of work.
pub mod client;
/// Service configuration file loading.
pub mod config;
/// Response envelope and error records.
pub mod envelope;
/// Service errors.
pub mod error;
/// In-memory network registry.
pub mod registry;
/// Network and view resolution.
pub mod resolver;
/// Execution context and unit-of-work boundary.
pub mod task;
/// Embedded HTTP server.
pub mod web;

pub use bridge::{BridgeResponse, DiffusionRoute, ExecutionBridge};
pub use envelope::{Empty, ErrorCode, ErrorRecord, ResponseEnvelope};
pub use resolver::{NetworkHandle, NetworkRegistry, Target, TargetIds, TargetResolver, ViewHandle};
pub use task::{DiffusionParameters, ExecutionContext, TaskFault, UnitOfWork};
