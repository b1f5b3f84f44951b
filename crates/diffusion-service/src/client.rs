//! Remote diffusion service client and the unit of work built on it.

#![allow(missing_docs)]

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use smol_str::SmolStr;
use thiserror::Error;
use tracing::{info, warn};

use diffusion_telemetry::RemoteLogger;

use crate::bridge::POST;
use crate::config::RemoteServiceConfig;
use crate::envelope::ErrorRecord;
use crate::registry::MemoryRegistry;
use crate::resolver::Target;
use crate::task::{ExecutionContext, TaskFault, UnitOfWork, HEAT_COLUMN_NAME, TIME};

/// Heat column used when a request carries no options.
pub const DEFAULT_HEAT_COLUMN: &str = "diffusion_input";
/// Diffusion time used when a request carries no options.
pub const DEFAULT_TIME: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceCallError {
    /// The service answered with envelope errors.
    #[error("diffusion service rejected the request with status {status}")]
    Rejected {
        status: u16,
        errors: Vec<ErrorRecord>,
    },
    #[error("diffusion service unreachable: {0}")]
    Transport(SmolStr),
    #[error("invalid diffusion service reply: {0}")]
    InvalidReply(SmolStr),
}

#[derive(Debug, Deserialize)]
struct ServiceReply {
    #[serde(default)]
    data: Value,
    #[serde(default)]
    errors: Vec<ErrorRecord>,
}

/// Interprets a service reply body; envelope errors win over the status.
pub fn parse_reply(status: u16, body: &str) -> Result<Value, ServiceCallError> {
    let reply: ServiceReply = serde_json::from_str(body)
        .map_err(|err| ServiceCallError::InvalidReply(format!("status {status}: {err}").into()))?;
    if !reply.errors.is_empty() {
        return Err(ServiceCallError::Rejected {
            status,
            errors: reply.errors,
        });
    }
    if !(200..300).contains(&status) {
        return Err(ServiceCallError::InvalidReply(
            format!("status {status} without errors").into(),
        ));
    }
    Ok(reply.data)
}

pub struct DiffusionClient {
    agent: ureq::Agent,
    url: SmolStr,
}

impl DiffusionClient {
    #[must_use]
    pub fn new(config: &RemoteServiceConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(config.timeout)
            .timeout_read(config.timeout)
            .build();
        Self {
            agent,
            url: config.url.clone(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Posts one network document and returns the service's `data` payload.
    pub fn diffuse(
        &self,
        network: &Value,
        heat_column_name: &str,
        time: f64,
    ) -> Result<Value, ServiceCallError> {
        let body = json!({
            "network": network,
            "parameters": { HEAT_COLUMN_NAME: heat_column_name, TIME: time },
        });
        let response = self
            .agent
            .post(&self.url)
            .set("Content-Type", "application/json")
            .send_string(&body.to_string());
        let (status, response) = match response {
            Ok(response) => (response.status(), response),
            Err(ureq::Error::Status(status, response)) => (status, response),
            Err(err) => return Err(ServiceCallError::Transport(err.to_string().into())),
        };
        let text = response
            .into_string()
            .map_err(|err| ServiceCallError::InvalidReply(err.to_string().into()))?;
        parse_reply(status, &text)
    }
}

/// Unit of work that runs diffusion on the remote service.
pub struct ServiceTask {
    client: DiffusionClient,
    registry: Arc<MemoryRegistry>,
    telemetry: Arc<RemoteLogger>,
}

impl ServiceTask {
    #[must_use]
    pub fn new(
        client: DiffusionClient,
        registry: Arc<MemoryRegistry>,
        telemetry: Arc<RemoteLogger>,
    ) -> Self {
        Self {
            client,
            registry,
            telemetry,
        }
    }
}

impl UnitOfWork for ServiceTask {
    fn run(&self, target: &Target, context: &ExecutionContext) -> Result<(), TaskFault> {
        let heat_column = context.selected(HEAT_COLUMN_NAME).unwrap_or(DEFAULT_HEAT_COLUMN);
        let time = context.number(TIME).unwrap_or(DEFAULT_TIME);
        let network_suid = target.network.suid;
        let document = self.registry.document(network_suid).unwrap_or(Value::Null);

        match self.client.diffuse(&document, heat_column, time) {
            Ok(result) => {
                info!(
                    network = network_suid,
                    view = target.view.suid,
                    heat_column,
                    time,
                    "diffusion completed"
                );
                self.registry.record_result(network_suid, result);
                Ok(())
            }
            Err(ServiceCallError::Rejected { status, errors }) => {
                warn!(status, count = errors.len(), "diffusion service returned errors");
                let reported: Vec<(u16, &str)> = errors
                    .iter()
                    .map(|record| (record.status, record.error_type.as_str()))
                    .collect();
                self.telemetry
                    .log_service_errors(self.client.url(), POST, &reported);
                Err(TaskFault::Service(errors))
            }
            Err(err) => Err(TaskFault::Execution(err.to_string().into())),
        }
    }
}
