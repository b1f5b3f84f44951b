//! Execution bridge.
//!
//! Each request runs `resolve -> execute -> capture -> report` on the calling
//! thread. The envelope is final before telemetry sees it.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error};

use diffusion_telemetry::RemoteLogger;

use crate::envelope::{Empty, ErrorCode, ErrorRecord, ResponseEnvelope};
use crate::resolver::{TargetIds, TargetResolver};
use crate::task::{DiffusionParameters, ExecutionContext, TaskFault, UnitOfWork};

/// HTTP method of every diffusion route.
pub const POST: &str = "POST";

const OK: u16 = 200;
const INTERNAL_SERVER_ERROR: u16 = 500;

/// The four diffusion operations exposed over HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffusionRoute {
    /// `/{network}/views/{view}/diffuse`
    Diffuse,
    /// `/{network}/views/{view}/diffuse_with_options`
    DiffuseWithOptions,
    /// `/currentView/diffuse`
    CurrentViewDiffuse,
    /// `/currentView/diffuse_with_options`
    CurrentViewDiffuseWithOptions,
}

impl DiffusionRoute {
    /// Resource path embedded in error identifiers.
    #[must_use]
    pub fn resource_path(self) -> &'static str {
        match self {
            Self::Diffuse => "diffuse",
            Self::DiffuseWithOptions => "diffuse_with_options",
            Self::CurrentViewDiffuse => "diffuse_current_view",
            Self::CurrentViewDiffuseWithOptions => "diffuse_current_view_with_options",
        }
    }

    /// Route template reported to telemetry.
    #[must_use]
    pub fn path_template(self) -> &'static str {
        match self {
            Self::Diffuse => "/diffusion/v1/{networkSUID}/views/{networkViewSUID}/diffuse",
            Self::DiffuseWithOptions => {
                "/diffusion/v1/{networkSUID}/views/{networkViewSUID}/diffuse_with_options"
            }
            Self::CurrentViewDiffuse => "/diffusion/v1/currentView/diffuse",
            Self::CurrentViewDiffuseWithOptions => "/diffusion/v1/currentView/diffuse_with_options",
        }
    }

    /// `true` for the routes that take a parameters body.
    #[must_use]
    pub fn takes_options(self) -> bool {
        matches!(self, Self::DiffuseWithOptions | Self::CurrentViewDiffuseWithOptions)
    }
}

/// Outcome of one request: HTTP status plus the finalized envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeResponse {
    /// 200, 404 or 500.
    pub status: u16,
    /// Envelope returned to the caller.
    pub envelope: ResponseEnvelope<Empty>,
}

/// Orchestrates resolution, execution and reporting for the diffusion routes.
pub struct ExecutionBridge {
    resolver: TargetResolver,
    diffuse: Arc<dyn UnitOfWork>,
    diffuse_with_options: Arc<dyn UnitOfWork>,
    telemetry: Arc<RemoteLogger>,
}

impl ExecutionBridge {
    /// Bridge with separate units of work for the plain and options routes.
    #[must_use]
    pub fn new(
        resolver: TargetResolver,
        diffuse: Arc<dyn UnitOfWork>,
        diffuse_with_options: Arc<dyn UnitOfWork>,
        telemetry: Arc<RemoteLogger>,
    ) -> Self {
        Self {
            resolver,
            diffuse,
            diffuse_with_options,
            telemetry,
        }
    }

    /// Telemetry client shared with the rest of the service.
    pub fn telemetry(&self) -> &Arc<RemoteLogger> {
        &self.telemetry
    }

    /// Runs one request. `ids` of `None` targets the current network view.
    pub fn execute(
        &self,
        route: DiffusionRoute,
        ids: Option<TargetIds>,
        parameters: Option<&DiffusionParameters>,
    ) -> BridgeResponse {
        self.execute_with(route, ids, parameters, |_| {})
    }

    /// Like [`ExecutionBridge::execute`], handing the finalized response to
    /// `deliver` before any telemetry is sent.
    pub fn execute_with<F>(
        &self,
        route: DiffusionRoute,
        ids: Option<TargetIds>,
        parameters: Option<&DiffusionParameters>,
        deliver: F,
    ) -> BridgeResponse
    where
        F: FnOnce(&BridgeResponse),
    {
        let response = self.run(route, ids, parameters);
        deliver(&response);
        self.report(route, &response);
        response
    }

    fn run(
        &self,
        route: DiffusionRoute,
        ids: Option<TargetIds>,
        parameters: Option<&DiffusionParameters>,
    ) -> BridgeResponse {
        let resource_path = route.resource_path();
        let target = match self.resolver.resolve(resource_path, ids) {
            Ok(target) => target,
            Err(err) => {
                return BridgeResponse {
                    status: err.record.status,
                    envelope: ResponseEnvelope::failure(Empty::default(), err.record),
                };
            }
        };

        let (context, task) = match parameters {
            Some(parameters) => (
                ExecutionContext::from_parameters(parameters),
                &self.diffuse_with_options,
            ),
            None => (ExecutionContext::new(), &self.diffuse),
        };
        debug!(
            network = target.network.suid,
            view = target.view.suid,
            route = resource_path,
            "running diffusion"
        );

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| task.run(&target, &context)));
        let mut envelope = ResponseEnvelope::new(Empty::default());
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(TaskFault::Service(records))) if records.is_empty() => {
                error!("Error executing diffusion: fault reported without error records");
                envelope.push_error(task_execution_error(
                    resource_path,
                    "fault reported without error records",
                ));
            }
            Ok(Err(TaskFault::Service(records))) => {
                error!(count = records.len(), "diffusion service reported errors");
                envelope.errors.extend(records);
            }
            Ok(Err(TaskFault::Execution(message))) => {
                error!("Error executing diffusion: {message}");
                envelope.push_error(task_execution_error(resource_path, message.as_str()));
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!("Error executing diffusion: {message}");
                envelope.push_error(task_execution_error(resource_path, &message));
            }
        }

        let status = if envelope.is_success() {
            OK
        } else {
            INTERNAL_SERVER_ERROR
        };
        BridgeResponse { status, envelope }
    }

    fn report(&self, route: DiffusionRoute, response: &BridgeResponse) {
        let path = route.path_template();
        if response.envelope.is_success() {
            self.telemetry
                .log_resource_response(POST, path, response.status);
            return;
        }
        let errors: Vec<(u16, &str)> = response
            .envelope
            .errors
            .iter()
            .map(|record| (record.status, record.error_type.as_str()))
            .collect();
        self.telemetry.log_resource_errors(POST, path, &errors);
    }
}

fn task_execution_error(resource_path: &str, message: &str) -> ErrorRecord {
    ErrorRecord::new(
        INTERNAL_SERVER_ERROR,
        resource_path,
        ErrorCode::TaskExecution,
        format!("Error executing diffusion: {message}"),
    )
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unit of work panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_map_to_paths() {
        assert_eq!(DiffusionRoute::Diffuse.resource_path(), "diffuse");
        assert_eq!(
            DiffusionRoute::CurrentViewDiffuseWithOptions.resource_path(),
            "diffuse_current_view_with_options"
        );
        assert_eq!(
            DiffusionRoute::DiffuseWithOptions.path_template(),
            "/diffusion/v1/{networkSUID}/views/{networkViewSUID}/diffuse_with_options"
        );
        assert!(DiffusionRoute::CurrentViewDiffuseWithOptions.takes_options());
        assert!(!DiffusionRoute::CurrentViewDiffuse.takes_options());
    }

    #[test]
    fn panic_payloads_become_messages() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "unit of work panicked");
    }
}
