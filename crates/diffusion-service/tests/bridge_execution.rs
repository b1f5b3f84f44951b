use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use diffusion_service::registry::{MemoryRegistry, NetworkEntry};
use diffusion_service::task::{ContextValue, HEAT_COLUMN_NAME, TIME};
use diffusion_service::{
    DiffusionParameters, DiffusionRoute, ErrorCode, ErrorRecord, ExecutionBridge,
    ExecutionContext, Target, TargetIds, TargetResolver, TaskFault, UnitOfWork,
};
use diffusion_telemetry::{
    AddressLookup, RemoteLogger, TelemetryConfig, TelemetryError, TelemetrySettings, Transport,
};

struct FixedLookup {
    calls: Arc<AtomicUsize>,
}

impl AddressLookup for FixedLookup {
    fn lookup(&self, _host: &str) -> Result<String, TelemetryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("203.0.113.7".to_string())
    }
}

#[derive(Default)]
struct RecordingTransport {
    sent: Arc<Mutex<Vec<String>>>,
    calls: Arc<AtomicUsize>,
    fail: bool,
}

impl Transport for RecordingTransport {
    fn send(&self, _host: &str, _port: u16, payload: &[u8]) -> Result<(), TelemetryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(TelemetryError::Transport("sink down".into()));
        }
        self.sent
            .lock()
            .expect("sent lock")
            .push(String::from_utf8_lossy(payload).into_owned());
        Ok(())
    }
}

/// Unit of work with a scripted outcome that remembers the contexts it saw.
struct ScriptedTask {
    outcome: Outcome,
    contexts: Mutex<Vec<ExecutionContext>>,
}

#[derive(Clone)]
enum Outcome {
    Complete,
    ServiceErrors(usize),
    Fail(&'static str),
    Panic,
}

impl ScriptedTask {
    fn new(outcome: Outcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            contexts: Mutex::new(Vec::new()),
        })
    }

    fn runs(&self) -> usize {
        self.contexts.lock().expect("contexts lock").len()
    }
}

impl UnitOfWork for ScriptedTask {
    fn run(&self, _target: &Target, context: &ExecutionContext) -> Result<(), TaskFault> {
        self.contexts
            .lock()
            .expect("contexts lock")
            .push(context.clone());
        match self.outcome.clone() {
            Outcome::Complete => Ok(()),
            Outcome::ServiceErrors(count) => Err(TaskFault::Service(
                (0..count)
                    .map(|index| ErrorRecord {
                        status: 500,
                        error_type: format!("urn:cytoscape:ci:diffusion-service:v1:diffuse:{index}"),
                        message: format!("service failure {index}"),
                    })
                    .collect(),
            )),
            Outcome::Fail(message) => Err(TaskFault::Execution(message.into())),
            Outcome::Panic => panic!("diffusion kernel crashed"),
        }
    }
}

struct Harness {
    bridge: ExecutionBridge,
    registry: Arc<MemoryRegistry>,
    sent: Arc<Mutex<Vec<String>>>,
    sends: Arc<AtomicUsize>,
    lookups: Arc<AtomicUsize>,
}

fn harness(
    diffuse: Arc<ScriptedTask>,
    with_options: Arc<ScriptedTask>,
    telemetry_enabled: bool,
    failing_sink: bool,
) -> Harness {
    let registry = Arc::new(MemoryRegistry::new(vec![
        NetworkEntry::new(101, "signaling", vec![55, 56]),
        NetworkEntry::new(202, "empty", Vec::new()),
    ]));
    let transport = RecordingTransport {
        fail: failing_sink,
        ..RecordingTransport::default()
    };
    let sent = transport.sent.clone();
    let sends = transport.calls.clone();
    let lookups = Arc::new(AtomicUsize::new(0));
    let settings = Arc::new(TelemetrySettings::new(TelemetryConfig {
        enabled: telemetry_enabled,
        remote_host: "127.0.0.1".into(),
        remote_port: 5514,
        address_discovery_host: "discovery.test".into(),
    }));
    let telemetry = Arc::new(RemoteLogger::with_parts(
        settings,
        Box::new(FixedLookup {
            calls: lookups.clone(),
        }),
        Box::new(transport),
    ));
    let bridge = ExecutionBridge::new(
        TargetResolver::new(registry.clone()),
        diffuse,
        with_options,
        telemetry,
    );
    Harness {
        bridge,
        registry,
        sent,
        sends,
        lookups,
    }
}

fn ids(network: i64, view: i64) -> Option<TargetIds> {
    Some(TargetIds { network, view })
}

#[test]
fn completed_task_returns_empty_success_envelope() {
    let diffuse = ScriptedTask::new(Outcome::Complete);
    let h = harness(diffuse.clone(), ScriptedTask::new(Outcome::Complete), true, false);

    let response = h.bridge.execute(DiffusionRoute::Diffuse, ids(101, 55), None);

    assert_eq!(response.status, 200);
    assert_eq!(
        serde_json::to_string(&response.envelope).expect("serialize"),
        r#"{"data":{},"errors":[]}"#
    );
    assert_eq!(diffuse.runs(), 1);
    let sent = h.sent.lock().expect("sent lock");
    assert_eq!(sent.len(), 1);
    assert!(sent[0]
        .contains(r#"path="/diffusion/v1/{networkSUID}/views/{networkViewSUID}/diffuse""#));
    assert!(sent[0].contains(r#"responseCode="200""#));
    assert!(!sent[0].contains("errorType="));
}

#[test]
fn network_without_views_is_not_found_and_skips_execution() {
    let diffuse = ScriptedTask::new(Outcome::Complete);
    let h = harness(diffuse.clone(), ScriptedTask::new(Outcome::Complete), false, false);

    let response = h.bridge.execute(DiffusionRoute::Diffuse, ids(202, 55), None);

    assert_eq!(response.status, 404);
    assert_eq!(response.envelope.errors.len(), 1);
    let record = &response.envelope.errors[0];
    assert_eq!(record.status, 404);
    assert_eq!(
        record.error_type,
        "urn:cytoscape:ci:diffusion-app:v1:diffuse:2"
    );
    assert_eq!(
        record.message,
        "No views are available for network with SUID: 202"
    );
    assert_eq!(diffuse.runs(), 0);
    assert_eq!(h.sends.load(Ordering::SeqCst), 0);
    assert_eq!(h.lookups.load(Ordering::SeqCst), 0);
}

#[test]
fn not_found_is_reported_once_when_telemetry_is_enabled() {
    let h = harness(
        ScriptedTask::new(Outcome::Complete),
        ScriptedTask::new(Outcome::Complete),
        true,
        false,
    );

    let response = h.bridge.execute(DiffusionRoute::Diffuse, ids(999, 55), None);

    assert_eq!(response.status, 404);
    assert!(response.envelope.errors[0]
        .error_type
        .ends_with(&format!(":diffuse:{}", ErrorCode::NetworkNotFound.as_str())));
    let sent = h.sent.lock().expect("sent lock");
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains(r#"responseCode="404""#));
}

#[test]
fn domain_fault_records_are_kept_verbatim() {
    let h = harness(
        ScriptedTask::new(Outcome::ServiceErrors(3)),
        ScriptedTask::new(Outcome::Complete),
        true,
        false,
    );

    let response = h.bridge.execute(DiffusionRoute::Diffuse, ids(101, 56), None);

    assert_eq!(response.status, 500);
    assert_eq!(response.envelope.errors.len(), 3);
    assert_eq!(response.envelope.errors[2].message, "service failure 2");
    let sent = h.sent.lock().expect("sent lock");
    assert_eq!(sent.len(), 3);
    assert!(sent[1].contains(r#"errorType="urn:cytoscape:ci:diffusion-service:v1:diffuse:1""#));
    assert_eq!(h.lookups.load(Ordering::SeqCst), 1);
}

#[test]
fn empty_domain_fault_is_reported_as_task_execution_error() {
    let h = harness(
        ScriptedTask::new(Outcome::ServiceErrors(0)),
        ScriptedTask::new(Outcome::Complete),
        true,
        false,
    );

    let response = h.bridge.execute(DiffusionRoute::Diffuse, ids(101, 55), None);

    assert_eq!(response.status, 500);
    assert!(!response.envelope.is_success());
    assert_eq!(response.envelope.errors.len(), 1);
    let record = &response.envelope.errors[0];
    assert_eq!(record.status, 500);
    assert_eq!(
        record.error_type,
        "urn:cytoscape:ci:diffusion-app:v1:diffuse:3"
    );
    assert!(record.message.starts_with("Error executing diffusion: "));
    let sent = h.sent.lock().expect("sent lock");
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains(r#"responseCode="500""#));
}

#[test]
fn response_is_delivered_before_telemetry_is_sent() {
    let h = harness(
        ScriptedTask::new(Outcome::ServiceErrors(2)),
        ScriptedTask::new(Outcome::Complete),
        true,
        false,
    );
    let seen = Mutex::new(None);

    let response = h
        .bridge
        .execute_with(DiffusionRoute::Diffuse, ids(101, 55), None, |delivered| {
            *seen.lock().expect("seen lock") = Some((
                delivered.status,
                h.sends.load(Ordering::SeqCst),
                h.lookups.load(Ordering::SeqCst),
            ));
        });

    assert_eq!(*seen.lock().expect("seen lock"), Some((500, 0, 0)));
    assert_eq!(response.status, 500);
    assert_eq!(h.sends.load(Ordering::SeqCst), 2);
    assert_eq!(h.lookups.load(Ordering::SeqCst), 1);
}

#[test]
fn generic_fault_collapses_to_one_task_execution_error() {
    let h = harness(
        ScriptedTask::new(Outcome::Fail("service unavailable")),
        ScriptedTask::new(Outcome::Complete),
        false,
        false,
    );

    let response = h.bridge.execute(DiffusionRoute::Diffuse, ids(101, 55), None);

    assert_eq!(response.status, 500);
    assert_eq!(response.envelope.errors.len(), 1);
    let record = &response.envelope.errors[0];
    assert_eq!(record.status, 500);
    assert_eq!(
        record.error_type,
        "urn:cytoscape:ci:diffusion-app:v1:diffuse:3"
    );
    assert_eq!(
        record.message,
        "Error executing diffusion: service unavailable"
    );
}

#[test]
fn panicking_task_is_reported_as_task_execution_error() {
    let h = harness(
        ScriptedTask::new(Outcome::Complete),
        ScriptedTask::new(Outcome::Panic),
        true,
        false,
    );
    h.registry.set_current(Some(101), Some(55));
    let parameters = DiffusionParameters {
        heat_column_name: "expression".to_string(),
        time: 0.5,
    };

    let response = h.bridge.execute(
        DiffusionRoute::CurrentViewDiffuseWithOptions,
        None,
        Some(&parameters),
    );

    assert_eq!(response.status, 500);
    assert_eq!(response.envelope.errors.len(), 1);
    assert_eq!(
        response.envelope.errors[0].error_type,
        "urn:cytoscape:ci:diffusion-app:v1:diffuse_current_view_with_options:3"
    );
    assert!(response.envelope.errors[0]
        .message
        .contains("diffusion kernel crashed"));
    assert_eq!(h.sent.lock().expect("sent lock").len(), 1);
}

#[test]
fn options_route_runs_options_task_with_mapped_context() {
    let diffuse = ScriptedTask::new(Outcome::Complete);
    let with_options = ScriptedTask::new(Outcome::Complete);
    let h = harness(diffuse.clone(), with_options.clone(), false, false);
    let parameters = DiffusionParameters {
        heat_column_name: "expression".to_string(),
        time: 0.25,
    };

    let response = h.bridge.execute(
        DiffusionRoute::DiffuseWithOptions,
        ids(101, 55),
        Some(&parameters),
    );

    assert_eq!(response.status, 200);
    assert_eq!(diffuse.runs(), 0);
    let contexts = with_options.contexts.lock().expect("contexts lock");
    assert_eq!(contexts.len(), 1);
    assert_eq!(contexts[0].selected(HEAT_COLUMN_NAME), Some("expression"));
    assert_eq!(contexts[0].get(TIME), Some(&ContextValue::Number(0.25)));
}

#[test]
fn telemetry_send_failure_does_not_change_the_response() {
    let h = harness(
        ScriptedTask::new(Outcome::Complete),
        ScriptedTask::new(Outcome::Complete),
        true,
        true,
    );

    let response = h.bridge.execute(DiffusionRoute::Diffuse, ids(101, 55), None);

    assert_eq!(response.status, 200);
    assert!(response.envelope.is_success());
    assert_eq!(h.sends.load(Ordering::SeqCst), 1);
}

#[test]
fn current_view_without_selection_uses_network_code() {
    let h = harness(
        ScriptedTask::new(Outcome::Complete),
        ScriptedTask::new(Outcome::Complete),
        false,
        false,
    );

    let response = h
        .bridge
        .execute(DiffusionRoute::CurrentViewDiffuse, None, None);

    assert_eq!(response.status, 404);
    assert_eq!(
        response.envelope.errors[0].error_type,
        "urn:cytoscape:ci:diffusion-app:v1:diffuse_current_view:1"
    );
    assert_eq!(
        response.envelope.errors[0].message,
        "Could not find current Network"
    );
}
