use std::sync::Arc;
use std::thread;

use diffusion_telemetry::config::{
    TelemetryConfig, TelemetryProperties, TelemetrySettings, DEFAULT_SYSLOG_SERVER_PORT,
};
use diffusion_telemetry::TelemetryError;

fn valid_properties() -> TelemetryProperties {
    TelemetryProperties {
        share_statistics: Some("true".into()),
        syslog_server: Some("127.0.0.1".into()),
        syslog_server_port: Some("6514".into()),
        sender_address_service_hostname: Some("localhost:8099".into()),
    }
}

#[test]
fn reload_applies_every_setting() {
    let settings = TelemetrySettings::default();
    let applied = settings.reload(&valid_properties()).expect("reload");

    assert_eq!(
        *applied,
        TelemetryConfig {
            enabled: true,
            remote_host: "127.0.0.1".into(),
            remote_port: 6514,
            address_discovery_host: "localhost:8099".into(),
        }
    );
    assert_eq!(settings.snapshot(), applied);
}

#[test]
fn malformed_port_leaves_defaults_in_effect() {
    let settings = TelemetrySettings::default();
    let before = settings.snapshot();

    let mut properties = valid_properties();
    properties.syslog_server_port = Some("syslog".into());
    let result = settings.reload(&properties);

    assert_eq!(result, Err(TelemetryError::InvalidPort("syslog".into())));
    assert_eq!(*settings.snapshot(), *before);
    assert!(!settings.snapshot().enabled);
    assert_eq!(settings.snapshot().remote_port, DEFAULT_SYSLOG_SERVER_PORT);
}

#[test]
fn failed_reload_after_successful_one_falls_back_to_defaults() {
    let settings = TelemetrySettings::default();
    let first = settings.reload(&valid_properties()).expect("first reload");
    assert!(first.enabled);

    let mut broken = valid_properties();
    broken.syslog_server = Some("127.0.0.2".into());
    broken.sender_address_service_hostname = Some("bad host".into());
    assert!(settings.reload(&broken).is_err());

    assert_eq!(*settings.snapshot(), TelemetryConfig::default());
    assert!(!settings.snapshot().enabled);
}

#[test]
fn reset_restores_compiled_in_defaults() {
    let settings = TelemetrySettings::default();
    settings.reload(&valid_properties()).expect("reload");
    settings.reset();
    assert_eq!(*settings.snapshot(), TelemetryConfig::default());
}

#[test]
fn concurrent_readers_never_observe_a_mixed_configuration() {
    let settings = Arc::new(TelemetrySettings::default());
    let defaults = TelemetryConfig::default();
    let reloaded = TelemetryConfig::from_properties(&valid_properties()).expect("config");

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let settings = settings.clone();
            let defaults = defaults.clone();
            let reloaded = reloaded.clone();
            thread::spawn(move || {
                for _ in 0..2_000 {
                    let snapshot = settings.snapshot();
                    assert!(*snapshot == defaults || *snapshot == reloaded);
                }
            })
        })
        .collect();

    for _ in 0..200 {
        settings.reload(&valid_properties()).expect("reload");
        settings.reset();
    }
    for reader in readers {
        reader.join().expect("reader thread");
    }
}
