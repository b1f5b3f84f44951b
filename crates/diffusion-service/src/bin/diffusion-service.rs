//! CLI entrypoint for the diffusion service.

#[path = "diffusion-service/cli.rs"]
mod cli;

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use diffusion_service::client::{DiffusionClient, ServiceTask};
use diffusion_service::config::ServiceConfig;
use diffusion_service::registry::MemoryRegistry;
use diffusion_service::web::start_diffusion_server;
use diffusion_service::{ExecutionBridge, TargetResolver};
use diffusion_telemetry::{RemoteLogger, TelemetrySettings};

use cli::{Cli, Command};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Serve {
            config,
            networks,
            listen,
        } => serve(&config, networks.as_deref(), listen, cli.verbose),
        Command::SendTestMessage { config } => send_test_message(&config, cli.verbose),
    }
}

fn init_logging(level: Option<&str>, verbose: bool) {
    let directive = if verbose {
        Level::DEBUG.into()
    } else {
        level
            .and_then(|level| level.parse::<Directive>().ok())
            .unwrap_or_else(|| Level::INFO.into())
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .with_writer(std::io::stderr)
        .init();
}

fn telemetry_settings(config: &ServiceConfig) -> Arc<TelemetrySettings> {
    let settings = Arc::new(TelemetrySettings::default());
    if settings.reload(&config.telemetry).is_err() {
        warn!("telemetry settings rejected; keeping defaults");
    }
    settings
}

fn serve(
    config_path: &Path,
    networks: Option<&Path>,
    listen: Option<String>,
    verbose: bool,
) -> anyhow::Result<()> {
    let mut config = ServiceConfig::load(config_path)?;
    init_logging(config.log_level.as_deref(), verbose);
    if let Some(listen) = listen {
        config.web.listen = listen.into();
    }

    let telemetry = Arc::new(RemoteLogger::new(telemetry_settings(&config)));
    let registry = Arc::new(match networks {
        Some(path) => MemoryRegistry::load(path)?,
        None => MemoryRegistry::default(),
    });
    info!(networks = registry.len(), "network registry ready");

    let task = Arc::new(ServiceTask::new(
        DiffusionClient::new(&config.service),
        registry.clone(),
        telemetry.clone(),
    ));
    let bridge = ExecutionBridge::new(
        TargetResolver::new(registry),
        task.clone(),
        task,
        telemetry,
    );
    let server = start_diffusion_server(&config.web, Arc::new(bridge))?;
    println!("diffusion-service listening on http://{}", server.listen);
    server.join()?;
    Ok(())
}

fn send_test_message(config_path: &Path, verbose: bool) -> anyhow::Result<()> {
    let config = ServiceConfig::load(config_path)?;
    init_logging(config.log_level.as_deref(), verbose);
    let settings = telemetry_settings(&config);
    settings.set_enabled(true);
    let snapshot = settings.snapshot();
    let logger = RemoteLogger::new(settings);

    let started = Instant::now();
    logger.log_resource_error("dummyHttpMethod", "dummyPath", 664, "urn:dummyurn");
    println!(
        "Sent test message to {}:{} in {} ms",
        snapshot.remote_host,
        snapshot.remote_port,
        started.elapsed().as_millis()
    );
    Ok(())
}
