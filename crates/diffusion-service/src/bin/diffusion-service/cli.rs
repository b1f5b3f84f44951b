//! CLI definitions for diffusion-service.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "diffusion-service",
    version,
    about = "Network diffusion execution bridge",
    after_help = "Examples:\n  diffusion-service serve --networks ./networks.json\n  diffusion-service serve --config ./diffusion.toml --listen 0.0.0.0:1234\n  diffusion-service send-test-message --config ./diffusion.toml"
)]
pub struct Cli {
    /// Show debug diagnostics.
    #[arg(long, short, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the diffusion routes over HTTP.
    Serve {
        /// Service configuration file.
        #[arg(long, default_value = "diffusion.toml")]
        config: PathBuf,
        /// Network registry document (JSON).
        #[arg(long)]
        networks: Option<PathBuf>,
        /// Override `[web] listen`.
        #[arg(long)]
        listen: Option<String>,
    },
    /// Send one dummy telemetry record and report how long it took.
    SendTestMessage {
        /// Service configuration file.
        #[arg(long, default_value = "diffusion.toml")]
        config: PathBuf,
    },
}
