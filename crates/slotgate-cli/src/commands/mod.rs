//! CLI command definitions and dispatch.

pub mod clean;
pub mod keys;
pub mod run;
pub mod status;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use slotgate_core::config::GateConfig;
use slotgate_core::error::GateError;
use slotgate_limiter::Gate;

/// Slotgate: distributed concurrency limits over a shared store
#[derive(Debug, Parser)]
#[command(name = "slotgate", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (extension optional)
    #[arg(short, long, default_value = "config/slotgate")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List bookkeeping keys matching a pattern
    Keys(keys::KeysArgs),
    /// Remove expired holders from one or more groups
    Clean(clean::CleanArgs),
    /// Show occupancy of the configured groups
    Status,
    /// Run a command while holding a slot
    Run(run::RunArgs),
}

impl Cli {
    /// Execute the CLI command and return the process exit code
    pub async fn execute(&self) -> Result<i32, GateError> {
        let config = load_config(&self.config)?;
        let gate = connect(&config).await?;

        match &self.command {
            Commands::Keys(args) => keys::execute(args, &gate, self.format).await.map(|_| 0),
            Commands::Clean(args) => clean::execute(args, &config, &gate, self.format)
                .await
                .map(|_| 0),
            Commands::Status => status::execute(&config, &gate, self.format).await.map(|_| 0),
            Commands::Run(args) => run::execute(args, &config, &gate).await,
        }
    }
}

/// Helper: load configuration from file and environment
pub fn load_config(config_path: &str) -> Result<GateConfig, GateError> {
    GateConfig::load(config_path)
}

/// Helper: connect to the configured store
pub async fn connect(config: &GateConfig) -> Result<Gate, GateError> {
    Gate::connect(&config.store).await
}
