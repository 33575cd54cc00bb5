//! Run an external command under a concurrency limit.

use std::time::Duration;

use clap::Args;
use tokio::process::Command;
use tracing::info;

use slotgate_core::config::GateConfig;
use slotgate_core::error::GateError;
use slotgate_core::types::LimitDescriptor;
use slotgate_limiter::Gate;

/// Arguments for the run command
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Concurrency group key
    #[arg(short, long)]
    pub key: String,

    /// Maximum concurrent holders (required unless the key is configured)
    #[arg(short, long)]
    pub limit: Option<u32>,

    /// Seconds to wait for a slot
    #[arg(short, long)]
    pub timeout: Option<f64>,

    /// Lease length in seconds
    #[arg(long)]
    pub lease: Option<u64>,

    /// Program and arguments to run
    #[arg(trailing_var_arg = true, required = true)]
    pub command: Vec<String>,
}

/// Build the descriptor from configuration, overridden by flags.
fn resolve_descriptor(args: &RunArgs, config: &GateConfig) -> Result<LimitDescriptor, GateError> {
    let mut descriptor = match (config.find_limit(&args.key), args.limit) {
        (Some(configured), None) => configured,
        (Some(configured), Some(limit)) => LimitDescriptor { limit, ..configured },
        (None, Some(limit)) => LimitDescriptor::new(args.key.clone(), limit),
        (None, None) => {
            return Err(GateError::validation(format!(
                "'{}' is not configured; pass --limit",
                args.key
            )));
        }
    };

    if let Some(timeout) = args.timeout {
        let timeout = Duration::try_from_secs_f64(timeout)
            .map_err(|e| GateError::validation(format!("Invalid timeout: {e}")))?;
        descriptor = descriptor.with_timeout(timeout);
    }
    if let Some(lease) = args.lease {
        descriptor = descriptor.with_lease(Duration::from_secs(lease));
    }

    descriptor.validate()?;
    Ok(descriptor)
}

/// Execute the run command, returning the child's exit code
pub async fn execute(args: &RunArgs, config: &GateConfig, gate: &Gate) -> Result<i32, GateError> {
    let descriptor = resolve_descriptor(args, config)?;
    let (program, program_args) = args
        .command
        .split_first()
        .ok_or_else(|| GateError::validation("No command given"))?;

    let key = descriptor.key.as_str();

    gate.run_under_limit(&descriptor, |admission| async move {
        info!(
            key,
            holder = %admission.holder_id,
            occupancy = admission.occupancy,
            program = %program,
            "Slot acquired, starting command"
        );

        let status = Command::new(program)
            .args(program_args)
            .status()
            .await
            .map_err(|e| GateError::internal(format!("Failed to start '{program}': {e}")))?;

        Ok(status.code().unwrap_or(1))
    })
    .await
}
