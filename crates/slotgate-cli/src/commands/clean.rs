//! Stale holder cleanup command.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use slotgate_core::config::GateConfig;
use slotgate_core::error::GateError;
use slotgate_core::types::LimitDescriptor;
use slotgate_limiter::Gate;

/// Arguments for the clean command
#[derive(Debug, Args)]
pub struct CleanArgs {
    /// Keys to clean; defaults to every configured group
    pub keys: Vec<String>,
}

/// Cleanup result for one group
#[derive(Debug, Serialize, Tabled)]
struct CleanRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Removed")]
    removed: u64,
}

/// Execute the clean command
pub async fn execute(
    args: &CleanArgs,
    config: &GateConfig,
    gate: &Gate,
    format: OutputFormat,
) -> Result<(), GateError> {
    let descriptors: Vec<LimitDescriptor> = if args.keys.is_empty() {
        config.descriptors()
    } else {
        // The limit plays no part in cleaning, so unknown keys get a placeholder.
        args.keys
            .iter()
            .map(|key| {
                config
                    .find_limit(key)
                    .unwrap_or_else(|| LimitDescriptor::new(key.clone(), 1))
            })
            .collect()
    };

    let mut rows = Vec::with_capacity(descriptors.len());
    for descriptor in &descriptors {
        let removed = gate.clean_stale(descriptor).await?;
        rows.push(CleanRow {
            key: descriptor.key.clone(),
            removed,
        });
    }

    let total: u64 = rows.iter().map(|r| r.removed).sum();
    output::print_list(&rows, format);
    if format == OutputFormat::Table {
        output::print_success(&format!("Removed {total} stale holder(s)"));
    }
    Ok(())
}
