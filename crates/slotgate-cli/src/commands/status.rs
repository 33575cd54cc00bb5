//! Occupancy status command.

use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use slotgate_core::config::GateConfig;
use slotgate_core::error::GateError;
use slotgate_limiter::Gate;

/// Status of one configured group
#[derive(Debug, Serialize, Tabled)]
struct StatusRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Holders")]
    occupancy: u64,
    #[tabled(rename = "Limit")]
    limit: u32,
    #[tabled(rename = "Timeout (s)")]
    timeout_seconds: f64,
    #[tabled(rename = "Lease (s)")]
    lease_seconds: u64,
}

/// Execute the status command
pub async fn execute(config: &GateConfig, gate: &Gate, format: OutputFormat) -> Result<(), GateError> {
    let mut rows = Vec::new();

    for descriptor in config.descriptors() {
        let occupancy = gate.occupancy(&descriptor).await?;
        rows.push(StatusRow {
            occupancy,
            limit: descriptor.limit,
            timeout_seconds: descriptor.timeout.as_secs_f64(),
            lease_seconds: descriptor.lease_seconds(),
            key: descriptor.key,
        });
    }

    output::print_list(&rows, format);
    Ok(())
}
