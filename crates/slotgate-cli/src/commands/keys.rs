//! Key listing command.

use clap::Args;
use futures::TryStreamExt;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use slotgate_core::error::GateError;
use slotgate_limiter::Gate;

/// Arguments for the keys command
#[derive(Debug, Args)]
pub struct KeysArgs {
    /// Glob pattern to match
    #[arg(default_value = "*")]
    pub pattern: String,
}

/// One listed key
#[derive(Debug, Serialize, Tabled)]
struct KeyRow {
    #[tabled(rename = "Key")]
    key: String,
}

/// Execute the keys command
pub async fn execute(args: &KeysArgs, gate: &Gate, format: OutputFormat) -> Result<(), GateError> {
    let mut rows: Vec<KeyRow> = gate
        .list_keys(&args.pattern)
        .map_ok(|key| KeyRow { key })
        .try_collect()
        .await?;
    rows.sort_by(|a, b| a.key.cmp(&b.key));
    rows.dedup_by(|a, b| a.key == b.key);

    output::print_list(&rows, format);
    Ok(())
}
