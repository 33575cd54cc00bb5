//! Slotgate Sweeper: periodic stale holder cleanup
//!
//! Loads configuration, connects to the shared store and removes expired
//! holders from every configured group (and any key matching the configured
//! pattern) until interrupted.

use std::collections::BTreeMap;
use std::time::Duration;

use futures::TryStreamExt;
use tracing_subscriber::{EnvFilter, fmt};

use slotgate_core::config::GateConfig;
use slotgate_core::error::GateError;
use slotgate_core::types::LimitDescriptor;
use slotgate_limiter::Gate;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Sweeper error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<GateConfig, GateError> {
    let config_path =
        std::env::var("SLOTGATE_CONFIG").unwrap_or_else(|_| "config/slotgate".to_string());

    GateConfig::load(&config_path)
}

/// Initialize tracing/logging
fn init_logging(config: &GateConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main sweeper loop
async fn run(config: GateConfig) -> Result<(), GateError> {
    tracing::info!("Starting Slotgate sweeper v{}", env!("CARGO_PKG_VERSION"));

    let gate = Gate::connect(&config.store).await?;
    if !gate.health_check().await? {
        return Err(GateError::store("Store health check failed"));
    }

    let period = Duration::from_secs(config.sweeper.interval_seconds.max(1));
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    tracing::info!(
        interval_secs = period.as_secs(),
        groups = config.limits.len(),
        pattern = ?config.sweeper.key_pattern,
        "Sweeper started"
    );

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match sweep_once(&gate, &config).await {
                    Ok(removed) if removed > 0 => {
                        tracing::info!(removed, "Sweep removed stale holders");
                    }
                    Ok(_) => tracing::debug!("Sweep found nothing to remove"),
                    Err(e) => tracing::error!("Sweep failed: {}", e),
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received, stopping sweeper");
                break;
            }
        }
    }

    Ok(())
}

/// Clean every group once, returning the number of holders removed
async fn sweep_once(gate: &Gate, config: &GateConfig) -> Result<u64, GateError> {
    let mut targets: BTreeMap<String, LimitDescriptor> = config
        .descriptors()
        .into_iter()
        .map(|d| (d.key.clone(), d))
        .collect();

    if let Some(pattern) = &config.sweeper.key_pattern {
        let keys: Vec<String> = gate.list_keys(pattern).try_collect().await?;
        for key in keys {
            // The limit plays no part in cleaning.
            targets
                .entry(key.clone())
                .or_insert_with(|| LimitDescriptor::new(key, 1));
        }
    }

    let mut total = 0;
    for descriptor in targets.values() {
        match gate.clean_stale(descriptor).await {
            Ok(removed) => total += removed,
            Err(e) => tracing::warn!(key = %descriptor.key, "Failed to clean group: {}", e),
        }
    }

    Ok(total)
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
