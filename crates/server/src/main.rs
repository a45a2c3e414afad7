//! Ledger server binary.
//!
//! Composition root: reads configuration from the environment, sets up
//! logging, builds the runtime from content on disk and runs a demonstration
//! session against it.
//!
//! ```bash
//! LEDGER_DEMO_TICKS=20 RUST_LOG=runtime=debug cargo run -p ledger-server
//! ```
mod bootstrap;
mod config;
mod logging;
mod scenario;

use anyhow::{Context, Result};

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = ServerConfig::from_env();
    let logging = logging::setup_logging(config.session_id.as_deref(), config.log_dir.as_deref())?;

    tracing::info!("Starting ledger server");
    tracing::info!("Data directory: {}", config.data_dir.display());
    tracing::info!(
        "Clock: {}",
        config
            .tick_interval
            .map_or_else(|| "manual".to_owned(), |period| format!("{}ms", period.as_millis()))
    );

    let mut runtime = bootstrap::build_runtime(&config).await?;
    let report = scenario::run(&mut runtime, config.demo_ticks, config.tick_interval).await?;

    tracing::info!(
        applied = report.applied,
        rejected = report.rejected,
        deltas = report.deltas_published,
        resyncs = report.replica_resyncs,
        "Session finished"
    );

    let report_path = logging.session_dir.join("report.json");
    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(&report_path, json)
        .with_context(|| format!("Failed to write {}", report_path.display()))?;
    tracing::info!("Report written to {}", report_path.display());

    runtime.shutdown().await?;
    tracing::info!(session = %logging.session_id, "Ledger server stopped");
    Ok(())
}
