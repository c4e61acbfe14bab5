use anyhow::{Result, anyhow};
use std::time::Duration;
use tokio::{signal, sync::broadcast};
use tracing::{error, info};
use tracing_subscriber::{self, EnvFilter};

use terra_swap_indexer::indexer::{self, rpc::LcdClient};
use terra_swap_indexer::metrics::Metrics;
use terra_swap_indexer::storage::CsvSink;
use terra_swap_indexer::utils::{load_config, retry::RetryConfig};

const CONFIG_FILE: &str = "config.yml";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    println!();
    info!("=========================== INITIALIZING ===========================");

    let config = match load_config(CONFIG_FILE) {
        Ok(config) => {
            info!("Config loaded successfully");
            config
        }
        Err(e) => {
            error!("Failed to load config: {:#}", e);
            return Err(anyhow!(e));
        }
    };

    info!("LCD URL: {}", config.terra_url);
    info!("Chain ID: {}", config.terra_chain_id);
    info!(
        "Height range: {}..={} (load unit {})",
        config.start_height, config.end_height, config.terra_txs_load_unit
    );
    info!(
        "Output: {} ({})",
        config.result_file_name,
        if config.append { "append" } else { "overwrite" }
    );

    let metrics = if config.metrics.enabled {
        Some(Metrics::new(config.terra_chain_id.clone())?)
    } else {
        info!("Metrics are disabled");
        None
    };

    if let Some(metrics_instance) = &metrics {
        metrics_instance
            .start_metrics_server(&config.metrics.address, config.metrics.port)
            .await?;
    }

    let client = LcdClient::new(
        &config.terra_url,
        Duration::from_secs(config.rpc.timeout_secs),
    )?;

    let retry_config = RetryConfig::from(&config.rpc);
    indexer::verify_chain_id(&client, &config.terra_chain_id, &retry_config, metrics.as_ref())
        .await?;
    info!("Node chain ID verified");

    // Ctrl+C stops the run between heights, never in the middle of one
    let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if let Ok(()) = signal::ctrl_c().await {
            info!("Received Ctrl+C signal, finishing current height...");
            let _ = shutdown_tx.send(());
        }
    });

    let mut sink = CsvSink::new(&config.result_file_name, config.append);

    println!();
    info!("========================= STARTING INDEXER =========================");

    let summary = indexer::run(
        &client,
        &mut sink,
        &config,
        &mut shutdown_rx,
        metrics.as_ref(),
    )
    .await
    .inspect_err(|e| error!("Indexer failed: {:#}", e))?;

    info!(
        "Processed {} heights, wrote {} rows",
        summary.heights_processed, summary.rows_written
    );

    if summary.interrupted {
        let resume_from = summary
            .last_height
            .map_or(config.start_height, |height| height + 1);
        info!(
            "Interrupted. Resume with START_HEIGHT={} APPEND=true",
            resume_from
        );
    }

    Ok(())
}
