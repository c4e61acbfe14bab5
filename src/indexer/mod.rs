pub mod rpc;
pub mod transformations;

use anyhow::{Context, Result};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::time::{Duration, Instant, sleep};
use tracing::{debug, error, info, warn};

use crate::indexer::rpc::LedgerClient;
use crate::indexer::transformations::swaps::SwapTransformer;
use crate::metrics::Metrics;
use crate::models::common::{Config, RunSummary};
use crate::models::datasets::swaps::SwapRow;
use crate::models::datasets::txs::SearchPage;
use crate::models::errors::ChainError;
use crate::storage::SwapSink;
use crate::utils::retry::{RetryConfig, retry};

const PROGRESS_INTERVAL: u64 = 100;

pub async fn get_chain_id<C: LedgerClient>(
    client: &C,
    retry_config: &RetryConfig,
    metrics: Option<&Metrics>,
) -> Result<String> {
    retry(
        || async move {
            let start = Instant::now();
            let result = client.node_chain_id().await;

            if let Some(metrics) = metrics {
                metrics.record_rpc("node_info", start.elapsed(), result.is_err());
            }

            result.map_err(|e| {
                warn!("Failed to get chain ID. Error details: {}", e);
                anyhow::Error::from(e)
            })
        },
        retry_config,
        "node_info",
    )
    .await
}

/// Fails with `ChainError::ChainIdMismatch` unless the node serves `expected`.
pub async fn verify_chain_id<C: LedgerClient>(
    client: &C,
    expected: &str,
    retry_config: &RetryConfig,
    metrics: Option<&Metrics>,
) -> Result<()> {
    let actual = get_chain_id(client, retry_config, metrics).await?;
    if actual != expected {
        return Err(ChainError::ChainIdMismatch {
            expected: expected.to_string(),
            actual,
        }
        .into());
    }
    Ok(())
}

pub async fn search_txs<C: LedgerClient>(
    client: &C,
    height: u64,
    page: u64,
    limit: u32,
    retry_config: &RetryConfig,
    metrics: Option<&Metrics>,
) -> Result<SearchPage> {
    retry(
        || async move {
            let start = Instant::now();
            let result = client.search_txs(height, page, limit).await;

            if let Some(metrics) = metrics {
                metrics.record_rpc("search_txs", start.elapsed(), result.is_err());
            }

            result.map_err(|e| {
                warn!(
                    "Failed to search txs at height {} page {}. Error details: {}",
                    height, page, e
                );
                anyhow::Error::from(e)
            })
        },
        retry_config,
        "search_txs",
    )
    .await
}

/// Every swap row at `height`, across all search pages, in page order.
pub async fn fetch_swaps_at_height<C: LedgerClient>(
    client: &C,
    height: u64,
    limit: u32,
    retry_config: &RetryConfig,
    metrics: Option<&Metrics>,
) -> Result<Vec<SwapRow>> {
    let mut rows = Vec::new();
    let mut page = 1;

    loop {
        let result = search_txs(client, height, page, limit, retry_config, metrics).await?;
        debug!(
            "Height {} page {}/{}: {} txs",
            height,
            page,
            result.page_total,
            result.txs.len()
        );

        for tx in &result.txs {
            rows.extend(tx.transform_swaps()?);
        }

        // page_total of 0 or 1 still means exactly one request
        if page >= result.page_total {
            break;
        }
        page += 1;
    }

    Ok(rows)
}

fn shutdown_requested(shutdown: &mut broadcast::Receiver<()>) -> bool {
    match shutdown.try_recv() {
        Ok(()) | Err(TryRecvError::Lagged(_)) => true,
        Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => false,
    }
}

/// Walks `start_height..=end_height`, appending each height's rows to `sink`
/// before moving on. Any fetch, extract or write error aborts the run.
pub async fn run<C, S>(
    client: &C,
    sink: &mut S,
    config: &Config,
    shutdown: &mut broadcast::Receiver<()>,
    metrics: Option<&Metrics>,
) -> Result<RunSummary>
where
    C: LedgerClient,
    S: SwapSink,
{
    let retry_config = RetryConfig::from(&config.rpc);
    let delay = Duration::from_millis(config.height_delay_ms);
    let mut summary = RunSummary::default();

    for height in config.start_height..=config.end_height {
        if shutdown_requested(shutdown) {
            info!("Shutdown requested before height {}, stopping", height);
            summary.interrupted = true;
            break;
        }

        let height_start_time = Instant::now();

        let rows = match fetch_swaps_at_height(
            client,
            height,
            config.terra_txs_load_unit,
            &retry_config,
            metrics,
        )
        .await
        {
            Ok(rows) => rows,
            Err(e) => {
                error!(
                    "Aborting at height {}. Last completed height: {:?}",
                    height, summary.last_height
                );
                return Err(e.context(format!("failed to process height {}", height)));
            }
        };

        if !rows.is_empty() {
            sink.append(&rows)
                .with_context(|| format!("failed to write rows for height {}", height))?;
        }

        summary.heights_processed += 1;
        summary.rows_written += rows.len() as u64;
        summary.last_height = Some(height);

        if let Some(metrics) = metrics {
            metrics.record_height(height, rows.len(), height_start_time.elapsed());
        }

        if height % PROGRESS_INTERVAL == 0 {
            info!("HEIGHT: {}", height);
        }

        sleep(delay).await;
    }

    sink.flush().context("failed to flush output")?;

    if !summary.interrupted {
        info!("FINISHED");
    }

    Ok(summary)
}
