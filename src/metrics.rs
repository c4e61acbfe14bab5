use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use axum::{Router, routing::get};
use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Gauge, Histogram, MeterProvider};
use opentelemetry_sdk::metrics::{MetricError, SdkMeterProvider};
use prometheus::{Encoder, TextEncoder};
use std::net::SocketAddr;

#[derive(Clone)]
pub struct Metrics {
    registry: Arc<prometheus::Registry>,
    _provider: SdkMeterProvider,
    pub chain_id: String,

    // Height processing metrics
    pub heights_processed: Counter<u64>,
    pub rows_written: Counter<u64>,
    pub latest_processed_height: Gauge<u64>,
    pub latest_height_processing_time: Gauge<f64>,

    // RPC metrics
    pub rpc_requests: Counter<u64>,
    pub rpc_errors: Counter<u64>,
    pub rpc_latency: Histogram<f64>,
}

impl Metrics {
    pub fn new(chain_id: String) -> Result<Self, MetricError> {
        let registry = prometheus::Registry::new();

        let exporter = opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()?;

        let provider = SdkMeterProvider::builder().with_reader(exporter).build();
        let meter = provider.meter("swap_indexer_metrics");

        let heights_processed = meter
            .u64_counter("swap_indexer_heights_processed")
            .with_description("Total number of block heights processed")
            .build();

        let rows_written = meter
            .u64_counter("swap_indexer_rows_written")
            .with_description("Total number of swap rows appended to the output")
            .build();

        let latest_processed_height = meter
            .u64_gauge("swap_indexer_latest_processed_height")
            .with_description("Latest block height processed")
            .build();

        let latest_height_processing_time = meter
            .f64_gauge("swap_indexer_latest_height_processing")
            .with_description("Time spent processing the latest height")
            .with_unit("s")
            .build();

        let rpc_requests = meter
            .u64_counter("swap_indexer_rpc_requests")
            .with_description("Number of LCD requests made")
            .build();

        let rpc_errors = meter
            .u64_counter("swap_indexer_rpc_errors")
            .with_description("Number of LCD errors encountered")
            .build();

        let rpc_latency = meter
            .f64_histogram("swap_indexer_rpc_latency")
            .with_description("LCD request latency")
            .with_boundaries(vec![
                0.025, 0.05, 0.075, 0.1, 0.15, 0.2, 0.3, 0.5, 1.0, 5.0, 10.0,
            ])
            .with_unit("s")
            .build();

        Ok(Self {
            registry: Arc::new(registry),
            _provider: provider,
            chain_id,
            heights_processed,
            rows_written,
            latest_processed_height,
            latest_height_processing_time,
            rpc_requests,
            rpc_errors,
            rpc_latency,
        })
    }

    fn chain_label(&self) -> KeyValue {
        KeyValue::new("chain", self.chain_id.clone())
    }

    pub fn record_rpc(&self, method: &'static str, elapsed: Duration, failed: bool) {
        let labels = [self.chain_label(), KeyValue::new("method", method)];
        self.rpc_requests.add(1, &labels);
        self.rpc_latency.record(elapsed.as_secs_f64(), &labels);
        if failed {
            self.rpc_errors.add(1, &labels);
        }
    }

    pub fn record_height(&self, height: u64, rows: usize, elapsed: Duration) {
        let labels = [self.chain_label()];
        self.heights_processed.add(1, &labels);
        self.rows_written.add(rows as u64, &labels);
        self.latest_processed_height.record(height, &labels);
        self.latest_height_processing_time
            .record(elapsed.as_secs_f64(), &labels);
    }

    pub fn render(&self) -> Result<String> {
        render_registry(&self.registry)
    }

    pub async fn start_metrics_server(&self, addr: &str, port: u16) -> Result<()> {
        let addr = format!("{addr}:{port}")
            .parse::<SocketAddr>()
            .context("invalid metrics bind address")?;
        let registry = self.registry.clone();

        let app = Router::new().route("/metrics", get(move || metrics_handler(registry.clone())));

        // Only used for logging
        let access_url = if addr.ip().is_unspecified() {
            format!("http://localhost:{port}/metrics")
        } else {
            format!("http://{}:{port}/metrics", addr.ip())
        };

        info!(
            "Starting metrics server - binding to {} (accessible at {})",
            addr, access_url
        );

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .context("failed to bind metrics server")?;

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("Metrics server stopped: {}", e);
            }
        });

        Ok(())
    }
}

fn render_registry(registry: &prometheus::Registry) -> Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

async fn metrics_handler(registry: Arc<prometheus::Registry>) -> String {
    render_registry(&registry).unwrap_or_else(|e| {
        error!("Failed to encode metrics: {}", e);
        String::new()
    })
}
