use serde::{Deserialize, Serialize};
use url::Url;

use crate::models::errors::ConfigError;

const DEFAULT_HEIGHT_DELAY_MS: u64 = 10;
const DEFAULT_RPC_TIMEOUT_SECS: u64 = 30;
const DEFAULT_METRICS_PORT: u16 = 9100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_address")]
    pub address: String,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: default_metrics_address(),
            port: default_metrics_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_timeout_secs")]
    pub timeout_secs: u64,
    // 1 means a failed call aborts the run straight away
    #[serde(default = "default_rpc_max_attempts")]
    pub max_attempts: u32,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_rpc_timeout_secs(),
            max_attempts: default_rpc_max_attempts(),
        }
    }
}

/// Run configuration. Loaded once at startup and passed around by reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub result_file_name: String,
    pub start_height: u64,
    pub end_height: u64,
    pub terra_url: String,
    pub terra_chain_id: String,
    pub terra_txs_load_unit: u32,
    #[serde(default = "default_height_delay_ms")]
    pub height_delay_ms: u64,
    #[serde(default)]
    pub append: bool,
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.terra_url).map_err(|e| ConfigError::InvalidUrl {
            url: self.terra_url.clone(),
            reason: e.to_string(),
        })?;

        if self.terra_txs_load_unit == 0 {
            return Err(ConfigError::ZeroLoadUnit);
        }

        if self.start_height > self.end_height {
            return Err(ConfigError::InvalidHeightRange {
                start: self.start_height,
                end: self.end_height,
            });
        }

        if self.rpc.max_attempts == 0 {
            return Err(ConfigError::ZeroMaxAttempts);
        }

        Ok(())
    }
}

/// Outcome of a driver run, logged at exit so an aborted or interrupted job
/// can be resumed from `last_height + 1`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub heights_processed: u64,
    pub rows_written: u64,
    pub last_height: Option<u64>,
    pub interrupted: bool,
}

fn default_height_delay_ms() -> u64 {
    DEFAULT_HEIGHT_DELAY_MS
}

fn default_rpc_timeout_secs() -> u64 {
    DEFAULT_RPC_TIMEOUT_SECS
}

fn default_rpc_max_attempts() -> u32 {
    1
}

fn default_metrics_address() -> String {
    "0.0.0.0".to_string()
}

fn default_metrics_port() -> u16 {
    DEFAULT_METRICS_PORT
}
