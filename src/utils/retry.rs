use anyhow::{Error, Result};
use std::{future::Future, time::Duration};
use tokio::time::sleep;
use tracing::{error, warn};

use crate::models::common::RpcConfig;
use crate::utils::strip_html;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub exponential: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 1_000,
            max_delay_ms: 60_000,
            exponential: 2.0,
        }
    }
}

impl From<&RpcConfig> for RetryConfig {
    fn from(rpc: &RpcConfig) -> Self {
        Self {
            max_attempts: rpc.max_attempts.max(1),
            ..Self::default()
        }
    }
}

/// Runs `operation` up to `config.max_attempts` times. With a single attempt
/// the first error is returned as-is.
pub async fn retry<F, Fut, T>(operation: F, config: &RetryConfig, context: &str) -> Result<T, Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = std::result::Result<T, Error>>,
{
    let mut attempt = 1;
    let mut delay = config.base_delay_ms;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if config.max_attempts <= 1 => return Err(e),
            Err(e) => {
                if attempt >= config.max_attempts {
                    error!(
                        "Operation '{}' failed after {} attempts. Final error: {}",
                        context,
                        attempt,
                        strip_html(&e.to_string())
                    );
                    return Err(e.context(format!("'{}' failed after {} attempts", context, attempt)));
                }

                warn!(
                    "Attempt {}/{} for '{}' failed: {}. Retrying in {}ms...",
                    attempt,
                    config.max_attempts,
                    context,
                    strip_html(&e.to_string()),
                    delay
                );

                sleep(Duration::from_millis(delay)).await;

                // Exponential backoff with full jitter
                let next_delay = delay as f64 * config.exponential;
                delay = std::cmp::min(config.max_delay_ms, (fastrand::f64() * next_delay) as u64);
                attempt += 1;
            }
        }
    }
}
