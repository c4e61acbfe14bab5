pub mod txs;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::indexer::rpc::txs::TxParser;
use crate::models::datasets::txs::{RpcNodeInfoResponse, RpcSearchResponse, SearchPage};
use crate::models::errors::RpcError;
use crate::utils::strip_html;

/// The ledger endpoint as seen by the indexer.
pub trait LedgerClient: Send + Sync {
    /// One page of transactions included at `height`. Pages are 1-based.
    fn search_txs(
        &self,
        height: u64,
        page: u64,
        limit: u32,
    ) -> impl Future<Output = Result<SearchPage, RpcError>> + Send;

    /// Chain identifier reported by the node.
    fn node_chain_id(&self) -> impl Future<Output = Result<String, RpcError>> + Send;
}

/// Client for the legacy Terra LCD REST API.
pub struct LcdClient {
    http: Client,
    base_url: Url,
}

impl LcdClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let mut base_url: Url = url.parse().context("failed to parse LCD url")?;
        // Url::join drops the last path segment unless the base ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { http, base_url })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, RpcError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| RpcError::MalformedResponse {
                reason: format!("invalid request path {}: {}", path, e),
            })?;

        debug!("GET {} {:?}", url, query);

        let response = self.http.get(url).query(query).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(RpcError::Status {
                status: status.as_u16(),
                body: strip_html(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| RpcError::MalformedResponse {
            reason: format!("{} returned invalid JSON: {}", path, e),
        })
    }
}

impl LedgerClient for LcdClient {
    async fn search_txs(&self, height: u64, page: u64, limit: u32) -> Result<SearchPage, RpcError> {
        let query = [
            ("tx.height", height.to_string()),
            ("page", page.to_string()),
            ("limit", limit.to_string()),
        ];

        self.get_json::<RpcSearchResponse>("txs", &query)
            .await?
            .parse_search_page()
    }

    async fn node_chain_id(&self) -> Result<String, RpcError> {
        let response: RpcNodeInfoResponse = self.get_json("node_info", &[]).await?;
        Ok(response.node_info.network)
    }
}
