use super::{
    errors::NodeError,
    types::{BlockSummary, RawTransaction, RpcEnvelope, RpcRequest},
    ChainSource,
};
use crate::config::AppConfig;
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{trace, warn};

/// Replies longer than this are cut before they are attached to an error.
const MAX_ERROR_BODY: usize = 256;

/// JSON-RPC client for the chain node.
///
/// Each call is a single POST with HTTP basic auth and a per-request timeout. There
/// are no retries at this layer: a failed call is reported to the ingestion pipeline,
/// which retries on its next cycle.
pub struct NodeClient {
    client: Client,
    url: String,
    username: String,
    password: String,
    timeout: Duration,
}

impl NodeClient {
    /// Creates a client for the node configured in `config.node`.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Client`] if the underlying reqwest client fails to build.
    pub fn new(config: &AppConfig) -> Result<Self, NodeError> {
        Self::with_endpoint(
            config.node_url(),
            &config.node.username,
            &config.node.password,
            config.node_timeout(),
        )
    }

    /// Creates a client for an explicit endpoint URL.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Client`] if the underlying reqwest client fails to build.
    pub fn with_endpoint(
        url: impl Into<String>,
        username: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Self, NodeError> {
        let client = ClientBuilder::new()
            .pool_idle_timeout(Duration::from_secs(30))
            .connect_timeout(timeout)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("minestat/", env!("CARGO_PKG_VERSION")))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| {
                tracing::error!(error = %e, "failed to build node client");
                NodeError::Client(e.to_string())
            })?;

        Ok(Self {
            client,
            url: url.into(),
            username: username.to_string(),
            password: password.to_string(),
            timeout,
        })
    }

    /// Sends one JSON-RPC call and decodes its `result`.
    ///
    /// Bitcoin-style nodes answer RPC errors with a non-2xx status and a JSON body, so
    /// the body is decoded before the status is considered.
    ///
    /// # Errors
    ///
    /// - [`NodeError::Timeout`] / [`NodeError::ConnectionFailed`] on transport failures
    /// - [`NodeError::Rpc`] when the reply carries an `error` object
    /// - [`NodeError::HttpError`] for a non-success status without a JSON-RPC body
    /// - [`NodeError::MalformedResponse`] when `result` is missing or has the wrong shape
    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, NodeError> {
        trace!(method, "node rpc call");

        let response = self
            .client
            .post(&self.url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&RpcRequest::new(method, params))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| NodeError::from_transport(&e))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| NodeError::from_transport(&e))?;

        let envelope: RpcEnvelope<Value> = match serde_json::from_slice(&body) {
            Ok(envelope) => envelope,
            Err(e) if !status.is_success() => {
                let text = String::from_utf8_lossy(&body);
                let truncated = if text.len() > MAX_ERROR_BODY {
                    format!("{}... (truncated)", text.chars().take(MAX_ERROR_BODY).collect::<String>())
                } else {
                    text.into_owned()
                };
                trace!(method, status = status.as_u16(), error = %e, "node http error");
                return Err(NodeError::HttpError(status.as_u16(), truncated));
            }
            Err(e) => return Err(NodeError::MalformedResponse(format!("{method}: {e}"))),
        };

        if let Some(error) = envelope.error {
            return Err(NodeError::Rpc { code: error.code, message: error.message });
        }

        let result = envelope
            .result
            .ok_or_else(|| NodeError::MalformedResponse(format!("{method}: missing result")))?;

        serde_json::from_value(result).map_err(|e| {
            warn!(method, error = %e, "unexpected node result shape");
            NodeError::MalformedResponse(format!("{method}: {e}"))
        })
    }
}

#[async_trait]
impl ChainSource for NodeClient {
    async fn block_count(&self) -> Result<u64, NodeError> {
        self.call("getblockcount", json!({})).await
    }

    async fn block_hash(&self, height: u64) -> Result<String, NodeError> {
        self.call("getblockhash", json!({ "height": height })).await
    }

    async fn block(&self, hash: &str) -> Result<BlockSummary, NodeError> {
        self.call("getblock", json!({ "blockhash": hash })).await
    }

    async fn raw_transaction(
        &self,
        block_hash: &str,
        txid: &str,
    ) -> Result<RawTransaction, NodeError> {
        self.call(
            "getrawtransaction",
            json!({ "blockhash": block_hash, "txid": txid, "verbose": true }),
        )
        .await
    }

    async fn network_hashps(&self, nblocks: u64) -> Result<f64, NodeError> {
        self.call("getnetworkhashps", json!({ "nblocks": nblocks })).await
    }
}
