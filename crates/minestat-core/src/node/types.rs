//! JSON-RPC 1.0 wire types for the chain node.
//!
//! Only the fields the ingestion pipeline consumes are modelled; everything else in
//! the node's replies is ignored during deserialization.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outgoing request envelope. Parameters are sent by name.
#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: &'static str,
    pub method: &'a str,
    pub params: Value,
}

impl<'a> RpcRequest<'a> {
    #[must_use]
    pub fn new(method: &'a str, params: Value) -> Self {
        Self { jsonrpc: "1.0", id: "minestat", method, params }
    }
}

/// Incoming reply envelope. Exactly one of `result` and `error` is expected to be set.
#[derive(Debug, Deserialize)]
pub struct RpcEnvelope<T> {
    pub result: Option<T>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorObject {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// The subset of `getblock` consumed during ingestion.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockSummary {
    pub time: i64,
    #[serde(default)]
    pub tx: Vec<String>,
}

impl BlockSummary {
    /// Id of the block's first (reward) transaction.
    #[must_use]
    pub fn reward_txid(&self) -> Option<&str> {
        self.tx.first().map(String::as_str)
    }
}

/// The subset of a verbose `getrawtransaction` reply consumed during classification.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTransaction {
    #[serde(default)]
    pub vin: Vec<TxInput>,
    #[serde(default)]
    pub vout: Vec<TxOutput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TxInput {
    /// Present only on generation inputs.
    #[serde(default)]
    pub coinbase: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TxOutput {
    #[serde(default)]
    pub value: f64,
    #[serde(rename = "scriptPubKey", default)]
    pub script_pub_key: ScriptPubKey,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScriptPubKey {
    #[serde(default)]
    pub address: Option<String>,
}
