//! Chain node collaborator.
//!
//! [`ChainSource`] is the seam between the ingestion pipeline and the node. The
//! production implementation is [`NodeClient`] (JSON-RPC over HTTP); tests substitute an
//! in-memory chain.
//!
//! # Call sequence per height
//!
//! ```text
//! getblockhash(height) ──▶ hash
//!        │
//!        ▼
//! getblock(hash) ──▶ time, tx[0]
//!        │
//!        ▼
//! getrawtransaction(hash, tx[0], verbose) ──▶ vin[0].coinbase?, vout[0]
//!        │
//!        ▼
//!    classify ──▶ BlockFact
//! ```

pub mod client;
pub mod errors;
pub mod types;

pub use client::NodeClient;
pub use errors::NodeError;
pub use types::{BlockSummary, RawTransaction, ScriptPubKey, TxInput, TxOutput};

use crate::{cache::BlockFact, ingest::classify};
use async_trait::async_trait;
use tracing::debug;

#[async_trait]
pub trait ChainSource: Send + Sync {
    /// Current chain height as reported by the node.
    async fn block_count(&self) -> Result<u64, NodeError>;

    async fn block_hash(&self, height: u64) -> Result<String, NodeError>;

    async fn block(&self, hash: &str) -> Result<BlockSummary, NodeError>;

    /// Verbose transaction lookup scoped to the block that contains it.
    async fn raw_transaction(&self, block_hash: &str, txid: &str)
        -> Result<RawTransaction, NodeError>;

    /// Estimated network hashes per second over the last `nblocks` blocks.
    async fn network_hashps(&self, nblocks: u64) -> Result<f64, NodeError>;

    /// Resolves and classifies the fact for one height.
    ///
    /// A block without transactions, or with a malformed reward transaction, still
    /// yields a fact (a non-reward one) so the height is not retried forever.
    ///
    /// # Errors
    ///
    /// Returns the [`NodeError`] of the first failing hash, block or transaction call.
    /// A malformed hash or block reply surfaces as [`NodeError::MalformedResponse`];
    /// the pipeline records such heights itself since no block time is known.
    async fn fetch_block_fact(&self, height: u64) -> Result<BlockFact, NodeError> {
        let hash = self.block_hash(height).await?;
        let block = self.block(&hash).await?;
        let Some(txid) = block.reward_txid() else {
            debug!(height, %hash, "block lists no transactions, recording as non-reward");
            return Ok(BlockFact::without_reward(height, hash, block.time));
        };

        let tx = match self.raw_transaction(&hash, txid).await {
            Ok(tx) => Some(tx),
            Err(NodeError::MalformedResponse(reason)) => {
                debug!(height, %reason, "malformed reward transaction, recording as non-reward");
                None
            }
            Err(e) => return Err(e),
        };

        Ok(classify(height, hash, block.time, tx.as_ref()))
    }
}
