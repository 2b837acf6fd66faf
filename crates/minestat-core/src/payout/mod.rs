//! Payout overlay.
//!
//! Some reward income never appears as a first-output coinbase on chain (pool payouts
//! for example). The overlay fetches it per address from an external collaborator and
//! merges it into the aggregator's sums.

pub mod client;
pub mod overlay;

pub use client::HttpPayoutClient;
pub use overlay::{PayoutOverlay, PayoutRecord, RefreshOutcome};

use async_trait::async_trait;
use thiserror::Error;

/// One externally sourced reward event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PayoutEvent {
    /// Seconds since the Unix epoch.
    pub created_at: i64,
    pub coins: f64,
}

#[derive(Error, Debug)]
pub enum PayoutError {
    #[error("payout request timeout")]
    Timeout,

    #[error("payout transport error: {0}")]
    Transport(String),

    #[error("payout source returned HTTP {0}")]
    HttpStatus(u16),

    #[error("malformed payout response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait PayoutSource: Send + Sync {
    /// Returns the recent payouts credited to `address`.
    async fn recent_payouts(&self, address: &str) -> Result<Vec<PayoutEvent>, PayoutError>;
}
