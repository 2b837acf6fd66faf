use super::{PayoutError, PayoutEvent, PayoutSource};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, trace};

/// Base units per coin in the payout collaborator's `Atoms` field.
const ATOMS_PER_COIN: f64 = 1e8;

#[derive(Debug, Deserialize)]
struct PayoutResponse {
    #[serde(default)]
    combined: CombinedStats,
}

#[derive(Debug, Default, Deserialize)]
struct CombinedStats {
    #[serde(rename = "RecentPayouts", default)]
    recent_payouts: Vec<WirePayout>,
}

#[derive(Debug, Deserialize)]
struct WirePayout {
    /// Seconds since the Unix epoch.
    #[serde(rename = "CreatedAt")]
    created_at: i64,
    #[serde(rename = "Atoms")]
    atoms: u64,
}

impl From<WirePayout> for PayoutEvent {
    #[allow(clippy::cast_precision_loss)]
    fn from(payout: WirePayout) -> Self {
        Self { created_at: payout.created_at, coins: payout.atoms as f64 / ATOMS_PER_COIN }
    }
}

/// HTTP payout collaborator: `GET {base_url}{address}`.
pub struct HttpPayoutClient {
    client: Client,
    base_url: String,
}

impl HttpPayoutClient {
    /// # Errors
    ///
    /// Returns [`PayoutError::Transport`] if the underlying reqwest client fails to build.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, PayoutError> {
        let client = ClientBuilder::new()
            .connect_timeout(timeout)
            .timeout(timeout)
            .user_agent(concat!("minestat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PayoutError::Transport(format!("HTTP client build failed: {e}")))?;

        Ok(Self { client, base_url: base_url.into() })
    }

    fn sanitize(error: &reqwest::Error) -> PayoutError {
        if error.is_timeout() {
            PayoutError::Timeout
        } else if error.is_connect() {
            PayoutError::Transport("connection refused or unreachable".to_string())
        } else if error.is_decode() || error.is_body() {
            PayoutError::Malformed("response body error".to_string())
        } else {
            PayoutError::Transport("request failed".to_string())
        }
    }
}

#[async_trait]
impl PayoutSource for HttpPayoutClient {
    async fn recent_payouts(&self, address: &str) -> Result<Vec<PayoutEvent>, PayoutError> {
        let url = format!("{}{address}", self.base_url);
        trace!(address, "fetching payouts");

        let response = self.client.get(&url).send().await.map_err(|e| Self::sanitize(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PayoutError::HttpStatus(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| Self::sanitize(&e))?;
        let parsed: PayoutResponse =
            serde_json::from_slice(&body).map_err(|e| PayoutError::Malformed(e.to_string()))?;

        let events: Vec<PayoutEvent> =
            parsed.combined.recent_payouts.into_iter().map(PayoutEvent::from).collect();
        debug!(address, count = events.len(), "fetched payouts");
        Ok(events)
    }
}
