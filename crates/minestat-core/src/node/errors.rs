use thiserror::Error;

/// Errors returned by a [`ChainSource`](super::ChainSource).
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("node request timeout")]
    Timeout,

    #[error("node connection failed: {0}")]
    ConnectionFailed(String),

    #[error("node HTTP error {0}: {1}")]
    HttpError(u16, String),

    #[error("node RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed node response: {0}")]
    MalformedResponse(String),

    #[error("failed to build node client: {0}")]
    Client(String),
}

impl NodeError {
    /// Returns `true` when the node could not be reached at all.
    ///
    /// Transient failures put the ingestion cycle into degraded mode; everything else is
    /// an answer from a reachable node.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::ConnectionFailed(_) => true,
            Self::HttpError(status, _) => *status >= 500,
            Self::Rpc { .. } | Self::MalformedResponse(_) | Self::Client(_) => false,
        }
    }

    /// Sanitizes transport errors so URLs and credentials never reach logs.
    pub(crate) fn from_transport(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_connect() {
            Self::ConnectionFailed("connection refused or unreachable".to_string())
        } else if error.is_decode() {
            Self::MalformedResponse("response body error".to_string())
        } else if error.is_body() {
            Self::ConnectionFailed("response body interrupted".to_string())
        } else if error.is_request() {
            Self::ConnectionFailed("request failed".to_string())
        } else {
            Self::ConnectionFailed("network error".to_string())
        }
    }
}
