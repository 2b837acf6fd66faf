//! Service initialization and lifecycle.
//!
//! # Startup order
//!
//! ```text
//! AppConfig::load ─▶ validate ─▶ ServiceContext::connect ─▶ bootstrap ─▶ start_refresher
//!                                  (store open, fatal)       (store load fatal,
//!                                                             first pass best effort)
//! ```
//!
//! ```no_run
//! use minestat_core::{config::AppConfig, runtime::ServiceContext};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let context = ServiceContext::connect(AppConfig::load()?).await?;
//! context.bootstrap().await?;
//! let refresher = context.start_refresher();
//!
//! // ... serve requests ...
//!
//! context.shutdown();
//! ServiceContext::join_task("refresher", refresher).await;
//! # Ok(())
//! # }
//! ```

pub mod context;

pub use context::{HealthReport, ServiceContext};

use crate::store::StoreError;
use thiserror::Error;

/// Errors that abort service startup.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Configuration validation failed: {0}")]
    ConfigValidation(String),

    /// The durable store could not be opened or read.
    #[error("Block store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("Runtime initialization failed: {0}")]
    Initialization(String),
}
