//! Block fact ingestion.
//!
//! - [`classify`]: turns a block's reward transaction into a [`BlockFact`](crate::cache::BlockFact)
//! - [`IngestionPipeline`]: one pass over the heights missing from the store
//! - [`PeriodicRefresher`]: the background loop that drives the pipeline

pub mod classify;
pub mod pipeline;
pub mod refresher;

pub use classify::classify;
pub use pipeline::{IngestError, IngestOutcome, IngestReport, IngestionPipeline};
pub use refresher::PeriodicRefresher;
