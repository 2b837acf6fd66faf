//! Chain progress state shared between the ingestion pipeline and request handlers.
//!
//! One [`ChainState`] is created per service and shared by `Arc`-backed clones. The
//! ingestion pipeline is its only writer; the aggregator and the health endpoint read it.

pub mod state;

pub use state::{ChainState, IngestProgress};
