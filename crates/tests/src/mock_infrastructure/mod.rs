//! Mock Infrastructure for Testing the Mining Stats Service
//!
//! Reusable mocks for the chain node and the payout collaborator, so the pipeline
//! and the HTTP surface can be exercised without real network services.
//!
//! ## Components
//!
//! - `NodeMockBuilder`: mockito-backed JSON-RPC node answering the ingestion calls
//! - `PayoutMockBuilder`: mockito-backed payout collaborator
//! - Test helpers for chain fixtures and service contexts
//!
//! ## Usage
//!
//! ```ignore
//! use tests::mock_infrastructure::{create_test_chain, NodeMockBuilder};
//!
//! let chain = create_test_chain(4, 1_700_000_000, 600, "miner", 3.125);
//! let mut node = NodeMockBuilder::new().await;
//! node.mock_block_count(4).mock_network_hashps(1.0e12).mock_chain(&chain);
//! ```

pub mod node_mock;
pub mod test_helpers;

pub use node_mock::{NodeMockBuilder, PayoutMockBuilder};
pub use test_helpers::*;
