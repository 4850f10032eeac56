//! Infrastructure layer - External service integrations
//!
//! This layer contains the Alloy-based node client used by the
//! aggregator and resolver.

pub mod ethereum;

pub use ethereum::{AlloyClient, BlockId, BlockRecord, NodeClient};
