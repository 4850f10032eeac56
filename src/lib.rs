//! Anvil Lens - live chain-state view for a local EVM development node
//!
//! A point-in-time debugging aggregator: connection health, the tip
//! block, a recent-block window, block lookup by number or hash, and a
//! timer-driven refresh of the recent-block fragment. Nothing is
//! persisted; every view is re-derived from the node.

pub mod config;
pub mod infrastructure;
pub mod mocks;
pub mod refresh;
pub mod resolver;
pub mod server;
pub mod snapshot;
pub mod view;

pub use infrastructure::{AlloyClient, BlockId, BlockRecord, NodeClient};
pub use snapshot::{fetch_recent_blocks, fetch_snapshot, AggregationError, ChainSnapshot};
