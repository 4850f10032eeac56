//! Ethereum infrastructure - Alloy node client implementation

mod provider;

pub use provider::{parse_block, AlloyClient, BlockId, BlockRecord, NodeClient};
