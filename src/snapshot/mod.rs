//! Snapshot aggregation - concurrent multi-call orchestration
//!
//! One aggregation pass issues the independent primitive calls
//! concurrently, then fetches the recent-block window in a second
//! concurrent batch once the tip is known. Consistency is
//! all-or-nothing: a single failed call fails the whole pass and no
//! partial snapshot is ever assembled.

use alloy::primitives::{Address, U256};
use futures::future::try_join_all;
use thiserror::Error;

use crate::infrastructure::ethereum::{BlockId, BlockRecord, NodeClient};

/// Failure of an aggregation pass. Fatal to the current render: the
/// caller shows a connection-failure state and nothing else.
#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("node request failed: {0:#}")]
    Rpc(anyhow::Error),
    #[error("block {0} missing from node response")]
    MissingBlock(u64),
}

impl From<anyhow::Error> for AggregationError {
    fn from(err: anyhow::Error) -> Self {
        AggregationError::Rpc(err)
    }
}

/// A consistent point-in-time view of the node. Built fresh per
/// aggregation pass, never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ChainSnapshot {
    pub status: String,
    pub rpc_url: String,
    pub chain_id: u64,
    pub network_name: String,
    pub block_number: u64,
    pub gas_price_gwei: String,
    pub account: Address,
    pub balance_eth: String,
    pub latest_block: Option<BlockRecord>,
    pub recent_blocks: Vec<BlockRecord>,
}

/// Fetch a full snapshot: tip number, network identity, fee data,
/// account balance and the recent-block window.
pub async fn fetch_snapshot(
    client: &dyn NodeClient,
    account: Address,
    window: u64,
) -> Result<ChainSnapshot, AggregationError> {
    let (tip, chain_id, gas_price, balance) = tokio::try_join!(
        client.block_number(),
        client.chain_id(),
        client.gas_price(),
        client.get_balance(account),
    )?;

    let recent_blocks = fetch_window(client, tip, window).await?;
    let latest_block = recent_blocks.first().cloned();

    Ok(ChainSnapshot {
        status: "connected".to_string(),
        rpc_url: client.endpoint_name(),
        chain_id,
        network_name: network_name(chain_id).to_string(),
        block_number: tip,
        gas_price_gwei: format_units(U256::from(gas_price), 9),
        account,
        balance_eth: format_units(balance, 18),
        latest_block,
        recent_blocks,
    })
}

/// The narrower aggregation used by the refresh poll: tip plus window,
/// nothing else. Same windowing and consistency rules as the full pass.
pub async fn fetch_recent_blocks(
    client: &dyn NodeClient,
    window: u64,
) -> Result<Vec<BlockRecord>, AggregationError> {
    let tip = client.block_number().await?;
    fetch_window(client, tip, window).await
}

/// Fetch the contiguous descending window `[tip, tip-count+1]` in
/// parallel and assemble it newest-first. The effective count is
/// `min(window, tip + 1)` so a freshly-initialized chain never gets
/// asked for a negative block number.
async fn fetch_window(
    client: &dyn NodeClient,
    tip: u64,
    window: u64,
) -> Result<Vec<BlockRecord>, AggregationError> {
    let count = window.min(tip.saturating_add(1));
    let fetches = (0..count).map(|i| client.get_block(BlockId::Number(tip - i)));
    let fetched = try_join_all(fetches).await?;

    let mut blocks = Vec::with_capacity(fetched.len());
    for (i, block) in fetched.into_iter().enumerate() {
        // A null block inside the window means the node's view moved
        // under us; treat it the same as a failed call.
        blocks.push(block.ok_or(AggregationError::MissingBlock(tip - i as u64))?);
    }
    Ok(blocks)
}

/// Well-known network name for a chain id
pub fn network_name(chain_id: u64) -> &'static str {
    match chain_id {
        1 => "mainnet",
        10 => "optimism",
        8453 => "base",
        42161 => "arbitrum",
        11155111 => "sepolia",
        17000 => "holesky",
        31337 => "anvil",
        _ => "unknown",
    }
}

/// Render a wei-denominated value as a decimal string with the given
/// number of decimals. Integer arithmetic only; trailing zeros in the
/// fraction are trimmed and an all-zero fraction is dropped.
pub fn format_units(value: U256, decimals: u32) -> String {
    if decimals == 0 {
        return value.to_string();
    }

    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = value / divisor;
    let frac = value % divisor;

    if frac.is_zero() {
        whole.to_string()
    } else {
        let frac_str = format!("{:0>width$}", frac.to_string(), width = decimals as usize);
        let trimmed = frac_str.trim_end_matches('0');
        if trimmed.is_empty() {
            whole.to_string()
        } else {
            format!("{}.{}", whole, trimmed)
        }
    }
}
