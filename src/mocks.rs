//! Mock node client for tests
//!
//! A canned-chain [`NodeClient`] with per-call failure injection, so
//! the aggregation and resolution paths can be exercised without a
//! running node.

use std::collections::{BTreeMap, HashSet};

use alloy::primitives::{Address, U256};
use anyhow::{anyhow, Result};

use crate::infrastructure::ethereum::{BlockId, BlockRecord, NodeClient};

/// Build a synthetic block with the given number and transaction count.
pub fn mock_block(number: u64, tx_count: usize) -> BlockRecord {
    BlockRecord {
        number,
        hash: mock_block_hash(number),
        parent_hash: if number == 0 {
            format!("0x{:064x}", 0)
        } else {
            mock_block_hash(number - 1)
        },
        timestamp: 1_700_000_000 + number * 12,
        miner: "0x0000000000000000000000000000000000000000".to_string(),
        nonce: "0x0000000000000000".to_string(),
        difficulty: U256::ZERO,
        gas_limit: 30_000_000,
        gas_used: 21_000 * tx_count as u64,
        extra_data: "0x".to_string(),
        transactions: (0..tx_count)
            .map(|i| format!("0x{:064x}", number * 1000 + i as u64 + 1))
            .collect(),
    }
}

/// The deterministic hash `mock_block` gives block `number`.
pub fn mock_block_hash(number: u64) -> String {
    format!("0x{:064x}", number + 0xf00d)
}

/// Canned-chain node client.
pub struct MockNodeClient {
    tip: u64,
    chain_id: u64,
    gas_price: u128,
    balance: U256,
    blocks: BTreeMap<u64, BlockRecord>,
    failing_blocks: HashSet<u64>,
    unreachable: bool,
}

impl MockNodeClient {
    /// A reachable chain with blocks `0..=tip`, each carrying
    /// `number % 3` transactions.
    pub fn with_tip(tip: u64) -> Self {
        let blocks = (0..=tip)
            .map(|number| (number, mock_block(number, (number % 3) as usize)))
            .collect();
        Self {
            tip,
            chain_id: 31337,
            gas_price: 2_000_000_000,
            balance: U256::from(10_000u64) * U256::from(10u64).pow(U256::from(18u64)),
            blocks,
            failing_blocks: HashSet::new(),
            unreachable: false,
        }
    }

    /// A node every call fails against.
    pub fn down() -> Self {
        let mut client = Self::with_tip(0);
        client.unreachable = true;
        client
    }

    /// Replace one block with a custom transaction count.
    pub fn block_with_transactions(mut self, number: u64, tx_count: usize) -> Self {
        self.blocks.insert(number, mock_block(number, tx_count));
        self
    }

    /// Make the fetch of one specific block fail at transport level.
    pub fn failing_block(mut self, number: u64) -> Self {
        self.failing_blocks.insert(number);
        self
    }

    pub fn gas_price_wei(mut self, gas_price: u128) -> Self {
        self.gas_price = gas_price;
        self
    }

    pub fn balance_wei(mut self, balance: U256) -> Self {
        self.balance = balance;
        self
    }

    fn check_reachable(&self) -> Result<()> {
        if self.unreachable {
            Err(anyhow!("connection refused (http://localhost:8545)"))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl NodeClient for MockNodeClient {
    async fn block_number(&self) -> Result<u64> {
        self.check_reachable()?;
        Ok(self.tip)
    }

    async fn chain_id(&self) -> Result<u64> {
        self.check_reachable()?;
        Ok(self.chain_id)
    }

    async fn gas_price(&self) -> Result<u128> {
        self.check_reachable()?;
        Ok(self.gas_price)
    }

    async fn get_balance(&self, _address: Address) -> Result<U256> {
        self.check_reachable()?;
        Ok(self.balance)
    }

    async fn get_block(&self, id: BlockId) -> Result<Option<BlockRecord>> {
        self.check_reachable()?;
        match id {
            BlockId::Number(number) => {
                if self.failing_blocks.contains(&number) {
                    return Err(anyhow!("request timed out fetching block {number}"));
                }
                Ok(self.blocks.get(&number).cloned())
            }
            BlockId::Hash(hash) => Ok(self
                .blocks
                .values()
                .find(|block| block.hash == hash)
                .cloned()),
        }
    }

    fn endpoint_name(&self) -> String {
        "http://localhost:8545".to_string()
    }
}
