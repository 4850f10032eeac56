//! Node client abstraction and the Alloy HTTP implementation
//!
//! Block fetches go through raw JSON requests so that chains with
//! non-standard block shapes (Optimism/Base style L2s) parse cleanly.

use alloy::network::Ethereum;
use alloy::primitives::{Address, U256};
use alloy::providers::{
    fillers::{BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller},
    Identity, Provider, ProviderBuilder, RootProvider,
};
use anyhow::{Context, Result};

/// A block identifier as the node's lookup calls accept it: either a
/// block number or an opaque block hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockId {
    Number(u64),
    Hash(String),
}

/// Block data parsed from the node's JSON response.
///
/// Transactions are kept as hashes only; this tool never decodes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRecord {
    pub number: u64,
    pub hash: String,
    pub parent_hash: String,
    pub timestamp: u64,
    pub miner: String,
    pub nonce: String,
    pub difficulty: U256,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub extra_data: String,
    pub transactions: Vec<String>,
}

/// Abstract node client trait
///
/// The primitive calls the aggregator and resolver need, abstracting
/// over the concrete Alloy transport so tests can substitute a mock.
#[async_trait::async_trait]
pub trait NodeClient: Send + Sync + 'static {
    /// Get the current tip block number
    async fn block_number(&self) -> Result<u64>;

    /// Get the chain id
    async fn chain_id(&self) -> Result<u64>;

    /// Get the current gas price in wei
    async fn gas_price(&self) -> Result<u128>;

    /// Get account balance in wei
    async fn get_balance(&self, address: Address) -> Result<U256>;

    /// Get a block by number or hash. `None` means the node knows no
    /// such block; transport failures are `Err`.
    async fn get_block(&self, id: BlockId) -> Result<Option<BlockRecord>>;

    /// Get endpoint display name
    fn endpoint_name(&self) -> String;
}

type HttpFillProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider,
    Ethereum,
>;

/// HTTP JSON-RPC client backed by Alloy
pub struct AlloyClient {
    provider: HttpFillProvider,
    endpoint: String,
}

impl AlloyClient {
    pub fn connect(url: &str) -> Result<Self> {
        let rpc_url = url.parse().context("Invalid HTTP URL")?;
        let provider = ProviderBuilder::new().connect_http(rpc_url);
        Ok(Self {
            provider,
            endpoint: url.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl NodeClient for AlloyClient {
    async fn block_number(&self) -> Result<u64> {
        Ok(self.provider.get_block_number().await?)
    }

    async fn chain_id(&self) -> Result<u64> {
        Ok(self.provider.get_chain_id().await?)
    }

    async fn gas_price(&self) -> Result<u128> {
        Ok(self.provider.get_gas_price().await?)
    }

    async fn get_balance(&self, address: Address) -> Result<U256> {
        Ok(self.provider.get_balance(address).await?)
    }

    async fn get_block(&self, id: BlockId) -> Result<Option<BlockRecord>> {
        // Second parameter `false` asks for transaction hashes only.
        let json: serde_json::Value = match id {
            BlockId::Number(number) => {
                let block_num_hex = format!("0x{:x}", number);
                self.provider
                    .raw_request("eth_getBlockByNumber".into(), (&block_num_hex, false))
                    .await?
            }
            BlockId::Hash(hash) => {
                self.provider
                    .raw_request("eth_getBlockByHash".into(), (&hash, false))
                    .await?
            }
        };

        if json.is_null() {
            return Ok(None);
        }

        Ok(Some(parse_block(&json)?))
    }

    fn endpoint_name(&self) -> String {
        self.endpoint.clone()
    }
}

/// Parse a raw JSON block response into a [`BlockRecord`]
pub fn parse_block(json: &serde_json::Value) -> Result<BlockRecord> {
    let number = parse_hex_u64(json.get("number").and_then(|v| v.as_str()).unwrap_or("0x0"))?;
    let hash = str_field(json, "hash", "0x0");
    let parent_hash = str_field(json, "parentHash", "0x0");
    let timestamp =
        parse_hex_u64(json.get("timestamp").and_then(|v| v.as_str()).unwrap_or("0x0"))?;
    let miner = str_field(json, "miner", "0x0000000000000000000000000000000000000000");
    let nonce = str_field(json, "nonce", "0x0000000000000000");
    let difficulty = json
        .get("difficulty")
        .and_then(|v| v.as_str())
        .map(parse_hex_u256)
        .transpose()?
        .unwrap_or(U256::ZERO);
    let gas_limit = parse_hex_u64(json.get("gasLimit").and_then(|v| v.as_str()).unwrap_or("0x0"))?;
    let gas_used = parse_hex_u64(json.get("gasUsed").and_then(|v| v.as_str()).unwrap_or("0x0"))?;
    let extra_data = str_field(json, "extraData", "0x");

    let mut transactions = Vec::new();
    if let Some(txs) = json.get("transactions").and_then(|v| v.as_array()) {
        for tx in txs {
            if let Some(hash) = tx.as_str() {
                transactions.push(hash.to_string());
            }
        }
    }

    Ok(BlockRecord {
        number,
        hash,
        parent_hash,
        timestamp,
        miner,
        nonce,
        difficulty,
        gas_limit,
        gas_used,
        extra_data,
        transactions,
    })
}

fn str_field(json: &serde_json::Value, key: &str, default: &str) -> String {
    json.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or(default)
        .to_string()
}

/// Parse hex string to u64
fn parse_hex_u64(s: &str) -> Result<u64> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(s, 16).context("Failed to parse hex u64")
}

/// Parse hex string to U256
fn parse_hex_u256(s: &str) -> Result<U256> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.is_empty() || s == "0" {
        return Ok(U256::ZERO);
    }
    // Pad to 64 chars for proper parsing
    let padded = format!("{:0>64}", s);
    let bytes = hex::decode(&padded).context("Failed to decode hex")?;
    Ok(U256::from_be_slice(&bytes))
}
