//! Block identifier resolution
//!
//! Classifies a user-supplied search string as a block number or an
//! opaque hash, then fetches the matching block. A well-formed
//! identifier with no matching block is a normal outcome surfaced as a
//! search message; only transport failures escalate to
//! [`AggregationError`]. Callers must not conflate the two.

use thiserror::Error;

use crate::infrastructure::ethereum::{BlockId, BlockRecord, NodeClient};
use crate::snapshot::AggregationError;

/// An all-digit identifier that does not fit in a block number.
/// No clamping or wraparound: the input is simply rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("\"{query}\" is not a valid block number.")]
pub struct InvalidBlockNumber {
    pub query: String,
}

/// Outcome of a search: the raw query plus either the resolved block
/// or a user-facing message explaining why there is none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub query: String,
    pub outcome: SearchOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Block(BlockRecord),
    Error(String),
}

/// Classify a raw identifier. A non-empty string of decimal digits is
/// a block number; anything else passes through as a hash unmodified.
pub fn classify(raw: &str) -> Result<BlockId, InvalidBlockNumber> {
    if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        let number = raw.parse::<u64>().map_err(|_| InvalidBlockNumber {
            query: raw.to_string(),
        })?;
        Ok(BlockId::Number(number))
    } else {
        Ok(BlockId::Hash(raw.to_string()))
    }
}

/// Classify `raw` and fetch the corresponding block.
///
/// Unknown blocks and malformed numbers come back inside the
/// [`SearchResult`]; an `Err` here means the node itself was
/// unreachable and the whole render pass should fail.
pub async fn resolve_and_fetch(
    client: &dyn NodeClient,
    raw: &str,
) -> Result<SearchResult, AggregationError> {
    let query = raw.to_string();

    let id = match classify(raw) {
        Ok(id) => id,
        Err(err) => {
            return Ok(SearchResult {
                query,
                outcome: SearchOutcome::Error(err.to_string()),
            });
        }
    };

    match client.get_block(id).await? {
        Some(block) => Ok(SearchResult {
            query,
            outcome: SearchOutcome::Block(block),
        }),
        None => {
            let message = format!("Block \"{}\" not found.", query);
            Ok(SearchResult {
                query,
                outcome: SearchOutcome::Error(message),
            })
        }
    }
}
