//! Dashboard render model
//!
//! Pure mapping from aggregator/resolver outputs to the HTML document
//! and the recent-blocks fragment. No I/O happens here; given the same
//! inputs the same document comes out. The fragment is built by one
//! function whether it ends up inline in the full page or in a poll
//! response, so the two paths cannot drift apart.

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::infrastructure::ethereum::BlockRecord;
use crate::resolver::{SearchOutcome, SearchResult};
use crate::snapshot::{AggregationError, ChainSnapshot};

/// The recent-blocks partial view: one entry per block, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub entries: Vec<FragmentEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentEntry {
    pub number: u64,
    pub tx_count: usize,
    pub hash: String,
}

/// Build the recent-blocks fragment from the window.
pub fn recent_blocks_fragment(blocks: &[BlockRecord]) -> Fragment {
    Fragment {
        entries: blocks
            .iter()
            .map(|block| FragmentEntry {
                number: block.number,
                tx_count: block.transactions.len(),
                hash: block.hash.clone(),
            })
            .collect(),
    }
}

/// Render the fragment as HTML rows.
pub fn render_fragment_html(fragment: &Fragment) -> String {
    let mut out = String::from("<ul class=\"recent-blocks\">\n");
    for entry in &fragment.entries {
        out.push_str(&format!(
            "<li data-number=\"{}\" data-tx-count=\"{}\"><strong>#{}</strong> \
             <span>{} tx</span> <code>{}</code></li>\n",
            entry.number,
            entry.tx_count,
            entry.number,
            entry.tx_count,
            escape_html(&entry.hash),
        ));
    }
    out.push_str("</ul>");
    out
}

/// Render the full document. Exactly one top-level state holds: a
/// connection-failure panel when `error` is present, otherwise the
/// data view built from the snapshot.
pub fn render(
    snapshot: Option<&ChainSnapshot>,
    search: Option<&SearchResult>,
    error: Option<&AggregationError>,
) -> String {
    let content = match (error, snapshot) {
        (Some(err), _) => render_error(err),
        (None, Some(snapshot)) => render_data(snapshot, search),
        // Unreachable through the server, but the render model stays
        // total: no snapshot and no error renders as a failure panel.
        (None, None) => render_error(&AggregationError::Rpc(anyhow::anyhow!(
            "no snapshot available"
        ))),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Anvil Lens</title>
<style>
body {{ font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, Helvetica, Arial, sans-serif; line-height: 1.6; padding: 20px; background-color: #f4f4f9; color: #333; }}
.container {{ max-width: 800px; margin: auto; background: white; padding: 20px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }}
h1, h2 {{ color: #1a1a1a; border-bottom: 2px solid #eee; padding-bottom: 10px; }}
.info-grid {{ display: grid; grid-template-columns: 200px 1fr; gap: 10px; align-items: center; word-break: break-all; }}
.info-grid strong {{ color: #555; }}
.error {{ color: #d32f2f; background-color: #ffcdd2; padding: 15px; border-radius: 4px; border-left: 5px solid #d32f2f; }}
.search-error {{ color: #b26a00; background-color: #fff3e0; padding: 10px; border-radius: 4px; }}
.recent-blocks {{ list-style: none; padding: 0; }}
.recent-blocks li {{ padding: 4px 0; border-bottom: 1px solid #eee; }}
code {{ background: #eee; padding: 2px 4px; border-radius: 4px; }}
</style>
</head>
<body><div class="container"><h1>Anvil Lens</h1>{content}</div></body>
</html>
"#
    )
}

fn render_error(error: &AggregationError) -> String {
    format!(
        r#"<div class="error">
<h2>Error connecting to the node</h2>
<p>Please ensure the node is running.</p>
<p><strong>Details:</strong> {}</p>
</div>"#,
        escape_html(&error.to_string())
    )
}

fn render_data(snapshot: &ChainSnapshot, search: Option<&SearchResult>) -> String {
    let mut content = format!(
        r#"<h2>EVM Information</h2>
<div class="info-grid">
<strong>Status:</strong><span>{status}</span>
<strong>RPC URL:</strong><code>{rpc_url}</code>
<strong>Chain ID:</strong><span>{chain_id}</span>
<strong>Network Name:</strong><span>{network_name}</span>
<strong>Current Block:</strong><span>{block_number}</span>
<strong>Gas Price (gwei):</strong><span>{gas_price}</span>
<strong>Balance of Account:</strong><span>{balance} ETH</span>
<strong>Account:</strong><code>{account}</code>
</div>
"#,
        status = escape_html(&snapshot.status),
        rpc_url = escape_html(&snapshot.rpc_url),
        chain_id = snapshot.chain_id,
        network_name = escape_html(&snapshot.network_name),
        block_number = snapshot.block_number,
        gas_price = escape_html(&snapshot.gas_price_gwei),
        balance = escape_html(&snapshot.balance_eth),
        account = snapshot.account,
    );

    if let Some(latest) = &snapshot.latest_block {
        content.push_str(&format!(
            r#"<h2>Latest Block (#{number})</h2>
<div class="info-grid">
<strong>Block Hash:</strong><code>{hash}</code>
<strong>Timestamp:</strong><span>{timestamp}</span>
<strong>Miner/Proposer:</strong><code>{miner}</code>
<strong>Transaction Count:</strong><span>{tx_count}</span>
</div>
"#,
            number = latest.number,
            hash = escape_html(&latest.hash),
            timestamp = format_timestamp(latest.timestamp),
            miner = escape_html(&latest.miner),
            tx_count = latest.transactions.len(),
        ));
    }

    content.push_str("<h2>Recent Blocks</h2>\n");
    content.push_str(&render_fragment_html(&recent_blocks_fragment(
        &snapshot.recent_blocks,
    )));
    content.push('\n');

    if let Some(search) = search {
        content.push_str(&render_search(search));
    }

    content
}

fn render_search(search: &SearchResult) -> String {
    match &search.outcome {
        SearchOutcome::Block(block) => {
            let transactions = if block.transactions.is_empty() {
                "(none)".to_string()
            } else {
                block
                    .transactions
                    .iter()
                    .map(|hash| format!("<code>{}</code>", escape_html(hash)))
                    .collect::<Vec<_>>()
                    .join("<br>")
            };
            format!(
                r#"<h2>Search Result (#{number})</h2>
<div class="info-grid">
<strong>Block Hash:</strong><code>{hash}</code>
<strong>Parent Hash:</strong><code>{parent_hash}</code>
<strong>Timestamp:</strong><span>{timestamp}</span>
<strong>Miner/Proposer:</strong><code>{miner}</code>
<strong>Nonce:</strong><code>{nonce}</code>
<strong>Difficulty:</strong><span>{difficulty}</span>
<strong>Gas Limit:</strong><span>{gas_limit}</span>
<strong>Gas Used:</strong><span>{gas_used}</span>
<strong>Extra Data:</strong><code>{extra_data}</code>
<strong>Transactions:</strong><span>{transactions}</span>
</div>
"#,
                number = block.number,
                hash = escape_html(&block.hash),
                parent_hash = escape_html(&block.parent_hash),
                timestamp = format_timestamp(block.timestamp),
                miner = escape_html(&block.miner),
                nonce = escape_html(&block.nonce),
                difficulty = block.difficulty,
                gas_limit = block.gas_limit,
                gas_used = block.gas_used,
                extra_data = escape_html(&block.extra_data),
                transactions = transactions,
            )
        }
        SearchOutcome::Error(message) => format!(
            r#"<h2>Search Result</h2>
<p class="search-error">{}</p>
"#,
            escape_html(message)
        ),
    }
}

/// Format a unix timestamp for display (UTC).
fn format_timestamp(timestamp: u64) -> String {
    DateTime::from_timestamp(timestamp as i64, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
