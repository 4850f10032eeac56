//! Render model tests: state exclusivity, search subsection, fragment

use alloy::primitives::Address;
use anvil_lens::config::DEFAULT_DEV_ACCOUNT;
use anvil_lens::mocks::mock_block;
use anvil_lens::resolver::{SearchOutcome, SearchResult};
use anvil_lens::snapshot::{AggregationError, ChainSnapshot};
use anvil_lens::view::{recent_blocks_fragment, render, render_fragment_html};

fn sample_snapshot() -> ChainSnapshot {
    let recent_blocks = vec![mock_block(42, 2), mock_block(41, 0), mock_block(40, 1)];
    ChainSnapshot {
        status: "connected".to_string(),
        rpc_url: "http://localhost:8545".to_string(),
        chain_id: 31337,
        network_name: "anvil".to_string(),
        block_number: 42,
        gas_price_gwei: "2".to_string(),
        account: DEFAULT_DEV_ACCOUNT.parse::<Address>().unwrap(),
        balance_eth: "10000".to_string(),
        latest_block: recent_blocks.first().cloned(),
        recent_blocks,
    }
}

#[test]
fn error_state_renders_nothing_else() {
    let err = AggregationError::Rpc(anyhow::anyhow!("connection refused"));
    let html = render(None, None, Some(&err));

    assert!(html.contains("Error connecting to the node"));
    assert!(html.contains("connection refused"));
    assert!(!html.contains("EVM Information"));
    assert!(!html.contains("Recent Blocks"));
}

#[test]
fn error_state_wins_even_with_a_snapshot_present() {
    let snapshot = sample_snapshot();
    let err = AggregationError::Rpc(anyhow::anyhow!("boom"));
    let html = render(Some(&snapshot), None, Some(&err));

    assert!(html.contains("Error connecting to the node"));
    assert!(!html.contains("EVM Information"));
}

#[test]
fn data_state_renders_snapshot_fields() {
    let snapshot = sample_snapshot();
    let html = render(Some(&snapshot), None, None);

    assert!(html.contains("EVM Information"));
    assert!(html.contains("http://localhost:8545"));
    assert!(html.contains("31337"));
    assert!(html.contains("anvil"));
    assert!(html.contains("Latest Block (#42)"));
    assert!(html.contains("Recent Blocks"));
    assert!(!html.contains("Search Result"));
}

#[test]
fn resolved_search_renders_full_block_detail() {
    let snapshot = sample_snapshot();
    let block = mock_block(17, 3);
    let search = SearchResult {
        query: "17".to_string(),
        outcome: SearchOutcome::Block(block.clone()),
    };
    let html = render(Some(&snapshot), Some(&search), None);

    assert!(html.contains("Search Result (#17)"));
    assert!(html.contains(&block.hash));
    assert!(html.contains(&block.parent_hash));
    assert!(html.contains("Gas Limit"));
    assert!(html.contains("Extra Data"));
    for tx in &block.transactions {
        assert!(html.contains(tx));
    }
}

#[test]
fn failed_search_renders_the_message_verbatim() {
    let snapshot = sample_snapshot();
    let search = SearchResult {
        query: "9999999".to_string(),
        outcome: SearchOutcome::Error("Block \"9999999\" not found.".to_string()),
    };
    let html = render(Some(&snapshot), Some(&search), None);

    // Quotes are HTML-escaped in the document.
    assert!(html.contains("Block &quot;9999999&quot; not found."));
    // The rest of the page is unaffected.
    assert!(html.contains("EVM Information"));
}

#[test]
fn fragment_maps_one_entry_per_block() {
    let blocks = vec![mock_block(42, 2), mock_block(41, 0)];
    let fragment = recent_blocks_fragment(&blocks);

    assert_eq!(fragment.entries.len(), 2);
    assert_eq!(fragment.entries[0].number, 42);
    assert_eq!(fragment.entries[0].tx_count, 2);
    assert_eq!(fragment.entries[0].hash, blocks[0].hash);
    assert_eq!(fragment.entries[1].number, 41);
    assert_eq!(fragment.entries[1].tx_count, 0);
}

#[test]
fn page_and_poll_share_the_fragment_rendering() {
    let snapshot = sample_snapshot();
    let fragment_html = render_fragment_html(&recent_blocks_fragment(&snapshot.recent_blocks));
    let page = render(Some(&snapshot), None, None);

    assert!(page.contains(&fragment_html));
}

#[test]
fn fragment_serializes_for_the_poll_endpoint() {
    let fragment = recent_blocks_fragment(&[mock_block(5, 1)]);
    let json = serde_json::to_value(&fragment).unwrap();

    let entry = &json["entries"][0];
    assert_eq!(entry["number"], 5);
    assert_eq!(entry["tx_count"], 1);
    assert!(entry["hash"].as_str().unwrap().starts_with("0x"));
}
