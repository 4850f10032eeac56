//! Route handlers for the dashboard
//!
//! Thin shell over the aggregator, resolver and render model: `GET /`
//! serves the full document, `GET /api/recent-blocks` serves just the
//! fragment the refresh poll consumes.

use std::sync::Arc;

use alloy::primitives::Address;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, Json},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::infrastructure::ethereum::NodeClient;
use crate::resolver;
use crate::snapshot::{self, AggregationError};
use crate::view::{self, Fragment};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<dyn NodeClient>,
    pub account: Address,
    pub window: u64,
}

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    /// Free-text block identifier to look up alongside the snapshot.
    pub q: Option<String>,
}

/// Error response format for the fragment endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: i64,
}

/// GET / - full dashboard page, optionally with a block search
pub async fn dashboard(
    State(state): State<AppState>,
    Query(params): Query<DashboardQuery>,
) -> (StatusCode, Html<String>) {
    let snapshot =
        match snapshot::fetch_snapshot(state.client.as_ref(), state.account, state.window).await {
            Ok(snapshot) => snapshot,
            Err(err) => return error_page(err),
        };

    let query = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty());
    let search = match query {
        Some(q) => {
            debug!("Resolving block identifier {q:?}");
            match resolver::resolve_and_fetch(state.client.as_ref(), q).await {
                Ok(result) => Some(result),
                // Connection-level failure during the search fails the
                // whole page, not just the search subsection.
                Err(err) => return error_page(err),
            }
        }
        None => None,
    };

    info!(
        "Rendering dashboard at block {} ({} recent)",
        snapshot.block_number,
        snapshot.recent_blocks.len()
    );

    (
        StatusCode::OK,
        Html(view::render(Some(&snapshot), search.as_ref(), None)),
    )
}

/// GET /api/recent-blocks - the fragment consumed by the refresh poll
pub async fn recent_blocks(
    State(state): State<AppState>,
) -> Result<Json<Fragment>, (StatusCode, Json<ErrorResponse>)> {
    match snapshot::fetch_recent_blocks(state.client.as_ref(), state.window).await {
        Ok(blocks) => Ok(Json(view::recent_blocks_fragment(&blocks))),
        Err(err) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "AGGREGATION_ERROR".to_string(),
                message: err.to_string(),
                timestamp: chrono::Utc::now().timestamp(),
            }),
        )),
    }
}

fn error_page(err: AggregationError) -> (StatusCode, Html<String>) {
    info!("Aggregation failed: {err}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(view::render(None, None, Some(&err))),
    )
}

/// Create the router with all routes
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard))
        .route("/health", get(health))
        .route("/api/recent-blocks", get(recent_blocks))
}
