//! Catalog API handlers.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use filmlist_core::{CatalogEntry, CatalogSummary};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CatalogQueryParams {
    /// Only entries flagged by the last update.
    #[serde(default)]
    pub new_only: bool,
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

/// An entry together with its transient new flag.
#[derive(Debug, Serialize)]
pub struct EntryView {
    #[serde(flatten)]
    pub entry: CatalogEntry,
    pub is_new: bool,
}

#[derive(Debug, Serialize)]
pub struct CatalogListResponse {
    pub entries: Vec<EntryView>,
    /// Matching entries before paging.
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/catalog
///
/// Page through the catalog in display order.
pub async fn list_entries(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CatalogQueryParams>,
) -> Json<CatalogListResponse> {
    let catalog = state.catalog().read().await;

    let matching = catalog
        .entries
        .iter()
        .filter(|entry| !params.new_only || entry.is_new);
    let total = matching.clone().count();
    let entries = matching
        .skip(params.offset)
        .take(params.limit)
        .map(|entry| EntryView {
            entry: entry.clone(),
            is_new: entry.is_new,
        })
        .collect();

    Json(CatalogListResponse {
        entries,
        total,
        offset: params.offset,
        limit: params.limit,
    })
}

/// GET /api/v1/catalog/summary
pub async fn get_summary(State(state): State<Arc<AppState>>) -> Json<CatalogSummary> {
    Json(state.catalog().summary().await)
}
