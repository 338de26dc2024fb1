//! Search handler

use axum::{extract::State, Json};
use serde::Serialize;
use std::time::Instant;

use crate::handlers::citations::CitationResponse;
use crate::AppState;
use citekeep_common::{
    db::Repository,
    errors::Result,
    metrics,
    query::SearchQuery,
};

/// Search response
#[derive(Serialize)]
pub struct SearchResponse {
    /// The canonical query actually executed, after normalization
    pub query: SearchQuery,
    pub total_results: usize,
    pub results: Vec<CitationResponse>,
    pub processing_time_ms: u64,
}

/// Perform a search.
///
/// The body is a free-form JSON object of raw filter parameters; the
/// normalizer downgrades anything malformed to an absent filter, so this
/// endpoint never rejects a query.
pub async fn search(
    State(state): State<AppState>,
    Json(params): Json<serde_json::Value>,
) -> Result<Json<SearchResponse>> {
    let start = Instant::now();

    let query = SearchQuery::from_params(&params);

    let repo = Repository::new(state.db.clone());
    let results = repo.search_citations(&query).await?;

    let processing_time_ms = start.elapsed().as_millis() as u64;

    metrics::record_search(processing_time_ms as f64 / 1000.0, results.len());

    tracing::info!(
        filters = ?query,
        results = results.len(),
        latency_ms = processing_time_ms,
        "Search completed"
    );

    Ok(Json(SearchResponse {
        query,
        total_results: results.len(),
        results: results.into_iter().map(Into::into).collect(),
        processing_time_ms,
    }))
}
