//! BibTeX export handler

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::AppState;
use citekeep_common::{
    citation::render_bibliography,
    db::Repository,
    errors::Result,
    metrics,
};

/// Selection parameters: comma-separated ids take precedence over keys.
/// Entries that do not parse are skipped; export is a read-only
/// convenience, not a validation surface.
#[derive(Debug, Deserialize)]
pub struct ExportParams {
    pub citation_ids: Option<String>,
    pub citation_keys: Option<String>,
}

/// Export selected citations as a .bib attachment
pub async fn export_bibtex(
    State(state): State<AppState>,
    Query(params): Query<ExportParams>,
) -> Result<impl IntoResponse> {
    let repo = Repository::new(state.db.clone());

    let ids: Vec<i64> = params
        .citation_ids
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect();

    let citations = if !ids.is_empty() {
        repo.find_citations_by_ids(&ids).await?
    } else {
        let keys: Vec<String> = params
            .citation_keys
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .collect();
        repo.find_citations_by_keys(&keys).await?
    };

    metrics::record_export(citations.len());

    let bibtex = render_bibliography(&citations);

    Ok((
        [
            (header::CONTENT_TYPE, "application/x-bibtex"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=selected_citations.bib",
            ),
        ],
        bibtex,
    ))
}
