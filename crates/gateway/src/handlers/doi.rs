//! DOI lookup handler

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::AppState;
use citekeep_common::{
    errors::{AppError, Result},
    extract, metrics,
};

#[derive(Debug, Deserialize)]
pub struct DoiLookupRequest {
    #[serde(default)]
    pub doi: String,
}

#[derive(Serialize)]
pub struct DoiLookupResponse {
    /// Resolved metadata, sanitized like any submitted field map
    pub fields: Map<String, Value>,
}

/// Resolve a DOI to a validated flat field map
pub async fn lookup(
    State(state): State<AppState>,
    Json(request): Json<DoiLookupRequest>,
) -> Result<Json<DoiLookupResponse>> {
    let doi = extract::sanitize(&request.doi);
    if doi.is_empty() {
        return Err(AppError::MissingField {
            field: "doi".to_string(),
        });
    }

    let resolved = state.resolver.resolve(&doi).await?;
    metrics::record_doi_lookup(resolved.is_some());

    let Some(resolved) = resolved else {
        return Err(AppError::NotFound {
            resource_type: "doi metadata".to_string(),
            id: doi,
        });
    };

    // Resolver output is untrusted; run it through the same extraction
    // as form-submitted data.
    let fields = extract::extract_fields(&resolved)?;

    Ok(Json(DoiLookupResponse { fields }))
}
