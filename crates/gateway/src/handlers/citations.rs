//! Citation management handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use validator::Validate;

use crate::AppState;
use citekeep_common::{
    citation::Citation,
    db::{Label, Repository},
    errors::{AppError, Result},
    extract, metrics,
};

/// Request to create a new citation
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCitationRequest {
    #[validate(range(min = 1))]
    pub entry_type_id: i64,

    #[validate(length(min = 1, max = 200))]
    pub citation_key: String,

    /// Raw submitted field pairs; sanitized and validated server-side
    #[serde(default)]
    pub fields: HashMap<String, String>,

    #[serde(default)]
    pub categories: Vec<String>,

    #[serde(default)]
    pub tags: Vec<String>,
}

/// Request to partially update a citation.
///
/// Absent members leave the stored value untouched. For `categories` and
/// `tags`, an explicit empty list clears the association set.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateCitationRequest {
    #[validate(range(min = 1))]
    pub entry_type_id: Option<i64>,

    pub citation_key: Option<String>,

    pub fields: Option<HashMap<String, String>>,

    pub categories: Option<Vec<String>>,

    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Response shape for a single citation
#[derive(Serialize)]
pub struct CitationResponse {
    pub id: i64,
    pub entry_type: String,
    pub citation_key: String,
    pub fields: Map<String, Value>,
    pub tags: Vec<Label>,
    pub categories: Vec<Label>,
    /// Human-readable reference line
    pub formatted: String,
}

impl From<Citation> for CitationResponse {
    fn from(citation: Citation) -> Self {
        let formatted = citation.to_human_readable();
        CitationResponse {
            id: citation.id,
            entry_type: citation.entry_type,
            citation_key: citation.citation_key,
            fields: citation.fields,
            tags: citation.tags,
            categories: citation.categories,
            formatted,
        }
    }
}

#[derive(Serialize)]
pub struct CitationListResponse {
    pub total: usize,
    pub citations: Vec<CitationResponse>,
}

/// Create a new citation with its metadata
pub async fn create_citation(
    State(state): State<AppState>,
    Json(request): Json<CreateCitationRequest>,
) -> Result<(StatusCode, Json<CitationResponse>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let citation_key = extract::extract_citation_key(&request.citation_key)?;
    let fields = extract::extract_fields(&request.fields)?;
    let categories = extract::extract_names(&request.categories);
    let tags = extract::extract_names(&request.tags);

    let repo = Repository::new(state.db.clone());
    let citation = repo
        .create_citation_with_metadata(
            request.entry_type_id,
            &citation_key,
            fields,
            &categories,
            &tags,
        )
        .await?;

    metrics::record_citation_created();

    Ok((StatusCode::CREATED, Json(citation.into())))
}

/// Get a citation by ID
pub async fn get_citation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CitationResponse>> {
    let repo = Repository::new(state.db.clone());

    let citation = repo
        .find_citation_by_id(id)
        .await?
        .ok_or_else(|| AppError::CitationNotFound { id: id.to_string() })?;

    Ok(Json(citation.into()))
}

/// Get a citation by its citation key
pub async fn get_citation_by_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<CitationResponse>> {
    let repo = Repository::new(state.db.clone());

    let citation = repo
        .find_citation_by_key(&key)
        .await?
        .ok_or_else(|| AppError::CitationNotFound { id: key })?;

    Ok(Json(citation.into()))
}

/// List citations ordered by id, optionally paged
pub async fn list_citations(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<CitationListResponse>> {
    let repo = Repository::new(state.db.clone());
    let citations = repo.list_citations(params.page, params.per_page).await?;

    Ok(Json(CitationListResponse {
        total: citations.len(),
        citations: citations.into_iter().map(Into::into).collect(),
    }))
}

/// Partially update a citation, replacing label sets when provided
pub async fn update_citation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateCitationRequest>,
) -> Result<Json<CitationResponse>> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let citation_key = request
        .citation_key
        .as_deref()
        .map(extract::extract_citation_key)
        .transpose()?;
    let fields = request
        .fields
        .as_ref()
        .map(extract::extract_fields)
        .transpose()?;
    let categories = request.categories.as_deref().map(extract::extract_names);
    let tags = request.tags.as_deref().map(extract::extract_names);

    let repo = Repository::new(state.db.clone());
    let citation = repo
        .update_citation_with_metadata(
            id,
            request.entry_type_id,
            citation_key,
            fields,
            categories.as_deref(),
            tags.as_deref(),
        )
        .await?;

    metrics::record_citation_updated();

    Ok(Json(citation.into()))
}

/// Delete a citation and sweep orphaned labels
pub async fn delete_citation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    let repo = Repository::new(state.db.clone());
    repo.delete_citation(id).await?;

    metrics::record_citation_deleted();

    Ok(StatusCode::NO_CONTENT)
}
