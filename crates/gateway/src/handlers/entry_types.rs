//! Entry type reference handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::AppState;
use citekeep_common::{
    db::{models::EntryType, Repository},
    errors::{AppError, Result},
};

#[derive(Serialize)]
pub struct DefaultFieldsResponse {
    pub entry_type_id: i64,
    pub fields: Vec<String>,
}

/// All entry types, name-ordered
pub async fn list_entry_types(State(state): State<AppState>) -> Result<Json<Vec<EntryType>>> {
    let repo = Repository::new(state.db.clone());
    Ok(Json(repo.list_entry_types().await?))
}

/// Advisory default field names for one entry type
pub async fn default_fields(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DefaultFieldsResponse>> {
    let repo = Repository::new(state.db.clone());

    let entry_type = repo
        .find_entry_type_by_id(id)
        .await?
        .ok_or_else(|| AppError::EntryTypeNotFound { id: id.to_string() })?;

    let fields = repo.default_fields_for(entry_type.id).await?;

    Ok(Json(DefaultFieldsResponse {
        entry_type_id: entry_type.id,
        fields,
    }))
}
