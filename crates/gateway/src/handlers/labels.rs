//! Tag and category listing handlers

use axum::{extract::State, Json};

use crate::AppState;
use citekeep_common::{
    db::{Label, LabelKind, Repository},
    errors::Result,
};

/// All tags, name-ordered
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<Label>>> {
    let repo = Repository::new(state.db.clone());
    Ok(Json(repo.list_labels(LabelKind::Tag).await?))
}

/// All categories, name-ordered
pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Label>>> {
    let repo = Repository::new(state.db.clone());
    Ok(Json(repo.list_labels(LabelKind::Category).await?))
}
