//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations with proper
//! error handling and transaction support. Point lookups (`find_*`)
//! return `Option`; mutating paths convert a missing row into the
//! not-found error.

use crate::citation::{fields_object, Citation};
use crate::db::labels::{self, placeholders, Label, LabelKind};
use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::query::{SearchQuery, SortBy};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, DbErr,
    EntityTrait, QueryFilter, QueryOrder, Set, SqlErr, Statement, TransactionTrait, Value,
};
use serde_json::Map;

/// The base projection every citation read shares
const CITATION_SELECT: &str = "SELECT c.id, et.name AS entry_type, c.citation_key, c.fields \
     FROM citations c JOIN entry_types et ON c.entry_type_id = et.id";

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Entry Type Operations
    // ========================================================================

    /// All entry types, name-ordered
    pub async fn list_entry_types(&self) -> Result<Vec<EntryType>> {
        EntryTypeEntity::find()
            .order_by_asc(EntryTypeColumn::Name)
            .order_by_asc(EntryTypeColumn::Id)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find entry type by ID
    pub async fn find_entry_type_by_id(&self, id: i64) -> Result<Option<EntryType>> {
        EntryTypeEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find entry type by name
    pub async fn find_entry_type_by_name(&self, name: &str) -> Result<Option<EntryType>> {
        EntryTypeEntity::find()
            .filter(EntryTypeColumn::Name.eq(name))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Advisory default field names for an entry type, sorted by name
    pub async fn default_fields_for(&self, entry_type_id: i64) -> Result<Vec<String>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT df.name FROM default_entry_fields ef \
             JOIN default_fields df ON ef.default_field_id = df.id \
             WHERE ef.entry_type_id = $1 ORDER BY df.name",
            [entry_type_id.into()],
        );

        let rows = self.read_conn().query_all(stmt).await?;
        rows.iter()
            .map(|row| Ok(row.try_get_by_index::<String>(0)?))
            .collect()
    }

    // ========================================================================
    // Label Operations
    // ========================================================================

    /// All labels of a kind (all tags, or all categories), name-ordered
    pub async fn list_labels(&self, kind: LabelKind) -> Result<Vec<Label>> {
        labels::list(self.read_conn(), kind).await
    }

    /// Exact-name label lookup
    pub async fn find_label_by_name(&self, kind: LabelKind, name: &str) -> Result<Option<Label>> {
        labels::find_by_name(self.read_conn(), kind, name).await
    }

    // ========================================================================
    // Citation Operations
    // ========================================================================

    /// Find a citation by ID, with labels hydrated
    pub async fn find_citation_by_id(&self, id: i64) -> Result<Option<Citation>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            format!("{} WHERE c.id = $1", CITATION_SELECT),
            [id.into()],
        );

        self.fetch_one(stmt).await
    }

    /// Find a citation by its citation key, with labels hydrated
    pub async fn find_citation_by_key(&self, key: &str) -> Result<Option<Citation>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            format!("{} WHERE c.citation_key = $1", CITATION_SELECT),
            [key.into()],
        );

        self.fetch_one(stmt).await
    }

    /// List citations ordered by id ascending.
    ///
    /// If both `page` and `per_page` are given they are clamped to a
    /// minimum of 1 and a LIMIT/OFFSET window is applied; otherwise all
    /// citations are returned.
    pub async fn list_citations(
        &self,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> Result<Vec<Citation>> {
        let mut sql = format!("{} ORDER BY c.id", CITATION_SELECT);
        let mut values: Vec<Value> = Vec::new();

        if let (Some(page), Some(per_page)) = (page, per_page) {
            let page = page.max(1);
            let per_page = per_page.max(1);
            let offset = (page - 1) * per_page;

            sql.push_str(" LIMIT $1 OFFSET $2");
            values.push(per_page.into());
            values.push(offset.into());
        }

        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, values);
        self.fetch_many(stmt).await
    }

    /// Citations matching the given ids, id-ordered
    pub async fn find_citations_by_ids(&self, ids: &[i64]) -> Result<Vec<Citation>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "{} WHERE c.id IN ({}) ORDER BY c.id",
            CITATION_SELECT,
            placeholders(1, ids.len())
        );
        let values: Vec<Value> = ids.iter().map(|id| (*id).into()).collect();

        self.fetch_many(Statement::from_sql_and_values(DbBackend::Postgres, sql, values))
            .await
    }

    /// Citations matching the given citation keys, id-ordered
    pub async fn find_citations_by_keys(&self, keys: &[String]) -> Result<Vec<Citation>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "{} WHERE c.citation_key IN ({}) ORDER BY c.id",
            CITATION_SELECT,
            placeholders(1, keys.len())
        );
        let values: Vec<Value> = keys.iter().map(|key| key.clone().into()).collect();

        self.fetch_many(Statement::from_sql_and_values(DbBackend::Postgres, sql, values))
            .await
    }

    /// Create a citation without label associations
    pub async fn create_citation(
        &self,
        entry_type_id: i64,
        citation_key: &str,
        fields: Map<String, serde_json::Value>,
    ) -> Result<Citation> {
        let entry_type = self
            .find_entry_type_by_id(entry_type_id)
            .await?
            .ok_or_else(|| AppError::EntryTypeNotFound {
                id: entry_type_id.to_string(),
            })?;

        let row = insert_citation(self.write_conn(), entry_type_id, citation_key, fields).await?;

        Ok(hydrated(row, entry_type.name, Vec::new(), Vec::new()))
    }

    /// Create a citation together with its category and tag associations
    /// as one transaction.
    ///
    /// The key pre-check is a fast path only; the store's UNIQUE
    /// constraint is the authoritative duplicate signal.
    pub async fn create_citation_with_metadata(
        &self,
        entry_type_id: i64,
        citation_key: &str,
        fields: Map<String, serde_json::Value>,
        category_names: &[String],
        tag_names: &[String],
    ) -> Result<Citation> {
        let entry_type = self
            .find_entry_type_by_id(entry_type_id)
            .await?
            .ok_or_else(|| AppError::EntryTypeNotFound {
                id: entry_type_id.to_string(),
            })?;

        let txn = self.write_conn().begin().await?;

        let existing = txn
            .query_one(Statement::from_sql_and_values(
                DbBackend::Postgres,
                "SELECT id FROM citations WHERE citation_key = $1",
                [citation_key.into()],
            ))
            .await?;
        if existing.is_some() {
            return Err(AppError::DuplicateCitationKey {
                key: citation_key.to_string(),
            });
        }

        let row = insert_citation(&txn, entry_type_id, citation_key, fields).await?;

        let categories = labels::get_or_create_all(&txn, LabelKind::Category, category_names).await?;
        labels::attach(&txn, LabelKind::Category, row.id, &categories).await?;

        let tags = labels::get_or_create_all(&txn, LabelKind::Tag, tag_names).await?;
        labels::attach(&txn, LabelKind::Tag, row.id, &tags).await?;

        txn.commit().await?;

        tracing::info!(
            citation_id = row.id,
            citation_key = %row.citation_key,
            "Citation created"
        );

        Ok(hydrated(row, entry_type.name, tags, categories))
    }

    /// Partially update a citation. Only supplied values are modified;
    /// calling with nothing to change issues no statements at all.
    pub async fn update_citation(
        &self,
        id: i64,
        entry_type_id: Option<i64>,
        citation_key: Option<String>,
        fields: Option<Map<String, serde_json::Value>>,
    ) -> Result<()> {
        if entry_type_id.is_none() && citation_key.is_none() && fields.is_none() {
            return Ok(());
        }

        let row = CitationEntity::find_by_id(id)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::CitationNotFound { id: id.to_string() })?;

        let key_for_error = citation_key.clone().unwrap_or_else(|| row.citation_key.clone());
        let mut active: CitationActiveModel = row.into();

        if let Some(entry_type_id) = entry_type_id {
            active.entry_type_id = Set(entry_type_id);
        }
        if let Some(citation_key) = citation_key {
            active.citation_key = Set(citation_key);
        }
        if let Some(fields) = fields {
            active.fields = Set(serde_json::Value::Object(fields));
        }

        active
            .update(self.write_conn())
            .await
            .map_err(|e| duplicate_or_db(e, &key_for_error))?;

        Ok(())
    }

    /// Partial update plus full replacement of label associations when a
    /// list is explicitly provided. `None` leaves an association set
    /// untouched; `Some(&[])` clears it (and sweeps orphans).
    pub async fn update_citation_with_metadata(
        &self,
        id: i64,
        entry_type_id: Option<i64>,
        citation_key: Option<String>,
        fields: Option<Map<String, serde_json::Value>>,
        category_names: Option<&[String]>,
        tag_names: Option<&[String]>,
    ) -> Result<Citation> {
        let no_columns = entry_type_id.is_none() && citation_key.is_none() && fields.is_none();
        if no_columns && category_names.is_none() && tag_names.is_none() {
            return self
                .find_citation_by_id(id)
                .await?
                .ok_or_else(|| AppError::CitationNotFound { id: id.to_string() });
        }

        let txn = self.write_conn().begin().await?;

        let row = CitationEntity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::CitationNotFound { id: id.to_string() })?;

        if !no_columns {
            let key_for_error = citation_key
                .clone()
                .unwrap_or_else(|| row.citation_key.clone());
            let mut active: CitationActiveModel = row.into();

            if let Some(entry_type_id) = entry_type_id {
                active.entry_type_id = Set(entry_type_id);
            }
            if let Some(citation_key) = citation_key {
                active.citation_key = Set(citation_key);
            }
            if let Some(fields) = fields {
                active.fields = Set(serde_json::Value::Object(fields));
            }

            active
                .update(&txn)
                .await
                .map_err(|e| duplicate_or_db(e, &key_for_error))?;
        }

        if let Some(names) = category_names {
            let resolved = labels::get_or_create_all(&txn, LabelKind::Category, names).await?;
            labels::replace(&txn, LabelKind::Category, id, &resolved).await?;
        }

        if let Some(names) = tag_names {
            let resolved = labels::get_or_create_all(&txn, LabelKind::Tag, names).await?;
            labels::replace(&txn, LabelKind::Tag, id, &resolved).await?;
        }

        txn.commit().await?;

        tracing::info!(citation_id = id, "Citation updated");

        self.find_citation_by_id(id)
            .await?
            .ok_or_else(|| AppError::CitationNotFound { id: id.to_string() })
    }

    /// Delete a citation, its label associations, and any labels orphaned
    /// by the removal, in one transaction.
    ///
    /// A non-positive id is a no-op that issues no statements.
    pub async fn delete_citation(&self, id: i64) -> Result<()> {
        if id <= 0 {
            return Ok(());
        }

        let txn = self.write_conn().begin().await?;

        let existing = txn
            .query_one(Statement::from_sql_and_values(
                DbBackend::Postgres,
                "SELECT id FROM citations WHERE id = $1",
                [id.into()],
            ))
            .await?;
        if existing.is_none() {
            return Err(AppError::CitationNotFound { id: id.to_string() });
        }

        // Association snapshot before the mutation; the sweep below runs
        // against these ids, not a post-delete re-query.
        let category_ids = labels::link_ids_for(&txn, LabelKind::Category, id).await?;
        let tag_ids = labels::link_ids_for(&txn, LabelKind::Tag, id).await?;

        labels::detach_all(&txn, LabelKind::Category, id).await?;
        labels::detach_all(&txn, LabelKind::Tag, id).await?;

        txn.execute(Statement::from_sql_and_values(
            DbBackend::Postgres,
            "DELETE FROM citations WHERE id = $1",
            [id.into()],
        ))
        .await?;

        labels::sweep_orphans(&txn, LabelKind::Category, &category_ids).await?;
        labels::sweep_orphans(&txn, LabelKind::Tag, &tag_ids).await?;

        txn.commit().await?;

        tracing::info!(citation_id = id, "Citation deleted");

        Ok(())
    }

    /// Search citations with the canonical filter set
    pub async fn search_citations(&self, query: &SearchQuery) -> Result<Vec<Citation>> {
        let (sql, values) = build_search_statement(query);
        self.fetch_many(Statement::from_sql_and_values(DbBackend::Postgres, sql, values))
            .await
    }

    // ========================================================================
    // Hydration helpers
    // ========================================================================

    async fn fetch_one(&self, stmt: Statement) -> Result<Option<Citation>> {
        let Some(row) = self.read_conn().query_one(stmt).await? else {
            return Ok(None);
        };

        let mut citation = citation_from_row(&row)?;
        citation.tags = labels::for_citation(self.read_conn(), LabelKind::Tag, citation.id).await?;
        citation.categories =
            labels::for_citation(self.read_conn(), LabelKind::Category, citation.id).await?;

        Ok(Some(citation))
    }

    async fn fetch_many(&self, stmt: Statement) -> Result<Vec<Citation>> {
        let rows = self.read_conn().query_all(stmt).await?;
        let mut citations = rows
            .iter()
            .map(citation_from_row)
            .collect::<Result<Vec<_>>>()?;

        let ids: Vec<i64> = citations.iter().map(|c| c.id).collect();
        let mut tags = labels::for_citations(self.read_conn(), LabelKind::Tag, &ids).await?;
        let mut categories =
            labels::for_citations(self.read_conn(), LabelKind::Category, &ids).await?;

        for citation in &mut citations {
            citation.tags = tags.remove(&citation.id).unwrap_or_default();
            citation.categories = categories.remove(&citation.id).unwrap_or_default();
        }

        Ok(citations)
    }
}

fn citation_from_row(row: &sea_orm::QueryResult) -> Result<Citation> {
    let fields: serde_json::Value = row.try_get_by_index(3)?;

    Ok(Citation {
        id: row.try_get_by_index(0)?,
        entry_type: row.try_get_by_index(1)?,
        citation_key: row.try_get_by_index(2)?,
        fields: fields_object(&fields),
        tags: Vec::new(),
        categories: Vec::new(),
    })
}

fn hydrated(
    row: CitationRow,
    entry_type: String,
    tags: Vec<Label>,
    categories: Vec<Label>,
) -> Citation {
    Citation {
        id: row.id,
        entry_type,
        citation_key: row.citation_key,
        fields: fields_object(&row.fields),
        tags,
        categories,
    }
}

async fn insert_citation(
    conn: &impl ConnectionTrait,
    entry_type_id: i64,
    citation_key: &str,
    fields: Map<String, serde_json::Value>,
) -> Result<CitationRow> {
    let citation = CitationActiveModel {
        entry_type_id: Set(entry_type_id),
        citation_key: Set(citation_key.to_string()),
        fields: Set(serde_json::Value::Object(fields)),
        created_at: Set(chrono::Utc::now().into()),
        ..Default::default()
    };

    citation
        .insert(conn)
        .await
        .map_err(|e| duplicate_or_db(e, citation_key))
}

/// Map a unique-constraint violation on `citation_key` to the duplicate
/// error; everything else stays a store error.
fn duplicate_or_db(err: DbErr, key: &str) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::DuplicateCitationKey {
            key: key.to_string(),
        },
        _ => AppError::Database(err),
    }
}

/// Build the parameterized search statement.
///
/// Present filters compose by conjunction; each pushes a fragment with a
/// `$n` placeholder and its bound value. User input never reaches the
/// SQL text itself.
fn build_search_statement(query: &SearchQuery) -> (String, Vec<Value>) {
    let mut sql = CITATION_SELECT.to_string();
    let mut filters: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(ref q) = query.q {
        values.push(format!("%{}%", q).into());
        filters.push(format!("c.fields::text ILIKE ${}", values.len()));
    }

    if let Some(ref key) = query.citation_key {
        values.push(format!("%{}%", key).into());
        filters.push(format!("c.citation_key ILIKE ${}", values.len()));
    }

    if let Some(ref entry_type) = query.entry_type {
        values.push(entry_type.clone().into());
        filters.push(format!("et.name = ${}", values.len()));
    }

    if let Some(ref author) = query.author {
        values.push(format!("%{}%", author).into());
        filters.push(format!("c.fields ->> 'author' ILIKE ${}", values.len()));
    }

    if let Some(year_from) = query.year_from {
        values.push(year_from.into());
        filters.push(format!("(c.fields ->> 'year')::int >= ${}", values.len()));
    }

    if let Some(year_to) = query.year_to {
        values.push(year_to.into());
        filters.push(format!("(c.fields ->> 'year')::int <= ${}", values.len()));
    }

    if !query.tags.is_empty() {
        let names = placeholders(values.len() + 1, query.tags.len());
        for name in &query.tags {
            values.push(name.clone().into());
        }
        filters.push(format!(
            "EXISTS (SELECT 1 FROM citations_to_tags l \
             JOIN tags t ON t.id = l.tag_id \
             WHERE l.citation_id = c.id AND t.name IN ({}))",
            names
        ));
    }

    if !query.categories.is_empty() {
        let names = placeholders(values.len() + 1, query.categories.len());
        for name in &query.categories {
            values.push(name.clone().into());
        }
        filters.push(format!(
            "EXISTS (SELECT 1 FROM citations_to_categories l \
             JOIN categories t ON t.id = l.category_id \
             WHERE l.citation_id = c.id AND t.name IN ({}))",
            names
        ));
    }

    if !filters.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&filters.join(" AND "));
    }

    match query.sort_by {
        Some(SortBy::Year) => {
            sql.push_str(&format!(
                " ORDER BY (c.fields ->> 'year')::int {}",
                query.direction.as_sql()
            ));
        }
        Some(SortBy::CitationKey) => {
            sql.push_str(&format!(
                " ORDER BY c.citation_key {}",
                query.direction.as_sql()
            ));
        }
        None => sql.push_str(" ORDER BY c.id ASC"),
    }

    (sql, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Direction;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn mock_pool() -> (DatabaseConnection, DbPool) {
        let conn = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let pool = DbPool {
            primary: conn.clone(),
            replica: None,
        };
        (conn, pool)
    }

    #[test]
    fn unfiltered_search_orders_by_id() {
        let (sql, values) = build_search_statement(&SearchQuery::default());
        assert!(!sql.contains("WHERE"));
        assert!(sql.ends_with("ORDER BY c.id ASC"));
        assert!(values.is_empty());
    }

    #[test]
    fn single_year_filter() {
        let query = SearchQuery {
            year_from: Some(2005),
            ..Default::default()
        };
        let (sql, values) = build_search_statement(&query);
        assert!(sql.contains("(c.fields ->> 'year')::int >= $1"));
        assert!(!sql.contains("<="));
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn filters_compose_by_conjunction() {
        let query = SearchQuery {
            q: Some("testing".to_string()),
            citation_key: Some("doe".to_string()),
            entry_type: Some("book".to_string()),
            author: Some("doe".to_string()),
            year_from: Some(2000),
            year_to: Some(2010),
            ..Default::default()
        };
        let (sql, values) = build_search_statement(&query);

        assert_eq!(sql.matches(" AND ").count(), 5);
        assert!(sql.contains("c.fields::text ILIKE $1"));
        assert!(sql.contains("c.citation_key ILIKE $2"));
        assert!(sql.contains("et.name = $3"));
        assert!(sql.contains("c.fields ->> 'author' ILIKE $4"));
        assert!(sql.contains(">= $5"));
        assert!(sql.contains("<= $6"));
        assert_eq!(values.len(), 6);
    }

    #[test]
    fn tag_and_category_membership() {
        let query = SearchQuery {
            tags: vec!["x".to_string(), "y".to_string()],
            categories: vec!["CS".to_string()],
            ..Default::default()
        };
        let (sql, values) = build_search_statement(&query);

        assert!(sql.contains("citations_to_tags"));
        assert!(sql.contains("t.name IN ($1, $2)"));
        assert!(sql.contains("citations_to_categories"));
        assert!(sql.contains("t.name IN ($3)"));
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn sort_whitelist_and_direction() {
        let query = SearchQuery {
            sort_by: Some(SortBy::Year),
            direction: Direction::Desc,
            ..Default::default()
        };
        let (sql, _) = build_search_statement(&query);
        assert!(sql.ends_with("ORDER BY (c.fields ->> 'year')::int DESC"));

        let query = SearchQuery {
            sort_by: Some(SortBy::CitationKey),
            ..Default::default()
        };
        let (sql, _) = build_search_statement(&query);
        assert!(sql.ends_with("ORDER BY c.citation_key ASC"));
    }

    #[test]
    fn absent_sort_ignores_direction() {
        // An unrecognized sort_by has already normalized to None; the
        // ordering falls back to id ascending regardless of direction.
        let query = SearchQuery {
            direction: Direction::Desc,
            ..Default::default()
        };
        let (sql, _) = build_search_statement(&query);
        assert!(sql.ends_with("ORDER BY c.id ASC"));
    }

    #[tokio::test]
    async fn delete_with_zero_id_issues_no_statements() {
        let (conn, pool) = mock_pool();
        let repo = Repository::new(pool);

        repo.delete_citation(0).await.unwrap();
        repo.delete_citation(-3).await.unwrap();

        assert!(conn.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn update_with_nothing_to_change_issues_no_statements() {
        let (conn, pool) = mock_pool();
        let repo = Repository::new(pool);

        repo.update_citation(99, None, None, None).await.unwrap();

        assert!(conn.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn create_with_existing_key_fails_before_insert() {
        use std::collections::BTreeMap;

        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![EntryType {
                id: 1,
                name: "book".to_string(),
            }]])
            .append_query_results([vec![BTreeMap::from([("id", Value::from(7i64))])]])
            .into_connection();
        let pool = DbPool {
            primary: conn.clone(),
            replica: None,
        };
        let repo = Repository::new(pool);

        let err = repo
            .create_citation_with_metadata(1, "Doe-2020", Map::new(), &[], &[])
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::DuplicateCitationKey { ref key } if key == "Doe-2020"));

        let log = format!("{:?}", conn.into_transaction_log());
        assert!(!log.contains("INSERT INTO"));
    }

    #[tokio::test]
    async fn delete_sweeps_orphans_from_the_snapshot() {
        use sea_orm::MockExecResult;
        use std::collections::BTreeMap;

        let exec = MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        };

        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            // existence check
            .append_query_results([vec![BTreeMap::from([("id", Value::from(42i64))])]])
            // category link snapshot
            .append_query_results([vec![BTreeMap::from([("category_id", Value::from(2i64))])]])
            // tag link snapshot
            .append_query_results([vec![BTreeMap::from([("tag_id", Value::from(10i64))])]])
            // detach x2, delete citation, sweep x2
            .append_exec_results([exec.clone(), exec.clone(), exec.clone(), exec.clone(), exec])
            .into_connection();
        let pool = DbPool {
            primary: conn.clone(),
            replica: None,
        };
        let repo = Repository::new(pool);

        repo.delete_citation(42).await.unwrap();

        let statements: Vec<String> = conn
            .into_transaction_log()
            .iter()
            .map(|txn| format!("{:?}", txn))
            .collect();
        let all = statements.join("\n");

        assert!(all.contains("DELETE FROM citations_to_categories"));
        assert!(all.contains("DELETE FROM citations_to_tags"));
        assert!(all.contains("DELETE FROM citations WHERE id"));
        assert!(all.contains("DELETE FROM categories WHERE id IN ($1) AND NOT EXISTS"));
        assert!(all.contains("DELETE FROM tags WHERE id IN ($1) AND NOT EXISTS"));

        // the sweep runs after the citation row is gone
        let citation_delete = all.find("DELETE FROM citations WHERE id").unwrap();
        let category_sweep = all.find("DELETE FROM categories WHERE id IN").unwrap();
        assert!(category_sweep > citation_delete);
    }
}
