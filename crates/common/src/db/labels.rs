//! Named classification labels (tags and categories)
//!
//! Tags and categories share one structure and lifecycle: `(id, name)`
//! rows created lazily on first use, attached to citations through a
//! join table, and deleted by an orphan sweep once the last association
//! is gone. This module implements that lifecycle once; [`LabelKind`]
//! selects the namespace. Table and column names come from the kind,
//! never from user input; user values are always bound parameters.
//!
//! Every function takes `&impl ConnectionTrait` so callers can compose
//! them into a surrounding transaction.

use crate::errors::Result;
use sea_orm::{ConnectionTrait, DbBackend, Statement, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The two label namespaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelKind {
    Category,
    Tag,
}

impl LabelKind {
    /// Entity table holding `(id, name)` rows
    pub fn table(&self) -> &'static str {
        match self {
            LabelKind::Category => "categories",
            LabelKind::Tag => "tags",
        }
    }

    /// Join table linking labels to citations
    pub fn join_table(&self) -> &'static str {
        match self {
            LabelKind::Category => "citations_to_categories",
            LabelKind::Tag => "citations_to_tags",
        }
    }

    /// Label foreign-key column in the join table
    pub fn fk_column(&self) -> &'static str {
        match self {
            LabelKind::Category => "category_id",
            LabelKind::Tag => "tag_id",
        }
    }
}

/// A persisted tag or category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: i64,
    pub name: String,
}

fn stmt<V>(sql: impl Into<String>, values: V) -> Statement
where
    V: IntoIterator<Item = Value>,
{
    Statement::from_sql_and_values(DbBackend::Postgres, sql.into(), values)
}

/// `$start, $start+1, ...` for `count` bound values
pub(crate) fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|n| format!("${}", n))
        .collect::<Vec<_>>()
        .join(", ")
}

fn label_from_row(row: &sea_orm::QueryResult) -> Result<Label> {
    Ok(Label {
        id: row.try_get_by_index::<i64>(0)?,
        name: row.try_get_by_index::<String>(1)?,
    })
}

/// All labels of a kind, name-ordered
pub async fn list(conn: &impl ConnectionTrait, kind: LabelKind) -> Result<Vec<Label>> {
    let sql = format!(
        "SELECT id, name FROM {} ORDER BY name, id",
        kind.table()
    );

    let rows = conn.query_all(stmt(sql, [])).await?;
    rows.iter().map(label_from_row).collect()
}

/// Exact case-sensitive lookup by name
pub async fn find_by_name(
    conn: &impl ConnectionTrait,
    kind: LabelKind,
    name: &str,
) -> Result<Option<Label>> {
    let sql = format!("SELECT id, name FROM {} WHERE name = $1", kind.table());

    let row = conn.query_one(stmt(sql, [name.into()])).await?;
    row.as_ref().map(label_from_row).transpose()
}

async fn create(conn: &impl ConnectionTrait, kind: LabelKind, name: &str) -> Result<Label> {
    let sql = format!(
        "INSERT INTO {} (name) VALUES ($1) RETURNING id, name",
        kind.table()
    );

    let row = conn
        .query_one(stmt(sql, [name.into()]))
        .await?
        .ok_or_else(|| sea_orm::DbErr::RecordNotInserted)?;
    label_from_row(&row)
}

/// Resolve candidate names to persisted labels, creating exactly the set
/// of names that do not already exist. Input names are expected to be
/// pre-sanitized and deduplicated (see [`crate::extract::extract_names`]);
/// first-occurrence order is preserved in the result.
pub async fn get_or_create_all(
    conn: &impl ConnectionTrait,
    kind: LabelKind,
    names: &[String],
) -> Result<Vec<Label>> {
    let mut labels = Vec::with_capacity(names.len());

    for name in names {
        let label = match find_by_name(conn, kind, name).await? {
            Some(existing) => existing,
            None => create(conn, kind, name).await?,
        };
        labels.push(label);
    }

    Ok(labels)
}

/// Insert join rows linking the labels to a citation
pub async fn attach(
    conn: &impl ConnectionTrait,
    kind: LabelKind,
    citation_id: i64,
    labels: &[Label],
) -> Result<()> {
    let sql = format!(
        "INSERT INTO {} (citation_id, {}) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        kind.join_table(),
        kind.fk_column()
    );

    for label in labels {
        conn.execute(stmt(sql.clone(), [citation_id.into(), label.id.into()]))
            .await?;
    }

    Ok(())
}

/// Label ids currently linked to a citation
pub async fn link_ids_for(
    conn: &impl ConnectionTrait,
    kind: LabelKind,
    citation_id: i64,
) -> Result<Vec<i64>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE citation_id = $1",
        kind.fk_column(),
        kind.join_table()
    );

    let rows = conn.query_all(stmt(sql, [citation_id.into()])).await?;
    rows.iter()
        .map(|row| Ok(row.try_get_by_index::<i64>(0)?))
        .collect()
}

/// Remove every join row for a citation
pub async fn detach_all(
    conn: &impl ConnectionTrait,
    kind: LabelKind,
    citation_id: i64,
) -> Result<()> {
    let sql = format!("DELETE FROM {} WHERE citation_id = $1", kind.join_table());
    conn.execute(stmt(sql, [citation_id.into()])).await?;
    Ok(())
}

/// Delete candidate labels that no longer have any citation link.
///
/// Candidates must come from the association snapshot taken before the
/// mutating operation; re-querying afterwards would miss just-orphaned
/// rows.
pub async fn sweep_orphans(
    conn: &impl ConnectionTrait,
    kind: LabelKind,
    candidate_ids: &[i64],
) -> Result<u64> {
    if candidate_ids.is_empty() {
        return Ok(0);
    }

    let sql = format!(
        "DELETE FROM {table} WHERE id IN ({ids}) \
         AND NOT EXISTS (SELECT 1 FROM {join} l WHERE l.{fk} = {table}.id)",
        table = kind.table(),
        join = kind.join_table(),
        fk = kind.fk_column(),
        ids = placeholders(1, candidate_ids.len())
    );

    let values: Vec<Value> = candidate_ids.iter().map(|id| (*id).into()).collect();
    let result = conn.execute(stmt(sql, values)).await?;
    Ok(result.rows_affected())
}

/// Replace the full label set for a citation: old associations are
/// deleted, the new set inserted, and labels orphaned by the swap are
/// swept, all relative to the pre-mutation snapshot.
pub async fn replace(
    conn: &impl ConnectionTrait,
    kind: LabelKind,
    citation_id: i64,
    labels: &[Label],
) -> Result<()> {
    let previous = link_ids_for(conn, kind, citation_id).await?;

    detach_all(conn, kind, citation_id).await?;
    attach(conn, kind, citation_id, labels).await?;
    sweep_orphans(conn, kind, &previous).await?;

    Ok(())
}

/// Labels linked to one citation, name-ordered
pub async fn for_citation(
    conn: &impl ConnectionTrait,
    kind: LabelKind,
    citation_id: i64,
) -> Result<Vec<Label>> {
    let sql = format!(
        "SELECT t.id, t.name FROM {table} t \
         JOIN {join} l ON l.{fk} = t.id \
         WHERE l.citation_id = $1 ORDER BY t.name, t.id",
        table = kind.table(),
        join = kind.join_table(),
        fk = kind.fk_column()
    );

    let rows = conn.query_all(stmt(sql, [citation_id.into()])).await?;
    rows.iter().map(label_from_row).collect()
}

/// Batch hydration: labels for many citations in one query, grouped by
/// citation id
pub async fn for_citations(
    conn: &impl ConnectionTrait,
    kind: LabelKind,
    citation_ids: &[i64],
) -> Result<HashMap<i64, Vec<Label>>> {
    if citation_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let sql = format!(
        "SELECT l.citation_id, t.id, t.name FROM {table} t \
         JOIN {join} l ON l.{fk} = t.id \
         WHERE l.citation_id IN ({ids}) ORDER BY t.name, t.id",
        table = kind.table(),
        join = kind.join_table(),
        fk = kind.fk_column(),
        ids = placeholders(1, citation_ids.len())
    );

    let values: Vec<Value> = citation_ids.iter().map(|id| (*id).into()).collect();
    let rows = conn.query_all(stmt(sql, values)).await?;

    let mut grouped: HashMap<i64, Vec<Label>> = HashMap::new();
    for row in rows {
        let citation_id = row.try_get_by_index::<i64>(0)?;
        let label = Label {
            id: row.try_get_by_index::<i64>(1)?,
            name: row.try_get_by_index::<String>(2)?,
        };
        grouped.entry(citation_id).or_default().push(label);
    }

    Ok(grouped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::collections::BTreeMap;

    fn mock_row(id: i64, name: &str) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([("id", Value::from(id)), ("name", Value::from(name.to_string()))])
    }

    #[test]
    fn kind_names() {
        assert_eq!(LabelKind::Tag.table(), "tags");
        assert_eq!(LabelKind::Tag.join_table(), "citations_to_tags");
        assert_eq!(LabelKind::Tag.fk_column(), "tag_id");
        assert_eq!(LabelKind::Category.table(), "categories");
        assert_eq!(LabelKind::Category.join_table(), "citations_to_categories");
        assert_eq!(LabelKind::Category.fk_column(), "category_id");
    }

    #[test]
    fn placeholder_numbering() {
        assert_eq!(placeholders(1, 3), "$1, $2, $3");
        assert_eq!(placeholders(4, 1), "$4");
    }

    #[tokio::test]
    async fn sweep_with_no_candidates_issues_no_statements() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let swept = sweep_orphans(&conn, LabelKind::Tag, &[]).await.unwrap();
        assert_eq!(swept, 0);
        assert!(conn.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn get_or_create_only_inserts_missing_names() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                // "testing" already exists
                vec![mock_row(1, "testing")],
                // "research" does not
                Vec::new(),
                // insert returns the new row
                vec![mock_row(2, "research")],
            ])
            .into_connection();

        let names = vec!["testing".to_string(), "research".to_string()];
        let labels = get_or_create_all(&conn, LabelKind::Tag, &names)
            .await
            .unwrap();

        assert_eq!(
            labels,
            vec![
                Label { id: 1, name: "testing".to_string() },
                Label { id: 2, name: "research".to_string() },
            ]
        );

        // two lookups plus exactly one insert
        let log = conn.into_transaction_log();
        assert_eq!(log.len(), 3);
        let last = format!("{:?}", log[2]);
        assert!(last.contains("INSERT INTO tags"));
    }
}
