//! Schema bootstrap
//!
//! Idempotent DDL plus reference-data seeds, executed through the pool at
//! startup. Everything here is safe to re-run: tables are created only if
//! missing and seeds upsert with `ON CONFLICT DO NOTHING`.

use crate::errors::Result;
use sea_orm::{ConnectionTrait, DbBackend, Statement};
use tracing::info;

const TABLES: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS entry_types (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    )",
    "CREATE TABLE IF NOT EXISTS citations (
        id BIGSERIAL PRIMARY KEY,
        entry_type_id BIGINT NOT NULL REFERENCES entry_types(id),
        citation_key TEXT NOT NULL UNIQUE,
        fields JSONB NOT NULL DEFAULT '{}'::jsonb,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE TABLE IF NOT EXISTS categories (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    )",
    "CREATE TABLE IF NOT EXISTS tags (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    )",
    "CREATE TABLE IF NOT EXISTS citations_to_categories (
        citation_id BIGINT NOT NULL REFERENCES citations(id) ON DELETE CASCADE,
        category_id BIGINT NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
        PRIMARY KEY (citation_id, category_id)
    )",
    "CREATE TABLE IF NOT EXISTS citations_to_tags (
        citation_id BIGINT NOT NULL REFERENCES citations(id) ON DELETE CASCADE,
        tag_id BIGINT NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
        PRIMARY KEY (citation_id, tag_id)
    )",
    "CREATE TABLE IF NOT EXISTS default_fields (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    )",
    "CREATE TABLE IF NOT EXISTS default_entry_fields (
        entry_type_id BIGINT NOT NULL REFERENCES entry_types(id) ON DELETE CASCADE,
        default_field_id BIGINT NOT NULL REFERENCES default_fields(id) ON DELETE CASCADE,
        PRIMARY KEY (entry_type_id, default_field_id)
    )",
];

/// Standard BibTeX entry types
pub const ENTRY_TYPES: &[&str] = &[
    "article",
    "book",
    "booklet",
    "conference",
    "inbook",
    "incollection",
    "inproceedings",
    "manual",
    "mastersthesis",
    "misc",
    "phdthesis",
    "proceedings",
    "techreport",
    "unpublished",
];

/// Advisory default field lists per entry type
const DEFAULT_ENTRY_FIELDS: &[(&str, &[&str])] = &[
    (
        "article",
        &["author", "title", "journaltitle", "year", "volume", "number", "pages"],
    ),
    ("book", &["author", "title", "year", "publisher"]),
    (
        "inproceedings",
        &["author", "title", "booktitle", "year", "pages"],
    ),
    ("phdthesis", &["author", "title", "school", "year"]),
    ("techreport", &["author", "title", "institution", "year"]),
    ("misc", &["author", "title", "year"]),
];

/// Create missing tables and seed reference data
pub async fn bootstrap(conn: &impl ConnectionTrait) -> Result<()> {
    for ddl in TABLES {
        conn.execute_unprepared(ddl).await?;
    }

    seed_entry_types(conn).await?;
    seed_default_fields(conn).await?;

    info!("Schema bootstrap complete");
    Ok(())
}

async fn seed_entry_types(conn: &impl ConnectionTrait) -> Result<()> {
    for name in ENTRY_TYPES {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "INSERT INTO entry_types (name) VALUES ($1) ON CONFLICT (name) DO NOTHING",
            [(*name).into()],
        );
        conn.execute(stmt).await?;
    }

    Ok(())
}

async fn seed_default_fields(conn: &impl ConnectionTrait) -> Result<()> {
    for (entry_type, fields) in DEFAULT_ENTRY_FIELDS {
        for field in *fields {
            let stmt = Statement::from_sql_and_values(
                DbBackend::Postgres,
                "INSERT INTO default_fields (name) VALUES ($1) ON CONFLICT (name) DO NOTHING",
                [(*field).into()],
            );
            conn.execute(stmt).await?;

            let stmt = Statement::from_sql_and_values(
                DbBackend::Postgres,
                "INSERT INTO default_entry_fields (entry_type_id, default_field_id) \
                 SELECT et.id, df.id FROM entry_types et, default_fields df \
                 WHERE et.name = $1 AND df.name = $2 \
                 ON CONFLICT DO NOTHING",
                [(*entry_type).into(), (*field).into()],
            );
            conn.execute(stmt).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_seeded_entry_type_exists() {
        for (entry_type, _) in DEFAULT_ENTRY_FIELDS {
            assert!(
                ENTRY_TYPES.contains(entry_type),
                "default fields reference unknown entry type {}",
                entry_type
            );
        }
    }

    #[test]
    fn ddl_is_idempotent() {
        for ddl in TABLES {
            assert!(ddl.trim_start().starts_with("CREATE TABLE IF NOT EXISTS"));
        }
    }
}
