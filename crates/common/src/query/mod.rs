//! Search query normalization
//!
//! Parses raw, possibly absent or wrong-typed request parameters into a
//! canonical [`SearchQuery`]. Search filters are advisory: anything
//! malformed normalizes to "absent" instead of erroring, in contrast to
//! the strict write-path validation in [`crate::extract`].

use crate::extract::{extract_names, sanitize, validate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Whitelisted sort columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    Year,
    CitationKey,
}

impl SortBy {
    fn parse(raw: &str) -> Option<Self> {
        match sanitize(raw).to_lowercase().as_str() {
            "year" => Some(SortBy::Year),
            "citation_key" => Some(SortBy::CitationKey),
            _ => None,
        }
    }
}

/// Sort direction, defaulting to ascending
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    fn parse(raw: &str) -> Self {
        match sanitize(raw).to_uppercase().as_str() {
            "DESC" => Direction::Desc,
            _ => Direction::Asc,
        }
    }

    /// SQL keyword for this direction. Rendered from the enum, never from
    /// user input.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// Canonical, validated search filters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free-text substring match against the serialized fields blob
    pub q: Option<String>,
    /// Citation key substring match
    pub citation_key: Option<String>,
    /// Exact entry type name match
    pub entry_type: Option<String>,
    /// Substring match against the `author` field
    pub author: Option<String>,
    /// Inclusive lower bound on the `year` field
    pub year_from: Option<i64>,
    /// Inclusive upper bound on the `year` field
    pub year_to: Option<i64>,
    /// Citation must carry at least one of these tag names
    pub tags: Vec<String>,
    /// Citation must carry at least one of these category names
    pub categories: Vec<String>,
    /// Sort column; `None` means ascending by id
    pub sort_by: Option<SortBy>,
    /// Sort direction
    pub direction: Direction,
}

impl SearchQuery {
    /// Build a canonical query from a raw JSON parameter object.
    ///
    /// Never fails: missing, blank, or wrong-typed values normalize to
    /// absent filters.
    pub fn from_params(params: &Value) -> Self {
        SearchQuery {
            q: string_param(params, "q"),
            citation_key: lowered_param(params, "citation_key"),
            entry_type: lowered_param(params, "entry_type"),
            author: lowered_param(params, "author"),
            year_from: year_param(params, "year_from"),
            year_to: year_param(params, "year_to"),
            tags: list_param(params, "tags"),
            categories: list_param(params, "categories"),
            sort_by: params
                .get("sort_by")
                .and_then(Value::as_str)
                .and_then(SortBy::parse),
            direction: params
                .get("direction")
                .and_then(Value::as_str)
                .map(Direction::parse)
                .unwrap_or_default(),
        }
    }

    /// True when no filter is present; the result ordering then matches a
    /// plain listing.
    pub fn is_unfiltered(&self) -> bool {
        self.q.is_none()
            && self.citation_key.is_none()
            && self.entry_type.is_none()
            && self.author.is_none()
            && self.year_from.is_none()
            && self.year_to.is_none()
            && self.tags.is_empty()
            && self.categories.is_empty()
    }
}

fn string_param(params: &Value, key: &str) -> Option<String> {
    params.get(key).and_then(Value::as_str).and_then(validate)
}

fn lowered_param(params: &Value, key: &str) -> Option<String> {
    string_param(params, key).map(|s| s.to_lowercase())
}

fn year_param(params: &Value, key: &str) -> Option<i64> {
    match params.get(key) {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => {
            let cleaned = sanitize(s);
            if !cleaned.is_empty() && cleaned.bytes().all(|b| b.is_ascii_digit()) {
                cleaned.parse().ok()
            } else {
                None
            }
        }
        _ => None,
    }
}

fn list_param(params: &Value, key: &str) -> Vec<String> {
    let raw: Vec<String> = match params.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    };

    extract_names(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_string_filters() {
        let query = SearchQuery::from_params(&json!({
            "q": "  Spaced Out  ",
            "citation_key": " AbC123 ",
            "author": " John Doe ",
            "year_from": "1990",
            "year_to": "1999",
            "sort_by": "citation_key",
            "direction": "desc",
        }));

        // q keeps its case; the query layer matches case-insensitively
        assert_eq!(query.q.as_deref(), Some("Spaced Out"));
        assert_eq!(query.citation_key.as_deref(), Some("abc123"));
        assert_eq!(query.author.as_deref(), Some("john doe"));
        assert_eq!(query.year_from, Some(1990));
        assert_eq!(query.year_to, Some(1999));
        assert_eq!(query.sort_by, Some(SortBy::CitationKey));
        assert_eq!(query.direction, Direction::Desc);
    }

    #[test]
    fn empty_params_yield_defaults() {
        let query = SearchQuery::from_params(&json!({}));
        assert_eq!(query, SearchQuery::default());
        assert!(query.is_unfiltered());
        assert_eq!(query.direction, Direction::Asc);
    }

    #[test]
    fn malformed_years_become_absent() {
        let query = SearchQuery::from_params(&json!({
            "year_from": "abc",
            "year_to": "",
        }));
        assert_eq!(query.year_from, None);
        assert_eq!(query.year_to, None);

        let query = SearchQuery::from_params(&json!({
            "year_from": ["2020"],
            "year_to": {"value": 2020},
        }));
        assert_eq!(query.year_from, None);
        assert_eq!(query.year_to, None);
    }

    #[test]
    fn integer_years_and_case_insensitive_sort() {
        let query = SearchQuery::from_params(&json!({
            "year_from": 2015,
            "year_to": 2020,
            "sort_by": "Year",
            "direction": "desc",
        }));
        assert_eq!(query.year_from, Some(2015));
        assert_eq!(query.year_to, Some(2020));
        assert_eq!(query.sort_by, Some(SortBy::Year));
        assert_eq!(query.direction, Direction::Desc);
    }

    #[test]
    fn bogus_sort_and_direction_fall_back() {
        let query = SearchQuery::from_params(&json!({
            "sort_by": "bogus",
            "direction": "down",
        }));
        assert_eq!(query.sort_by, None);
        assert_eq!(query.direction, Direction::Asc);
    }

    #[test]
    fn blank_filters_are_absent() {
        let query = SearchQuery::from_params(&json!({
            "citation_key": "   ",
            "author": null,
            "q": "\n  ",
        }));
        assert_eq!(query.citation_key, None);
        assert_eq!(query.author, None);
        assert_eq!(query.q, None);
        assert!(query.is_unfiltered());
    }

    #[test]
    fn tags_accept_list_or_single_string() {
        let query = SearchQuery::from_params(&json!({
            "tags": [" testing ", "", "research", "testing"],
            "categories": "CS",
        }));
        assert_eq!(query.tags, vec!["testing", "research"]);
        assert_eq!(query.categories, vec!["CS"]);
        assert!(!query.is_unfiltered());
    }

    #[test]
    fn direction_serializes_uppercase() {
        assert_eq!(Direction::Asc.as_sql(), "ASC");
        assert_eq!(Direction::Desc.as_sql(), "DESC");
        assert_eq!(
            serde_json::to_value(Direction::Desc).unwrap(),
            json!("DESC")
        );
    }
}
