//! Field extraction and validation
//!
//! Turns raw submitted key/value pairs into a validated fields map, plus
//! the citation key and category/tag name lists handled by their own
//! extraction paths. Writes are strict: a bad `year` aborts the whole map.

use crate::errors::{AppError, Result};
use crate::YEAR_MAX;
use regex_lite::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Keys that are never stored as bibliographic fields. They belong to the
/// citation key, entry type, and label-selection extraction paths.
pub const RESERVED_FIELD_KEYS: &[&str] =
    &["citation_key", "entry_type", "category_list", "tag_list", "doi"];

fn whitespace_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"))
}

/// Trim and collapse internal whitespace runs to single spaces.
pub fn sanitize(value: &str) -> String {
    whitespace_run().replace_all(value.trim(), " ").into_owned()
}

/// Sanitize, returning `None` when nothing but whitespace remains.
pub fn validate(value: &str) -> Option<String> {
    let cleaned = sanitize(value);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Extract the bibliographic fields map from raw submitted pairs.
///
/// Reserved keys are dropped, values are whitespace-normalized, and keys
/// whose sanitized value is empty are discarded. A present, non-empty
/// `year` must be an all-digit integer in [0, 9999] and is stored as a
/// JSON number; any violation fails the whole extraction.
pub fn extract_fields(raw: &HashMap<String, String>) -> Result<Map<String, Value>> {
    let mut fields = Map::new();

    for (key, value) in raw {
        if RESERVED_FIELD_KEYS.contains(&key.as_str()) {
            continue;
        }

        let Some(cleaned) = validate(value) else {
            continue;
        };

        if key == "year" {
            fields.insert(key.clone(), Value::from(parse_year(&cleaned)?));
        } else {
            fields.insert(key.clone(), Value::String(cleaned));
        }
    }

    Ok(fields)
}

/// Parse a sanitized year value under the strict write-path rule.
pub fn parse_year(value: &str) -> Result<i64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::InvalidYear {
            value: value.to_string(),
        });
    }

    let year: i64 = value.parse().map_err(|_| AppError::InvalidYear {
        value: value.to_string(),
    })?;

    if year > YEAR_MAX {
        return Err(AppError::InvalidYear {
            value: value.to_string(),
        });
    }

    Ok(year)
}

/// Extract the citation key: sanitize, then join the remaining words with
/// single hyphens. An empty result fails validation.
pub fn extract_citation_key(raw: &str) -> Result<String> {
    let cleaned = sanitize(raw);
    let key = whitespace_run().replace_all(&cleaned, "-").into_owned();

    if key.is_empty() {
        return Err(AppError::Validation {
            message: "Citation key must not be empty".to_string(),
            field: Some("citation_key".to_string()),
        });
    }

    Ok(key)
}

/// Sanitize a list of candidate label names: blanks dropped, duplicates
/// removed with first-occurrence order preserved.
pub fn extract_names(raw: &[String]) -> Vec<String> {
    let mut seen = Vec::new();

    for name in raw {
        if let Some(cleaned) = validate(name) {
            if !seen.contains(&cleaned) {
                seen.push(cleaned);
            }
        }
    }

    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn sanitize_collapses_whitespace() {
        assert_eq!(sanitize("  hello   world \n"), "hello world");
        assert_eq!(sanitize("a\tb\n c"), "a b c");
        assert_eq!(sanitize("   "), "");
    }

    #[test]
    fn validate_drops_blank() {
        assert_eq!(validate("ok"), Some("ok".to_string()));
        assert_eq!(validate(""), None);
        assert_eq!(validate("   "), None);
    }

    #[test]
    fn extract_fields_filters_and_sanitizes() {
        let form = raw(&[
            ("title", "  A  title "),
            ("citation_key", " should-be-ignored"),
            ("entry_type", "book"),
            ("author", " John   Doe "),
            ("empty", "   "),
        ]);

        let fields = extract_fields(&form).unwrap();

        assert!(!fields.contains_key("citation_key"));
        assert!(!fields.contains_key("entry_type"));
        assert!(!fields.contains_key("empty"));
        assert_eq!(fields["title"], "A title");
        assert_eq!(fields["author"], "John Doe");
    }

    #[test]
    fn extract_fields_stores_year_as_number() {
        let fields = extract_fields(&raw(&[("year", " 2020 ")])).unwrap();
        assert_eq!(fields["year"], serde_json::json!(2020));
    }

    #[test]
    fn year_bounds() {
        assert_eq!(parse_year("0").unwrap(), 0);
        assert_eq!(parse_year("9999").unwrap(), 9999);
        assert!(parse_year("10000").is_err());
        assert!(parse_year("-1").is_err());
        assert!(parse_year("abc").is_err());
        assert!(parse_year("19 84").is_err());
    }

    #[test]
    fn bad_year_aborts_whole_map() {
        let form = raw(&[("title", "On Testing"), ("year", "10000")]);
        let err = extract_fields(&form).unwrap_err();
        assert!(matches!(err, AppError::InvalidYear { .. }));
    }

    #[test]
    fn blank_year_is_dropped_not_rejected() {
        let fields = extract_fields(&raw(&[("year", "   ")])).unwrap();
        assert!(!fields.contains_key("year"));
    }

    #[test]
    fn citation_key_hyphenation() {
        assert_eq!(extract_citation_key("Doe 2020").unwrap(), "Doe-2020");
        assert_eq!(extract_citation_key("  Doe   2020 \n").unwrap(), "Doe-2020");
        assert_eq!(extract_citation_key("single").unwrap(), "single");
    }

    #[test]
    fn empty_citation_key_fails() {
        assert!(extract_citation_key("").is_err());
        assert!(extract_citation_key(" \t ").is_err());
    }

    #[test]
    fn names_deduplicated_in_order() {
        let input = vec![
            " testing ".to_string(),
            "research".to_string(),
            "testing".to_string(),
            "  ".to_string(),
        ];
        assert_eq!(extract_names(&input), vec!["testing", "research"]);
    }
}
