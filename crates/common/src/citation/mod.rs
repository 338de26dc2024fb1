//! The hydrated citation view
//!
//! [`Citation`] is what repository reads return: the row joined with its
//! entry type name and label sets, with the JSON fields column parsed
//! into a map. Derived views (human-readable string, compact summary,
//! BibTeX) live here.

use crate::db::labels::Label;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One bibliographic record with a type, unique key, field map, and
/// tag/category associations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub id: i64,
    pub entry_type: String,
    pub citation_key: String,
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub tags: Vec<Label>,
    #[serde(default)]
    pub categories: Vec<Label>,
}

/// Extract the fields object from a stored JSON value.
///
/// The store may hold anything a past writer put there; a value that is
/// not a JSON object degrades to an empty map rather than erroring.
pub fn fields_object(stored: &Value) -> Map<String, Value> {
    stored.as_object().cloned().unwrap_or_default()
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Citation {
    /// A field's value rendered as text, `None` when absent or blank.
    pub fn field_text(&self, key: &str) -> Option<String> {
        let text = value_text(self.fields.get(key)?);
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Container segment built from journaltitle/booktitle/publisher,
    /// volume(number), and pages.
    fn format_container(&self) -> String {
        let mut segments = Vec::new();

        let first = self
            .field_text("journaltitle")
            .or_else(|| self.field_text("booktitle"))
            .or_else(|| self.field_text("publisher"));
        if let Some(first) = first {
            segments.push(first);
        }

        if let Some(volume) = self.field_text("volume") {
            match self.field_text("number") {
                Some(number) => segments.push(format!("{}({})", volume, number)),
                None => segments.push(volume),
            }
        }

        if let Some(pages) = self.field_text("pages") {
            segments.push(format!("pp. {}", pages));
        }

        segments.join(", ")
    }

    /// Human-readable reference line, e.g.
    /// `Doe, J. (2020). On Testing. Journal of Tests, 4(2), pp. 1-10.`
    pub fn to_human_readable(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        let mut header_parts = Vec::new();
        if let Some(author) = self.field_text("author") {
            header_parts.push(author);
        }
        if let Some(year) = self.field_text("year") {
            header_parts.push(format!("({})", year));
        }
        if !header_parts.is_empty() {
            parts.push(format!("{}.", header_parts.join(" ")));
        }

        if let Some(title) = self.field_text("title") {
            parts.push(format!("{}.", title));
        }

        let container = self.format_container();
        if !container.is_empty() {
            parts.push(container);
        }

        let mut result = parts.join(" ").trim().to_string();
        if !result.is_empty() && !result.ends_with('.') {
            result.push('.');
        }

        if result.is_empty() {
            return format!("{} ({})", self.citation_key, self.entry_type);
        }

        result
    }

    /// Compact one-line representation: entry type, key, and the first
    /// few field values.
    pub fn to_compact(&self) -> String {
        let mut items: Vec<(&String, &Value)> = self.fields.iter().collect();
        items.sort_by(|a, b| a.0.cmp(b.0));

        let mut brief = items
            .iter()
            .take(3)
            .map(|(_, v)| value_text(v))
            .collect::<Vec<_>>()
            .join(", ");
        if items.len() > 3 {
            brief.push_str(", ...");
        }

        format!("{} — {} — {}", self.entry_type, self.citation_key, brief)
    }

    /// Deterministic BibTeX entry: fields sorted by key, two-space
    /// indent, no trailing comma after the last field.
    pub fn to_bibtex(&self) -> String {
        let mut items: Vec<(&String, &Value)> = self.fields.iter().collect();
        items.sort_by(|a, b| a.0.cmp(b.0));

        let fields_str = items
            .iter()
            .map(|(k, v)| format!("{} = {{{}}}", k, value_text(v)))
            .collect::<Vec<_>>()
            .join(",\n  ");

        format!(
            "@{}{{{},\n  {}\n}}",
            self.entry_type, self.citation_key, fields_str
        )
    }
}

/// Render a set of citations as one BibTeX document, entries separated by
/// blank lines, with a trailing newline.
pub fn render_bibliography(citations: &[Citation]) -> String {
    let mut out = citations
        .iter()
        .map(Citation::to_bibtex)
        .collect::<Vec<_>>()
        .join("\n\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn citation(fields: Value) -> Citation {
        Citation {
            id: 1,
            entry_type: "article".to_string(),
            citation_key: "Doe-2020".to_string(),
            fields: fields_object(&fields),
            tags: Vec::new(),
            categories: Vec::new(),
        }
    }

    #[test]
    fn human_readable_full() {
        let c = citation(json!({
            "author": "Doe, J.",
            "year": 2020,
            "title": "On Testing",
            "journaltitle": "Journal of Tests",
            "volume": "4",
            "number": "2",
            "pages": "1-10",
        }));
        assert_eq!(
            c.to_human_readable(),
            "Doe, J. (2020). On Testing. Journal of Tests, 4(2), pp. 1-10."
        );
    }

    #[test]
    fn human_readable_falls_back_to_key() {
        let c = citation(json!({}));
        assert_eq!(c.to_human_readable(), "Doe-2020 (article)");
    }

    #[test]
    fn human_readable_volume_without_number() {
        let c = citation(json!({
            "title": "On Testing",
            "booktitle": "Proceedings",
            "volume": "7",
        }));
        assert_eq!(c.to_human_readable(), "On Testing. Proceedings, 7.");
    }

    #[test]
    fn compact_truncates_after_three_fields() {
        let c = citation(json!({
            "author": "Doe, J.",
            "title": "On Testing",
            "year": 2020,
            "publisher": "ACM",
        }));
        // fields sorted by key: author, publisher, title, year
        assert_eq!(
            c.to_compact(),
            "article — Doe-2020 — Doe, J., ACM, On Testing, ..."
        );
    }

    #[test]
    fn bibtex_is_sorted_and_unquoted() {
        let c = citation(json!({
            "title": "On Testing",
            "author": "Doe, J.",
            "year": 2020,
        }));
        assert_eq!(
            c.to_bibtex(),
            "@article{Doe-2020,\n  author = {Doe, J.},\n  title = {On Testing},\n  year = {2020}\n}"
        );
    }

    #[test]
    fn bibliography_joins_with_blank_lines() {
        let a = citation(json!({"title": "A"}));
        let mut b = citation(json!({"title": "B"}));
        b.citation_key = "B-1".to_string();

        let out = render_bibliography(&[a, b]);
        assert!(out.contains("}\n\n@article{B-1,"));
        assert!(out.ends_with("}\n"));
    }

    #[test]
    fn fields_object_tolerates_non_objects() {
        assert!(fields_object(&json!("not an object")).is_empty());
        assert!(fields_object(&json!(null)).is_empty());
        assert!(fields_object(&json!([1, 2])).is_empty());
        assert_eq!(fields_object(&json!({"a": 1})).len(), 1);
    }
}
