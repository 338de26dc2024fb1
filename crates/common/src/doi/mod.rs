//! DOI metadata resolver abstraction
//!
//! Provides a unified interface for DOI metadata lookup:
//! - doi.org content negotiation (CSL-JSON)
//! - a static in-memory resolver for tests
//!
//! Resolved metadata is untrusted input: callers run it through
//! [`crate::extract`] exactly like form-submitted data.

use crate::config::DoiConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// The flat metadata shape consumed by the citation write path
pub type DoiFields = HashMap<String, String>;

/// Trait for DOI metadata resolution
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    /// Resolve a DOI to a flat field map; `None` when the DOI is unknown
    async fn resolve(&self, doi: &str) -> Result<Option<DoiFields>>;
}

/// Resolver backed by the doi.org content negotiation endpoint
pub struct DoiOrgResolver {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl DoiOrgResolver {
    /// Create a new resolver from configuration
    pub fn new(config: &DoiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
        }
    }

    async fn request_with_retry(&self, doi: &str) -> Result<Option<Value>> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff
                let delay = Duration::from_millis(100 * 2_u64.pow(attempt));
                tokio::time::sleep(delay).await;
            }

            match self.make_request(doi).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        error = %e,
                        "DOI request failed, retrying"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AppError::DoiLookup {
            message: "Unknown error after retries".to_string(),
        }))
    }

    async fn make_request(&self, doi: &str) -> Result<Option<Value>> {
        let url = format!("{}/{}", self.base_url, doi);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.citationstyles.csl+json")
            .send()
            .await
            .map_err(|e| AppError::DoiLookup {
                message: format!("Request failed: {}", e),
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::DoiLookup {
                message: format!("Resolver returned {}", status),
            });
        }

        let body: Value = response.json().await.map_err(|e| AppError::DoiLookup {
            message: format!("Failed to parse response: {}", e),
        })?;

        Ok(Some(body))
    }
}

#[async_trait]
impl MetadataResolver for DoiOrgResolver {
    async fn resolve(&self, doi: &str) -> Result<Option<DoiFields>> {
        let doi = strip_doi_prefix(doi);
        if doi.is_empty() {
            return Ok(None);
        }

        let Some(body) = self.request_with_retry(doi).await? else {
            return Ok(None);
        };

        let fields = normalize_csl(&body);
        if fields.is_empty() {
            return Ok(None);
        }

        Ok(Some(fields))
    }
}

/// Static resolver for testing
#[derive(Default)]
pub struct StaticResolver {
    entries: HashMap<String, DoiFields>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, doi: &str, fields: DoiFields) -> Self {
        self.entries.insert(doi.to_string(), fields);
        self
    }
}

#[async_trait]
impl MetadataResolver for StaticResolver {
    async fn resolve(&self, doi: &str) -> Result<Option<DoiFields>> {
        Ok(self.entries.get(strip_doi_prefix(doi)).cloned())
    }
}

/// Create a resolver based on configuration
pub fn create_resolver(config: &DoiConfig) -> Arc<dyn MetadataResolver> {
    Arc::new(DoiOrgResolver::new(config))
}

/// Accept bare DOIs, `doi:` prefixes, and full resolver URLs
fn strip_doi_prefix(raw: &str) -> &str {
    let trimmed = raw.trim();
    for prefix in ["https://doi.org/", "http://doi.org/", "doi:"] {
        if let Some(rest) = trimmed.strip_prefix(prefix) {
            return rest;
        }
    }
    trimmed
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Flatten a CSL-JSON item to the field map the write path expects:
/// title, author, year, journaltitle, publisher, pages, volume, number.
pub fn normalize_csl(item: &Value) -> DoiFields {
    let mut fields = DoiFields::new();

    let direct = [
        ("title", "title"),
        ("container-title", "journaltitle"),
        ("publisher", "publisher"),
        ("page", "pages"),
        ("volume", "volume"),
        ("issue", "number"),
    ];
    for (source, target) in direct {
        if let Some(text) = item.get(source).and_then(value_text) {
            fields.insert(target.to_string(), text);
        }
    }

    if let Some(authors) = item.get("author").and_then(Value::as_array) {
        let names: Vec<String> = authors
            .iter()
            .filter_map(|author| {
                let family = author.get("family").and_then(value_text);
                let given = author.get("given").and_then(value_text);
                match (family, given) {
                    (Some(family), Some(given)) => Some(format!("{}, {}", family, given)),
                    (Some(family), None) => Some(family),
                    _ => None,
                }
            })
            .collect();

        if !names.is_empty() {
            fields.insert("author".to_string(), names.join(" and "));
        }
    }

    let year = item
        .pointer("/issued/date-parts/0/0")
        .and_then(value_text);
    if let Some(year) = year {
        fields.insert("year".to_string(), year);
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_a_csl_item() {
        let item = json!({
            "title": "On Testing",
            "container-title": "Journal of Tests",
            "publisher": "ACM",
            "page": "1-10",
            "volume": 4,
            "issue": "2",
            "author": [
                {"family": "Doe", "given": "Jane"},
                {"family": "Roe", "given": "Richard"},
            ],
            "issued": {"date-parts": [[2020, 6, 1]]},
        });

        let fields = normalize_csl(&item);
        assert_eq!(fields["title"], "On Testing");
        assert_eq!(fields["journaltitle"], "Journal of Tests");
        assert_eq!(fields["publisher"], "ACM");
        assert_eq!(fields["pages"], "1-10");
        assert_eq!(fields["volume"], "4");
        assert_eq!(fields["number"], "2");
        assert_eq!(fields["author"], "Doe, Jane and Roe, Richard");
        assert_eq!(fields["year"], "2020");
    }

    #[test]
    fn skips_absent_and_blank_values() {
        let item = json!({
            "title": "   ",
            "author": [{"given": "Orphaned"}],
        });

        let fields = normalize_csl(&item);
        assert!(fields.is_empty());
    }

    #[test]
    fn doi_prefixes_are_stripped() {
        assert_eq!(strip_doi_prefix("10.1000/xyz"), "10.1000/xyz");
        assert_eq!(strip_doi_prefix("doi:10.1000/xyz"), "10.1000/xyz");
        assert_eq!(strip_doi_prefix(" https://doi.org/10.1000/xyz "), "10.1000/xyz");
    }

    #[tokio::test]
    async fn static_resolver_round_trips() {
        let fields = DoiFields::from([("title".to_string(), "On Testing".to_string())]);
        let resolver = StaticResolver::new().with_entry("10.1000/xyz", fields.clone());

        let resolved = resolver.resolve("doi:10.1000/xyz").await.unwrap();
        assert_eq!(resolved, Some(fields));
        assert_eq!(resolver.resolve("10.1000/other").await.unwrap(), None);
    }
}
