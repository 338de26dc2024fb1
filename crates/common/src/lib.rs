//! Citekeep Common Library
//!
//! Shared code for the Citekeep services including:
//! - Database models, labels, and the repository pattern
//! - Field extraction and validation
//! - Search query normalization
//! - DOI metadata resolver abstraction
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod citation;
pub mod config;
pub mod db;
pub mod doi;
pub mod errors;
pub mod extract;
pub mod metrics;
pub mod query;

// Re-export commonly used types
pub use citation::Citation;
pub use config::AppConfig;
pub use db::{Label, LabelKind, Repository};
pub use errors::{AppError, Result};
pub use query::SearchQuery;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Largest year value accepted in a citation's `year` field
pub const YEAR_MAX: i64 = 9999;
