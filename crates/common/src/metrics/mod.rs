//! Metrics and observability utilities
//!
//! Prometheus metrics with standardized naming for the citation service.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};

/// Metrics prefix for all Citekeep metrics
pub const METRICS_PREFIX: &str = "citekeep";

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_citations_created_total", METRICS_PREFIX),
        Unit::Count,
        "Total citations created"
    );

    describe_counter!(
        format!("{}_citations_updated_total", METRICS_PREFIX),
        Unit::Count,
        "Total citations updated"
    );

    describe_counter!(
        format!("{}_citations_deleted_total", METRICS_PREFIX),
        Unit::Count,
        "Total citations deleted"
    );

    describe_counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of search queries"
    );

    describe_histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Search query latency in seconds"
    );

    describe_gauge!(
        format!("{}_search_results_count", METRICS_PREFIX),
        Unit::Count,
        "Number of results returned from search"
    );

    describe_counter!(
        format!("{}_doi_lookups_total", METRICS_PREFIX),
        Unit::Count,
        "Total DOI lookup requests"
    );

    describe_counter!(
        format!("{}_exports_total", METRICS_PREFIX),
        Unit::Count,
        "Total BibTeX export requests"
    );
}

/// Record a citation creation
pub fn record_citation_created() {
    counter!(format!("{}_citations_created_total", METRICS_PREFIX)).increment(1);
}

/// Record a citation update
pub fn record_citation_updated() {
    counter!(format!("{}_citations_updated_total", METRICS_PREFIX)).increment(1);
}

/// Record a citation deletion
pub fn record_citation_deleted() {
    counter!(format!("{}_citations_deleted_total", METRICS_PREFIX)).increment(1);
}

/// Record a search with its latency and result count
pub fn record_search(duration_secs: f64, results: usize) {
    counter!(format!("{}_search_queries_total", METRICS_PREFIX)).increment(1);
    histogram!(format!("{}_search_duration_seconds", METRICS_PREFIX)).record(duration_secs);
    gauge!(format!("{}_search_results_count", METRICS_PREFIX)).set(results as f64);
}

/// Record a DOI lookup, labeled by outcome
pub fn record_doi_lookup(found: bool) {
    counter!(
        format!("{}_doi_lookups_total", METRICS_PREFIX),
        "outcome" => if found { "found" } else { "not_found" }
    )
    .increment(1);
}

/// Record a BibTeX export with the number of entries rendered
pub fn record_export(entries: usize) {
    counter!(format!("{}_exports_total", METRICS_PREFIX)).increment(entries as u64);
}
