//! Citekeep API Gateway
//!
//! The main entry point for all external API requests.
//! Handles:
//! - Request routing
//! - Schema bootstrap at startup
//! - Observability (logging, metrics, tracing)

mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use citekeep_common::{
    config::{AppConfig, ObservabilityConfig},
    db::{schema, DbPool},
    doi::{create_resolver, MetadataResolver},
    metrics,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub resolver: Arc<dyn MetadataResolver>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    // Initialize tracing
    init_tracing(&config.observability);

    info!("Starting Citekeep API Gateway v{}", citekeep_common::VERSION);

    let config = Arc::new(config);

    // Initialize metrics
    metrics::register_metrics();
    if config.observability.metrics_port > 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
        info!("Prometheus exporter listening on {}", addr);
    }

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;

    if config.database.bootstrap {
        schema::bootstrap(db.write()).await?;
    }

    // Create app state
    let state = AppState {
        config: config.clone(),
        db,
        resolver: create_resolver(&config.doi),
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // API routes
    let api_routes = Router::new()
        // Citation endpoints
        .route(
            "/citations",
            get(handlers::citations::list_citations).post(handlers::citations::create_citation),
        )
        .route(
            "/citations/{id}",
            get(handlers::citations::get_citation)
                .put(handlers::citations::update_citation)
                .delete(handlers::citations::delete_citation),
        )
        .route("/citations/key/{key}", get(handlers::citations::get_citation_by_key))

        // Search endpoint
        .route("/citations/search", post(handlers::search::search))

        // Reference data endpoints
        .route("/entry-types", get(handlers::entry_types::list_entry_types))
        .route(
            "/entry-types/{id}/fields",
            get(handlers::entry_types::default_fields),
        )
        .route("/tags", get(handlers::labels::list_tags))
        .route("/categories", get(handlers::labels::list_categories))

        // Export endpoint
        .route("/export/bibtex", get(handlers::export::export_bibtex))

        // DOI lookup endpoint
        .route("/doi-lookup", post(handlers::doi::lookup));

    // Compose the app
    Router::new()
        // Health endpoints (outside the versioned prefix)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
