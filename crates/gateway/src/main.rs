//! Cocite API Gateway
//!
//! HTTP front end for citation network builds.
//! Handles:
//! - Request validation and routing
//! - Publication search for free-text queries
//! - Observability (logging, metrics)

mod handlers;

use axum::{routing::get, Router};
use cocite_common::{
    cache::create_cache,
    config::AppConfig,
    metrics::{self, BUILD_DURATION},
};
use cocite_network::{create_sources, BuilderConfig, CitationGraphBuilder, PublicationSearch, Sources};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub builder: Arc<CitationGraphBuilder>,
    pub search: Arc<dyn PublicationSearch>,
}

impl AppState {
    pub fn new(config: AppConfig, sources: Sources) -> Self {
        let builder = CitationGraphBuilder::from_sources(&sources, BuilderConfig::from(&config.network));
        Self {
            config: Arc::new(config),
            builder: Arc::new(builder),
            search: sources.search,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    init_tracing(&config);

    info!("Starting Cocite API Gateway v{}", cocite_common::VERSION);

    let budget = config.network.build_budget();
    if budget >= config.request_timeout() {
        warn!(
            budget_secs = budget.as_secs(),
            request_timeout_secs = config.request_timeout().as_secs(),
            "Network stage deadlines exceed the request timeout"
        );
    }

    init_metrics(config.observability.metrics_port, budget)?;
    metrics::register_metrics();

    let cache = create_cache(&config.cache).await;
    let sources = create_sources(&config, cache)?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let state = AppState::new(config, sources);

    // Build the router
    let app = create_router(state);

    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.observability.json_logging {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Install the Prometheus exporter; port 0 disables it
fn init_metrics(port: u16, build_budget: Duration) -> anyhow::Result<()> {
    if port == 0 {
        info!("Metrics exporter disabled");
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(SocketAddr::from(([0, 0, 0, 0], port)))
        .set_buckets_for_metric(
            Matcher::Full(BUILD_DURATION.to_string()),
            &metrics::build_buckets(build_budget),
        )?
        .install()?;

    info!(port, "Prometheus exporter listening");
    Ok(())
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

    let api_routes = Router::new().route(
        "/network/publication",
        get(handlers::network::publication_network),
    );

    Router::new()
        .route("/health", get(handlers::health::health))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
