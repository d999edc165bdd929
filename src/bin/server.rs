//! HTTP entrypoint: wires the cache, the design API client, and the
//! streaming node service into an axum router exposing health and stats
//! endpoints. The actual RPC surface (streaming node fetch, split,
//! fidelity loop, task planning) is a library API — [`nodebridge::rpc`] —
//! meant to be embedded behind whatever transport a caller already runs;
//! this binary only demonstrates the ambient HTTP surface around it.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use tower_http::trace::TraceLayer;

use nodebridge::config::ServiceConfig;
use nodebridge::external::{HttpClientConfig, HttpDesignApiClient};
use nodebridge::health::HealthReport;
use nodebridge::{cache::NodeCache, logging};

#[derive(Parser, Debug)]
#[command(name = "nodebridge-server", about = "Cache, streaming, and verification core for a design-file integration server")]
struct Args {
    /// Path to a TOML config file; falls back to in-code defaults when absent.
    #[arg(long, env = "NODEBRIDGE_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// Network interface to bind to.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Listening port.
    #[arg(long, default_value_t = 8787)]
    port: u16,

    /// Base URL of the upstream design API.
    #[arg(long, env = "NODEBRIDGE_API_BASE_URL", default_value = "https://api.figma.com")]
    api_base_url: String,
}

struct AppState {
    cache: Arc<NodeCache>,
    client: Arc<HttpDesignApiClient>,
    config: ServiceConfig,
}

#[derive(Debug, thiserror::Error)]
enum ServerError {
    #[error("failed to open cache: {0}")]
    Cache(#[source] nodebridge::NodeBridgeError),
    #[error("failed to bind listener: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (axum::http::StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    logging::init_default_logging();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => ServiceConfig::load(path).map_err(ServerError::Cache)?,
        None => ServiceConfig::default(),
    };

    let cache = Arc::new(
        NodeCache::open(&config.cache_dir, config.max_l1_entries, config.l2_max_bytes, config.default_ttl_hours)
            .map_err(ServerError::Cache)?,
    );
    let client = Arc::new(
        HttpDesignApiClient::new(HttpClientConfig {
            base_url: args.api_base_url.clone(),
            timeout: config.http_timeout,
            max_retry_attempts: config.max_retry_attempts,
            retry_base_delay: config.retry_base_delay,
            circuit_breaker_threshold: config.circuit_breaker_threshold,
            circuit_breaker_cooldown: config.circuit_breaker_cooldown,
        })
        .map_err(ServerError::Cache)?,
    );

    let state = Arc::new(AppState { cache, client, config });
    let app = build_router(state.clone());
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse().map_err(|e| {
        ServerError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("{e}")))
    })?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, cache_dir = %state.config.cache_dir.display(), "nodebridge listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/stats", get(stats))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz(State(state): State<Arc<AppState>>) -> Json<HealthReport> {
    let report = HealthReport::from_cache_and_breaker(
        &state.cache.stats(),
        state.client.breaker_state(),
        state.config.l2_max_bytes,
    );
    Json(report)
}

async fn stats(State(state): State<Arc<AppState>>) -> Json<nodebridge::cache::Snapshot> {
    Json(state.cache.stats())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(err) => tracing::error!(?err, "failed to listen for shutdown signal"),
    }
}
