//! HTTP front end of the token finder.
//!
//! axum accepts the connection; every request is handed to the typed router
//! in [`routing`], which owns path normalization, dispatch and error mapping.

pub mod config;
pub mod handlers;
pub mod request_id;
pub mod response;
pub mod routing;

use analyze_pipeline::{AnalyzeUseCase, PromptTranslator, SearchOrchestrator};
use anyhow::{Context, Result};
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{Method, Request, Uri},
    middleware,
    Extension, Router,
};
use completion_client::CompletionClient;
use finder_core::TextCompletion;
use request_store::{AnalyzeRequestStore, StoreDb};
use searchcaster_client::SearchcasterClient;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use config::ServerConfig;
use request_id::{request_id_middleware, RequestId};
use response::ApiResponse;


#[derive(Clone)]
pub struct AppState {
    pub use_case: AnalyzeUseCase,
    pub completion: Arc<dyn TextCompletion>,
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .fallback(serve_api)
        .with_state(state)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %req.method(),
                uri = %req.uri(),
                request_id = tracing::field::Empty,
            )
        }))
}

async fn serve_api(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> ApiResponse {
    let raw_url = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());

    let request_id = request_id.as_ref().map(|Extension(id)| id.0.as_str()).unwrap_or("-");
    tracing::info!("Received {} {} [{}]", method, raw_url, request_id);
    routing::dispatch(&state, method.as_str(), raw_url, body).await
}

pub fn init_tracing() {
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };

    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(env_filter()).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter()).init();
    }
}

/// Wire the live collaborators from configuration.
pub fn build_state(config: &ServerConfig) -> Result<AppState> {
    let completion: Arc<dyn TextCompletion> = Arc::new(
        CompletionClient::new(config.completion_config()).context("Failed to build completion client")?,
    );
    let search = Arc::new(
        SearchcasterClient::new(config.searchcaster_config()).context("Failed to build Searchcaster client")?,
    );
    let store = AnalyzeRequestStore::new(
        StoreDb::connect_lazy(&config.database_url)
            .with_context(|| format!("Invalid DATABASE_URL '{}'", config.database_url))?,
    );

    let strategy = config.ticker_strategy.build(completion.clone());
    tracing::info!("Ticker strategy: {:?}", config.ticker_strategy);

    let use_case = AnalyzeUseCase::new(
        PromptTranslator::new(completion.clone()),
        store,
        SearchOrchestrator::new(search, strategy),
    );

    Ok(AppState { use_case, completion })
}

pub async fn run_server() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env()?;
    if config.openai_api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY not set; analyze and predict requests will fail");
    }

    let state = build_state(&config)?;
    let app = build_app(state);

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Token finder API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server failed")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
