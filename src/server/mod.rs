//! HTTP surface: routes, shared state and the JSON error boundary.

mod errors;
mod maps;
mod search;
mod session;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use reqwest::Client;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::{ApiKey, Config};
use crate::fetch::PageFetcher;
use crate::llm::{ClaudeClient, EntityExtractionProvider, EntityExtractor, ModelChoice};
use crate::maps::{MapService, MemoryMapStore};
use crate::search::{Orchestrator, SearchProvider, SerpApiClient};

pub struct AppState {
    pub orchestrator: Orchestrator,
    pub maps: MapService,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, maps: MapService, request_timeout: Duration) -> Self {
        Self {
            orchestrator,
            maps,
            request_timeout,
        }
    }

    /// Wires the real providers. Missing credentials are not fatal: the
    /// affected requests fail (search) or degrade per hit (extraction).
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let http = Client::builder().build()?;

        let search = ApiKey::from_option(config.serpapi_key.as_deref()).map(|key| {
            Arc::new(SerpApiClient::new(http.clone(), key, &config.serpapi_base_url))
                as Arc<dyn SearchProvider>
        });
        if search.is_none() {
            warn!("SERPAPI_KEY not set; /search will fail");
        }

        let model = ApiKey::from_option(config.anthropic_api_key.as_deref()).map(|key| {
            Arc::new(ClaudeClient::new(http.clone(), key, &config.anthropic_base_url))
                as Arc<dyn EntityExtractionProvider>
        });
        if model.is_none() {
            warn!("ANTHROPIC_API_KEY not set; entity extraction disabled");
        }

        let extractor = EntityExtractor::new(
            model,
            ModelChoice {
                standard: config.extraction_model.clone(),
                lite: config.extraction_model_lite.clone(),
            },
        );
        let fetcher = PageFetcher::new(http, !config.allow_private_hosts);
        let mode = config.resource_mode();
        info!(?mode, "pipeline configured");

        Ok(Self::new(
            Orchestrator::new(search, fetcher, extractor, mode),
            MapService::new(Arc::new(MemoryMapStore::new())),
            config.request_timeout(),
        ))
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search::search_get).post(search::search_post))
        .route("/maps", get(maps::list_maps).post(maps::save_map))
        .route("/maps/{id}", get(maps::get_map).delete(maps::delete_map))
        .route("/session", post(session::create_session))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        // Method and path only: query strings can carry session ids.
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
}
