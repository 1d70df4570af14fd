//! HTTP server for sherpad.

use anyhow::Result;
use axum::Router;
use sherpa_common::{Config, MemoryProfileStore, ProfileStore, ServiceCategory};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::chat::chain::{ModelFallbackChain, ModelProvider};
use crate::chat::gemini::GeminiProvider;
use crate::chat::ChatEngine;
use crate::credentials::CredentialManager;
use crate::enrichment::EnrichmentService;
use crate::metrics::MetricsRegistry;
use crate::routes;

/// Application state shared across handlers.
pub struct AppState {
    pub engine: ChatEngine,
    pub credentials: Arc<CredentialManager>,
    pub metrics: Arc<MetricsRegistry>,
    pub start_time: Instant,
}

impl AppState {
    /// Wire the full daemon from config: credentials, metrics, the model
    /// chain and the enrichment pairs. Comes up even fully degraded.
    pub async fn new(config: Config) -> Result<Self> {
        let metrics = Arc::new(MetricsRegistry::new(config.alerts.clone()));
        let credentials = Arc::new(CredentialManager::from_config(&config.credentials));

        let enrichment = Arc::new(
            EnrichmentService::from_config(&config, &credentials, metrics.clone()).await?,
        );
        let chain = build_model_chain(&config, &credentials, metrics.clone()).await;

        let store: Option<Arc<dyn ProfileStore>> = if config.server.profile_cache {
            info!("[*]  Profile cache enabled (in-memory)");
            Some(Arc::new(MemoryProfileStore::new()))
        } else {
            None
        };

        let engine = ChatEngine::new(chain, enrichment, config.chat.persona.clone(), store);

        Ok(Self {
            engine,
            credentials,
            metrics,
            start_time: Instant::now(),
        })
    }
}

/// Build the ordered model chain. Models with no usable credential are
/// skipped; an empty chain still serves canned replies.
async fn build_model_chain(
    config: &Config,
    credentials: &CredentialManager,
    metrics: Arc<MetricsRegistry>,
) -> ModelFallbackChain {
    let timeout = Duration::from_secs(config.chat.request_timeout_secs);
    let mut providers: Vec<Arc<dyn ModelProvider>> = Vec::new();

    for model in &config.chat.models {
        let provider = credentials
            .initialize_client(ServiceCategory::ModelGeneration, model, |group| {
                let model = model.clone();
                async move { GeminiProvider::new(model, group.key, timeout) }
            })
            .await;
        if let Some(provider) = provider {
            providers.push(provider as Arc<dyn ModelProvider>);
        }
    }

    if providers.is_empty() {
        warn!("[!]  No model provider available; chat will serve canned replies");
    } else {
        let names: Vec<&str> = providers.iter().map(|p| p.name()).collect();
        info!("[*]  Model chain: {}", names.join(" -> "));
    }

    ModelFallbackChain::new(
        providers,
        config.chat.last_retries,
        Duration::from_millis(config.chat.retry_backoff_ms),
        metrics,
    )
}

/// Run the HTTP server until the listener fails.
pub async fn run(state: AppState, bind_address: &str) -> Result<()> {
    let state = Arc::new(state);

    let app = Router::new()
        .merge(routes::chat_routes())
        .merge(routes::status_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!("[>]  Listening on http://{}", bind_address);

    axum::serve(listener, app).await?;
    Ok(())
}
