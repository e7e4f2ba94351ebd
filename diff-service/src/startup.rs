//! Application startup and lifecycle management.
//!
//! Clients are constructed once here and handed to handlers through
//! [`AppState`]. A client that fails to build stays unset and every request
//! that needs it fails with a configuration error.

use crate::config::{DiffConfig, ModelBackend, StorageBackend};
use crate::handlers;
use crate::services::providers::gemini::{GeminiBackend, GeminiConfig, GeminiTextProvider};
use crate::services::providers::mock::MockTextProvider;
use crate::services::auth::TokenError;
use crate::services::{
    AccessTokenSource, BlobStore, GcsBlobStore, LocalBlobStore, ProviderError, StorageError,
    TextProvider,
};
use axum::{
    body::Body,
    http::Request,
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use reqwest::Client;
use service_core::error::AppError;
use service_core::middleware::{metrics_middleware, request_id_middleware, REQUEST_ID_HEADER};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::Span;

/// Process-lifetime client handles, read-only after bootstrap.
#[derive(Clone, Default)]
pub struct Clients {
    storage: Option<Arc<dyn BlobStore>>,
    model: Option<Arc<dyn TextProvider>>,
}

impl Clients {
    pub fn new(storage: Option<Arc<dyn BlobStore>>, model: Option<Arc<dyn TextProvider>>) -> Self {
        Self { storage, model }
    }

    /// Build both clients, leaving any that fail unset.
    pub async fn from_config(config: &DiffConfig) -> Self {
        let http = match Client::builder().build() {
            Ok(client) => client,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create HTTP client; no clients configured");
                return Self::default();
            }
        };
        let tokens = if config.needs_google_credentials() {
            match token_source(config) {
                Ok(tokens) => Some(tokens),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to resolve Google credentials");
                    None
                }
            }
        } else {
            None
        };

        let storage = match build_storage(config, http.clone(), tokens.clone()).await {
            Ok(storage) => {
                tracing::info!(
                    backend = ?config.storage.backend,
                    bucket = %config.storage.bucket,
                    "Initialized blob store"
                );
                Some(storage)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to initialize blob store");
                None
            }
        };

        let model = match build_text_provider(config, http, tokens) {
            Ok(model) => {
                tracing::info!(
                    backend = ?config.model.backend,
                    model = %config.model.name,
                    project = %config.gcp.project_id,
                    region = %config.gcp.region,
                    "Initialized text provider"
                );
                Some(model)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to initialize text provider");
                None
            }
        };

        Self { storage, model }
    }

    pub fn storage(&self) -> Result<Arc<dyn BlobStore>, AppError> {
        self.storage.clone().ok_or_else(|| {
            AppError::Configuration(anyhow::anyhow!("Storage client or bucket name not configured"))
        })
    }

    pub fn model(&self) -> Result<Arc<dyn TextProvider>, AppError> {
        self.model
            .clone()
            .ok_or_else(|| AppError::Configuration(anyhow::anyhow!("Text model not initialized")))
    }

    pub fn is_ready(&self) -> bool {
        self.storage.is_some() && self.model.is_some()
    }
}

fn token_source(config: &DiffConfig) -> Result<Arc<AccessTokenSource>, TokenError> {
    let source = match &config.auth.access_token {
        Some(token) => AccessTokenSource::Static(token.clone()),
        None => AccessTokenSource::application_default()?,
    };
    tracing::info!(credentials = source.describe(), "Resolved Google credentials");
    Ok(Arc::new(source))
}

pub async fn build_storage(
    config: &DiffConfig,
    http: Client,
    tokens: Option<Arc<AccessTokenSource>>,
) -> Result<Arc<dyn BlobStore>, StorageError> {
    match config.storage.backend {
        StorageBackend::Gcs => {
            let tokens = tokens.ok_or_else(|| {
                StorageError::NotConfigured("Google credentials unavailable".to_string())
            })?;
            Ok(Arc::new(GcsBlobStore::new(
                http,
                config.storage.bucket.clone(),
                tokens,
            )?))
        }
        StorageBackend::Local => Ok(Arc::new(
            LocalBlobStore::new(&config.storage.local_path).await?,
        )),
    }
}

/// Blob store for one-off tools that do not need the model.
pub async fn build_storage_from_config(
    config: &DiffConfig,
) -> Result<Arc<dyn BlobStore>, StorageError> {
    let http = Client::builder()
        .build()
        .map_err(|e| StorageError::Network(e.to_string()))?;
    let tokens = match config.storage.backend {
        StorageBackend::Gcs => {
            Some(token_source(config).map_err(|e| StorageError::Auth(e.to_string()))?)
        }
        StorageBackend::Local => None,
    };
    build_storage(config, http, tokens).await
}

pub fn build_text_provider(
    config: &DiffConfig,
    http: Client,
    tokens: Option<Arc<AccessTokenSource>>,
) -> Result<Arc<dyn TextProvider>, ProviderError> {
    let backend = match config.model.backend {
        ModelBackend::Mock => return Ok(Arc::new(MockTextProvider::responding("{}"))),
        ModelBackend::Vertex => GeminiBackend::VertexAi {
            project_id: config.gcp.project_id.clone(),
            region: config.gcp.region.clone(),
            tokens: tokens.ok_or_else(|| {
                ProviderError::NotConfigured("Google credentials unavailable".to_string())
            })?,
        },
        ModelBackend::ApiKey => GeminiBackend::ApiKey {
            api_key: config.model.api_key.clone().ok_or_else(|| {
                ProviderError::NotConfigured("GOOGLE_API_KEY not set".to_string())
            })?,
        },
    };

    let provider = GeminiTextProvider::new(
        GeminiConfig {
            backend,
            model: config.model.name.clone(),
            base_url: None,
        },
        http,
    )?;
    Ok(Arc::new(provider))
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: DiffConfig,
    pub clients: Clients,
}

impl AppState {
    pub fn new(config: DiffConfig, clients: Clients) -> Self {
        Self { config, clients }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/diff", post(handlers::diff_files))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

fn request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-");

    tracing::info_span!(
        "http_request",
        request_id = %request_id,
        method = %request.method(),
        uri = %request.uri(),
    )
}

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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build clients from configuration and bind the listener.
    pub async fn build(config: DiffConfig) -> Result<Self, AppError> {
        let clients = Clients::from_config(&config).await;
        Self::build_with_state(AppState::new(config, clients)).await
    }

    /// Bind the listener for an already assembled state (port 0 = random port).
    pub async fn build_with_state(state: AppState) -> Result<Self, AppError> {
        let address = format!("{}:{}", state.config.common.host, state.config.common.port);
        let listener = TcpListener::bind(&address).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", address, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            host = %state.config.common.host,
            port,
            mode = if state.config.is_cloud_mode() { "cloud" } else { "local" },
            "Diff service listening"
        );

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until a shutdown signal arrives.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);
        axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                tracing::error!("HTTP server error: {}", e);
                e
            })
    }
}
