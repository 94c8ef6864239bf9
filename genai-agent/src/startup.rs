//! Application startup and lifecycle management.

use crate::config::AgentConfig;
use crate::handlers;
use crate::services::extractor::{PdfTextExtractor, TextExtractor};
use crate::services::providers::gemini::{GeminiConfig, GeminiTextProvider};
use crate::services::providers::TextProvider;
use crate::services::{DownloadStore, Downloader, Summarizer};
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{metrics_middleware, request_id_middleware};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: AgentConfig,
    pub downloader: Arc<Downloader>,
    pub summarizer: Summarizer,
    pub started_at: Instant,
}

/// All routes with the shared middleware stack.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.upload.max_bytes;

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route("/download", post(handlers::download_file))
        .route("/summarize", post(handlers::summarize_document))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the Gemini provider and the PDF extractor.
    pub async fn build(config: AgentConfig) -> Result<Self, AppError> {
        let gemini = GeminiTextProvider::new(GeminiConfig {
            api_base: config.genai.api_base.clone(),
            api_key: config.genai.api_key.clone(),
            api_key_var: config.genai.api_key_var.clone(),
            model: config.genai.text_model.clone(),
            timeout: config.genai.timeout(),
        })
        .map_err(|e| {
            AppError::InternalError(anyhow::anyhow!("Failed to build Gemini client: {}", e))
        })?;

        if gemini.is_configured() {
            tracing::info!(model = %config.genai.text_model, "Initialized Gemini text provider");
        } else {
            tracing::warn!(
                model = %config.genai.text_model,
                key_var = %config.genai.api_key_var,
                "Gemini API key not set; /summarize will fail until it is configured"
            );
        }

        Self::build_with(config, Arc::new(gemini), Arc::new(PdfTextExtractor)).await
    }

    /// Build the application around the given collaborators.
    pub async fn build_with(
        config: AgentConfig,
        provider: Arc<dyn TextProvider>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Result<Self, AppError> {
        let store = DownloadStore::new(&config.storage.download_dir, config.storage.collision_policy)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Failed to initialize download directory at {}: {}",
                    config.storage.download_dir,
                    e
                );
                e
            })?;

        let downloader = Downloader::new(store, config.fetch.timeout()).map_err(|e| {
            AppError::InternalError(anyhow::anyhow!("Failed to build HTTP client: {}", e))
        })?;

        let state = AppState {
            config: config.clone(),
            downloader: Arc::new(downloader),
            summarizer: Summarizer::new(extractor, provider),
            started_at: Instant::now(),
        };

        // Port 0 = random port for testing
        let addr = config.common.bind_address();
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            port,
            download_dir = %config.storage.download_dir,
            collision_policy = ?config.storage.collision_policy,
            "Listening"
        );

        Ok(Self {
            port,
            listener,
            router: router(state),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
