//! HTTP surface: CSV upload into the index and filtered campaign lookup.

mod campaigns;
pub mod config;
pub mod error;
mod upload;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tokio_util::sync::CancellationToken;

use sluice_api::SearchBackend;
use sluice_pipeline::{IngestConfig, IngestError, Ingestor};
use sluice_query::QueryExecutor;

pub use config::ApiConfig;
pub use error::{ApiError, ServeError};

#[derive(Clone)]
pub struct AppState {
    ingestor: Arc<Ingestor>,
    queries: Arc<QueryExecutor>,
    upload_dir: Arc<PathBuf>,
}

impl AppState {
    /// Uploads and lookups both target `ingest.index`.
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        ingest: IngestConfig,
        upload_dir: impl Into<PathBuf>,
    ) -> Result<Self, IngestError> {
        let queries = QueryExecutor::new(backend.clone(), ingest.index.clone());
        let ingestor = Ingestor::new(backend, ingest)?;
        Ok(Self {
            ingestor: Arc::new(ingestor),
            queries: Arc::new(queries),
            upload_dir: Arc::new(upload_dir.into()),
        })
    }
}

pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", get(handle_root))
        .route("/upload-data", post(upload::handle_upload))
        .route("/campaigns", get(campaigns::handle_campaigns))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

/// Serve until `shutdown` fires. The upload directory is created first.
pub async fn run(config: &ApiConfig, state: AppState, shutdown: CancellationToken) -> Result<(), ServeError> {
    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .map_err(|source| ServeError::UploadDir {
            path: config.upload_dir.display().to_string(),
            source,
        })?;

    let port = config.port;
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .map_err(|source| ServeError::Bind { port, source })?;
    tracing::info!(port, upload_dir = %config.upload_dir.display(), "api listening");

    axum::serve(listener, router(state, config.max_upload_bytes))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(ServeError::Serve)?;

    Ok(())
}

async fn handle_root() -> &'static str {
    "Hello World!"
}
