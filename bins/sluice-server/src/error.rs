#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("config ({context}): {detail}")]
    Config { context: &'static str, detail: String },

    #[error("backend: {0}")]
    Backend(#[from] sluice_api::BackendError),

    #[error("{0}")]
    Ingest(#[from] sluice_pipeline::IngestError),

    #[error("{0}")]
    Serve(#[from] sluice_api_server::ServeError),

    #[error("open '{path}': {source}")]
    Input { path: String, source: std::io::Error },

    #[error("signal: {0}")]
    Signal(#[from] std::io::Error),
}
