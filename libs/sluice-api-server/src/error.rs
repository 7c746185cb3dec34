use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use sluice_pipeline::IngestError;
use sluice_query::QueryError;

/// Failure of a request handler, rendered as `{message, error}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("multipart: {0}")]
    Multipart(#[from] MultipartError),

    #[error("upload: {0}")]
    Upload(String),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("invalid filter body: {0}")]
    Filter(#[source] serde_json::Error),

    #[error(transparent)]
    Query(#[from] QueryError),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    error: String,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Multipart(e) => e.status(),
            ApiError::Filter(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            ApiError::Multipart(_) | ApiError::Upload(_) | ApiError::Ingest(_) => {
                "Error processing CSV file"
            }
            ApiError::Filter(_) | ApiError::Query(_) => "Error retrieving campaigns",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::error!(status = %status, error = %self, "request failed");
        let body = ErrorBody { message: self.message(), error: self.to_string() };
        (status, Json(body)).into_response()
    }
}

/// Failure to bring the HTTP surface up.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("create upload dir {path}: {source}")]
    UploadDir { path: String, source: std::io::Error },

    #[error("bind api :{port}: {source}")]
    Bind { port: u16, source: std::io::Error },

    #[error("axum serve: {0}")]
    Serve(std::io::Error),
}
