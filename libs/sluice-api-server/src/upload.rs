use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Multipart, State};
use axum::extract::multipart::Field;
use serde::Serialize;
use tempfile::{NamedTempFile, TempPath};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

use sluice_pipeline::InputResource;

use crate::AppState;
use crate::error::ApiError;

// ═══════════════════════════════════════════════════════════════
//  REST: POST /upload-data  (multipart, field "file")
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UploadResponse {
    message: &'static str,
    rows_processed: u64,
}

pub(crate) async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let (file, path) = spool(&state, field).await?;
        let index = state.ingestor.config().index.as_str();
        let report = state.ingestor.ingest(file, index, path).await?;

        return Ok(Json(UploadResponse {
            message: "Data uploaded successfully to Elasticsearch",
            rows_processed: report.rows_processed,
        }));
    }

    Err(ApiError::Upload("missing multipart field 'file'".into()))
}

/// Stream the field body into a fresh temp file in the upload directory
/// and rewind it for reading.
async fn spool(state: &AppState, mut field: Field<'_>) -> Result<(tokio::fs::File, TempPath), ApiError> {
    let named = create_temp(state.upload_dir.clone()).await?;
    let (file, path) = named.into_parts();
    let mut file = tokio::fs::File::from_std(file);

    let written = async {
        let mut bytes: u64 = 0;
        while let Some(chunk) = field.chunk().await? {
            bytes += chunk.len() as u64;
            file.write_all(&chunk)
                .await
                .map_err(|e| ApiError::Upload(format!("write temp file: {e}")))?;
        }
        file.flush()
            .await
            .map_err(|e| ApiError::Upload(format!("write temp file: {e}")))?;
        file.seek(SeekFrom::Start(0))
            .await
            .map_err(|e| ApiError::Upload(format!("rewind temp file: {e}")))?;
        Ok::<u64, ApiError>(bytes)
    }
    .await;

    match written {
        Ok(bytes) => {
            tracing::debug!(path = %path.label(), bytes, "upload spooled");
            Ok((file, path))
        }
        Err(e) => {
            drop(file);
            if let Err(cleanup) = path.release() {
                tracing::warn!(error = %cleanup, "remove partial upload");
            }
            Err(e)
        }
    }
}

/// Create the spool file on the blocking pool.
async fn create_temp(dir: Arc<PathBuf>) -> Result<NamedTempFile, ApiError> {
    tokio::task::spawn_blocking(move || {
        tempfile::Builder::new()
            .prefix("upload-")
            .suffix(".csv")
            .tempfile_in(dir.as_path())
    })
    .await
    .map_err(|e| ApiError::Upload(format!("create temp file: {e}")))?
    .map_err(|e| ApiError::Upload(format!("create temp file: {e}")))
}
