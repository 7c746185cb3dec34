use sluice_api::BackendError;

/// The input stream is not valid delimited text.
///
/// `row` is the 1-based data row (header excluded) the decoder was on; 0
/// means the header itself.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("row {row}: {source}")]
    Csv { row: u64, source: csv_async::Error },

    /// A quoted field was still open when the input ended.
    #[error("row {row}: unterminated quoted field")]
    UnterminatedQuote { row: u64 },
}

impl DecodeError {
    pub fn row(&self) -> u64 {
        match self {
            DecodeError::Csv { row, .. } | DecodeError::UnterminatedQuote { row } => *row,
        }
    }
}

/// Terminal failure of an ingestion run.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("config: {0}")]
    Config(String),

    #[error("malformed input after {rows_accepted} rows: {source}")]
    MalformedInput { rows_accepted: u64, source: DecodeError },

    #[error("backend unavailable after {rows_accepted} rows: {source}")]
    BackendUnavailable { rows_accepted: u64, source: BackendError },
}

impl IngestError {
    /// Rows decoded before the run aborted. `None` for configuration errors.
    pub fn rows_accepted(&self) -> Option<u64> {
        match self {
            IngestError::Config(_) => None,
            IngestError::MalformedInput { rows_accepted, .. }
            | IngestError::BackendUnavailable { rows_accepted, .. } => Some(*rows_accepted),
        }
    }
}

/// The input resource could not be released. Logged, never returned.
#[derive(Debug, thiserror::Error)]
#[error("release {resource}: {source}")]
pub struct CleanupError {
    pub resource: String,
    pub source: std::io::Error,
}
