use serde::Deserialize;

use sluice_api::Refresh;

use crate::IngestError;

// ═══════════════════════════════════════════════════════════════
//  Ingest Config
// ═══════════════════════════════════════════════════════════════

/// Tuning for one ingestion pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// Target index for uploads.
    #[serde(default = "default_index")]
    pub index: String,
    /// Records per bulk request (each record is two bulk entries).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Capacity of the decoder → orchestrator channel, in records.
    #[serde(default = "default_source_buffer")]
    pub source_buffer: usize,
    /// Visibility requested for every bulk write.
    #[serde(default)]
    pub refresh: Refresh,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            index: default_index(),
            batch_size: default_batch_size(),
            source_buffer: default_source_buffer(),
            refresh: Refresh::default(),
        }
    }
}

impl IngestConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.index.trim().is_empty() {
            return Err(IngestError::Config("ingest: 'index' must not be empty".into()));
        }
        if self.batch_size == 0 {
            return Err(IngestError::Config("ingest: 'batch_size' must be at least 1".into()));
        }
        if self.source_buffer == 0 {
            return Err(IngestError::Config("ingest: 'source_buffer' must be at least 1".into()));
        }
        Ok(())
    }
}

fn default_index() -> String {
    "campaigns".into()
}
fn default_batch_size() -> usize {
    1000
}
fn default_source_buffer() -> usize {
    1024
}
