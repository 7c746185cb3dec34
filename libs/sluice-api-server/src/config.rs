use std::path::PathBuf;

use serde::Deserialize;

// ═══════════════════════════════════════════════════════════════
//  Api Config
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Where upload bodies are spooled before ingestion.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    /// Largest accepted request body, bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            upload_dir: default_upload_dir(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_port() -> u16 {
    3000
}
fn default_upload_dir() -> PathBuf {
    "uploads".into()
}
fn default_max_upload_bytes() -> usize {
    1 << 30
}
