pub mod ingest;
pub mod serve;

use std::sync::Arc;

use sluice_api::SearchBackend;
use sluice_elastic::connection;
use sluice_memory::MemoryBackend;

use crate::config::{BackendKind, ServerConfig};
use crate::error::ServerError;

/// Open the configured backend. For Elasticsearch this starts the shared
/// connection and pings the cluster; a failed ping is only logged.
pub(crate) async fn open_backend(config: &ServerConfig) -> Result<Arc<dyn SearchBackend>, ServerError> {
    match config.backend {
        BackendKind::Elastic => {
            let client = connection::startup(&config.elastic)?;
            match client.ping().await {
                Ok(info) => tracing::info!(
                    cluster = %info.cluster_name,
                    version = %info.version,
                    "elasticsearch reachable"
                ),
                Err(e) => tracing::warn!(
                    url = %client.base_url(),
                    error = %e,
                    "elasticsearch not reachable at startup"
                ),
            }
            let backend: Arc<dyn SearchBackend> = client;
            Ok(backend)
        }
        BackendKind::Memory => {
            tracing::info!(page_size = config.memory.page_size, "using in-memory backend");
            let backend: Arc<dyn SearchBackend> = Arc::new(MemoryBackend::with_config(&config.memory));
            Ok(backend)
        }
    }
}

pub(crate) fn close_backend(config: &ServerConfig) {
    if config.backend == BackendKind::Elastic {
        connection::shutdown();
    }
}
