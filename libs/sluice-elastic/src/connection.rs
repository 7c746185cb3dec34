use std::sync::{Arc, PoisonError, RwLock};

use sluice_api::BackendError;

use crate::client::ElasticClient;
use crate::config::ElasticConfig;

// ═══════════════════════════════════════════════════════════════
//  Process-wide connection
// ═══════════════════════════════════════════════════════════════

static CONNECTION: RwLock<Option<Arc<ElasticClient>>> = RwLock::new(None);

/// Open the shared connection. A second call returns the existing handle
/// and ignores `config`.
pub fn startup(config: &ElasticConfig) -> Result<Arc<ElasticClient>, BackendError> {
    let mut slot = CONNECTION.write().unwrap_or_else(PoisonError::into_inner);
    if let Some(client) = slot.as_ref() {
        return Ok(client.clone());
    }
    let client = Arc::new(ElasticClient::new(config)?);
    tracing::info!(url = %client.base_url(), "elasticsearch connection opened");
    *slot = Some(client.clone());
    Ok(client)
}

/// Handle opened by [`startup`].
pub fn shared() -> Result<Arc<ElasticClient>, BackendError> {
    CONNECTION
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
        .ok_or_else(|| BackendError::config("elasticsearch connection not started"))
}

/// Drop the shared handle. In-flight requests holding a clone finish
/// normally. Returns whether a connection was open.
pub fn shutdown() -> bool {
    let closed = CONNECTION
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .take()
        .is_some();
    if closed {
        tracing::info!("elasticsearch connection closed");
    }
    closed
}
