use std::sync::Arc;

use sluice_api::{BackendError, BulkItemError, IndexDirective, Refresh, SearchBackend};

use crate::batch::Batch;

/// One item the backend refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedItem {
    /// Position of the record inside its batch.
    pub position: usize,
    pub directive: IndexDirective,
    pub status: u16,
    pub error: BulkItemError,
}

/// Result of one bulk flush.
#[derive(Debug, Clone, PartialEq)]
pub enum FlushOutcome {
    /// Every item was indexed.
    Accepted { items: usize },
    /// The request went through but some items were rejected. The batch
    /// still counts as sent.
    Partial { items: usize, rejected: Vec<RejectedItem> },
    /// Transport or backend failure; nothing can be assumed about the batch.
    Failed(BackendError),
}

impl FlushOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, FlushOutcome::Failed(_))
    }

    pub fn rejected(&self) -> &[RejectedItem] {
        match self {
            FlushOutcome::Partial { rejected, .. } => rejected,
            _ => &[],
        }
    }
}

/// Sends batches to the backend as single bulk requests. No retries.
pub struct BulkSink {
    backend: Arc<dyn SearchBackend>,
    refresh: Refresh,
}

impl BulkSink {
    pub fn new(backend: Arc<dyn SearchBackend>, refresh: Refresh) -> Self {
        Self { backend, refresh }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub async fn flush(&self, batch: Batch) -> FlushOutcome {
        let items = batch.len();
        let response = match self.backend.bulk(batch.ops(), self.refresh).await {
            Ok(r) => r,
            Err(e) => return FlushOutcome::Failed(e.with_context("bulk write")),
        };

        if !response.items.is_empty() && response.items.len() != items {
            tracing::warn!(
                backend = %self.backend.name(),
                sent = items,
                acknowledged = response.items.len(),
                "bulk acknowledgement count differs from batch size"
            );
        }

        let rejected: Vec<RejectedItem> = response
            .rejected()
            .filter_map(|(position, item)| {
                item.error.clone().map(|error| RejectedItem {
                    position,
                    directive: item.directive.clone(),
                    status: item.status,
                    error,
                })
            })
            .collect();

        if rejected.is_empty() {
            if response.errors {
                tracing::warn!(
                    backend = %self.backend.name(),
                    "bulk response flagged errors without naming a rejected item"
                );
            }
            FlushOutcome::Accepted { items }
        } else {
            FlushOutcome::Partial { items, rejected }
        }
    }
}
