use std::sync::Arc;

use serde::Serialize;

use sluice_api::{BackendError, Record, SearchBackend};

use crate::predicate::{FilterSpec, build_predicate};

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("backend unavailable: {0}")]
    BackendUnavailable(#[source] BackendError),
}

/// Hits of one page plus the number of matches the backend reported.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub campaigns: Vec<Record>,
    /// Server-side match count, which may exceed `campaigns.len()`.
    pub total: u64,
}

/// Runs filtered searches against one index.
pub struct QueryExecutor {
    backend: Arc<dyn SearchBackend>,
    index: String,
}

impl QueryExecutor {
    pub fn new(backend: Arc<dyn SearchBackend>, index: impl Into<String>) -> Self {
        Self { backend, index: index.into() }
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub async fn execute(&self, filters: &FilterSpec) -> Result<QueryResult, QueryError> {
        let query = build_predicate(filters);
        tracing::debug!(
            index = %self.index,
            clauses = query.clauses().len(),
            match_all = query.is_match_all(),
            "running search"
        );

        let response = self
            .backend
            .search(&self.index, &query)
            .await
            .map_err(|e| QueryError::BackendUnavailable(e.with_context("search")))?;

        tracing::debug!(index = %self.index, total = response.total, hits = response.hits.len(), "search done");
        Ok(QueryResult {
            campaigns: response.hits,
            total: response.total,
        })
    }
}
