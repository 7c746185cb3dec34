use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::query::QueryExpr;
use crate::record::Record;

// ════════════════════════════════════════════════════════════════
//  Bulk protocol types
// ════════════════════════════════════════════════════════════════

/// Action line preceding each payload in a bulk body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDirective {
    #[serde(rename = "_index")]
    pub index: String,
}

impl IndexDirective {
    pub fn new(index: impl Into<String>) -> Self {
        Self { index: index.into() }
    }
}

/// One logical bulk operation: directive + payload, i.e. two physical
/// entries on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkOp {
    pub directive: IndexDirective,
    pub record: Record,
}

impl BulkOp {
    /// Physical bulk-protocol entries per logical operation.
    pub const ENTRIES: usize = 2;
}

/// Visibility requested for written documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Refresh {
    /// Block until the written documents are searchable.
    #[default]
    Immediate,
    /// Leave visibility to the backend's refresh cycle.
    Background,
}

/// Error detail for one rejected bulk item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkItemError {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub reason: String,
}

/// Per-item acknowledgement, in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemResult {
    pub directive: IndexDirective,
    pub id: Option<String>,
    pub status: u16,
    pub error: Option<BulkItemError>,
}

impl BulkItemResult {
    pub fn is_rejected(&self) -> bool {
        self.error.is_some()
    }
}

/// Synchronous acknowledgement of one bulk request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkResponse {
    /// Backend-reported "at least one item failed" flag.
    pub errors: bool,
    pub items: Vec<BulkItemResult>,
}

impl BulkResponse {
    pub fn rejected(&self) -> impl Iterator<Item = (usize, &BulkItemResult)> {
        self.items.iter().enumerate().filter(|(_, item)| item.is_rejected())
    }
}

/// Search acknowledgement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResponse {
    /// Server-reported match count; may exceed `hits.len()`.
    pub total: u64,
    /// Stored documents of the returned page.
    pub hits: Vec<Record>,
}

// ════════════════════════════════════════════════════════════════
//  Backend trait
// ════════════════════════════════════════════════════════════════

/// Opaque bulk-write + search service.
///
/// Implementations hold no per-request state, so one instance may be
/// shared by any number of concurrent ingestion and query pipelines.
pub trait SearchBackend: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Send `ops` as a single bulk request and wait for acknowledgement.
    /// Item-level rejections are reported in the response, not as `Err`.
    fn bulk<'a>(
        &'a self,
        ops: &'a [BulkOp],
        refresh: Refresh,
    ) -> Pin<Box<dyn Future<Output = Result<BulkResponse, BackendError>> + Send + 'a>>;

    /// Run `query` against `index`.
    fn search<'a>(
        &'a self,
        index: &'a str,
        query: &'a QueryExpr,
    ) -> Pin<Box<dyn Future<Output = Result<SearchResponse, BackendError>> + Send + 'a>>;
}
