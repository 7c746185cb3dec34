use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use sluice_api::{
    BackendError, BulkItemError, BulkItemResult, BulkOp, BulkResponse, QueryExpr, Record, Refresh,
    SearchBackend, SearchResponse,
};

// ═══════════════════════════════════════════════════════════════
//  MemoryConfig
// ═══════════════════════════════════════════════════════════════

fn default_page_size() -> usize {
    10
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct MemoryConfig {
    /// Hits returned per search; `total` still counts every match.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self { page_size: default_page_size() }
    }
}

// ═══════════════════════════════════════════════════════════════
//  MemoryBackend
// ═══════════════════════════════════════════════════════════════

type RejectFn = Box<dyn Fn(&Record) -> bool + Send + Sync>;

struct BulkCall {
    size: usize,
    refresh: Refresh,
    /// Only kept when record capture is on.
    records: Vec<Record>,
}

/// In-process [`SearchBackend`]. Documents live in a map of index name to
/// insertion-ordered records. The size and refresh mode of every bulk call
/// are recorded; the records themselves only with
/// [`MemoryBackend::capture_records`].
///
/// The builder methods inject delays, transport failures and per-item
/// rejections.
pub struct MemoryBackend {
    indices: RwLock<HashMap<String, Vec<Record>>>,
    calls: Mutex<Vec<BulkCall>>,
    page_size: usize,
    flush_delay: Option<Duration>,
    fail_flush_at: Option<usize>,
    fail_search: bool,
    capture_records: bool,
    reject: Option<RejectFn>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    next_id: AtomicU64,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_config(&MemoryConfig::default())
    }

    pub fn with_config(config: &MemoryConfig) -> Self {
        Self {
            indices: RwLock::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            page_size: config.page_size,
            flush_delay: None,
            fail_flush_at: None,
            fail_search: false,
            capture_records: false,
            reject: None,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            next_id: AtomicU64::new(1),
        }
    }

    /// Hold every bulk call for `delay` before acknowledging it.
    pub fn with_flush_delay(mut self, delay: Duration) -> Self {
        self.flush_delay = Some(delay);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Fail the `n`-th bulk call (1-based) with a transport error. The call
    /// is still recorded.
    pub fn fail_flush_at(mut self, n: usize) -> Self {
        self.fail_flush_at = Some(n);
        self
    }

    /// Reject, with status 400, every item whose record matches.
    pub fn reject_where<F>(mut self, f: F) -> Self
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        self.reject = Some(Box::new(f));
        self
    }

    pub fn fail_search(mut self) -> Self {
        self.fail_search = true;
        self
    }

    /// Keep a copy of every record sent through bulk calls, for
    /// [`MemoryBackend::flushed_records`].
    pub fn capture_records(mut self) -> Self {
        self.capture_records = true;
        self
    }

    /// Seed `index` directly, bypassing the bulk path.
    pub fn insert(&self, index: &str, records: impl IntoIterator<Item = Record>) {
        let mut indices = self.indices.write().unwrap_or_else(PoisonError::into_inner);
        indices.entry(index.to_string()).or_default().extend(records);
    }

    /// Stored documents of `index`, in insertion order.
    pub fn documents(&self, index: &str) -> Vec<Record> {
        let indices = self.indices.read().unwrap_or_else(PoisonError::into_inner);
        indices.get(index).cloned().unwrap_or_default()
    }

    /// Records per bulk call, in call order (failed calls included).
    pub fn flush_sizes(&self) -> Vec<usize> {
        self.calls().iter().map(|c| c.size).collect()
    }

    /// Every record sent through bulk calls, in the order sent. Empty unless
    /// record capture is on.
    pub fn flushed_records(&self) -> Vec<Record> {
        self.calls().iter().flat_map(|c| c.records.iter().cloned()).collect()
    }

    pub fn refresh_modes(&self) -> Vec<Refresh> {
        self.calls().iter().map(|c| c.refresh).collect()
    }

    /// Highest number of bulk calls observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn calls(&self) -> MutexGuard<'_, Vec<BulkCall>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn store(&self, ops: &[BulkOp]) -> BulkResponse {
        let mut indices = self.indices.write().unwrap_or_else(PoisonError::into_inner);
        let mut items = Vec::with_capacity(ops.len());

        for op in ops {
            let rejected = self.reject.as_ref().is_some_and(|f| f(&op.record));
            if rejected {
                items.push(BulkItemResult {
                    directive: op.directive.clone(),
                    id: None,
                    status: 400,
                    error: Some(BulkItemError {
                        kind: "mapper_parsing_exception".into(),
                        reason: "document rejected".into(),
                    }),
                });
                continue;
            }

            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            indices
                .entry(op.directive.index.clone())
                .or_default()
                .push(op.record.clone());
            items.push(BulkItemResult {
                directive: op.directive.clone(),
                id: Some(id.to_string()),
                status: 201,
                error: None,
            });
        }

        BulkResponse {
            errors: items.iter().any(BulkItemResult::is_rejected),
            items,
        }
    }
}

impl SearchBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn bulk<'a>(
        &'a self,
        ops: &'a [BulkOp],
        refresh: Refresh,
    ) -> Pin<Box<dyn Future<Output = Result<BulkResponse, BackendError>> + Send + 'a>> {
        Box::pin(async move {
            let call = {
                let mut calls = self.calls();
                let records = if self.capture_records {
                    ops.iter().map(|op| op.record.clone()).collect()
                } else {
                    Vec::new()
                };
                calls.push(BulkCall { size: ops.len(), refresh, records });
                calls.len()
            };

            let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(running, Ordering::SeqCst);

            if let Some(delay) = self.flush_delay {
                tokio::time::sleep(delay).await;
            }

            let result = if self.fail_flush_at == Some(call) {
                Err(BackendError::transport(format!("connection reset on bulk call {call}")))
            } else {
                Ok(self.store(ops))
            };

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        })
    }

    fn search<'a>(
        &'a self,
        index: &'a str,
        query: &'a QueryExpr,
    ) -> Pin<Box<dyn Future<Output = Result<SearchResponse, BackendError>> + Send + 'a>> {
        Box::pin(async move {
            if self.fail_search {
                return Err(BackendError::transport("search unavailable"));
            }

            let indices = self.indices.read().unwrap_or_else(PoisonError::into_inner);
            let matched: Vec<&Record> = indices
                .get(index)
                .map(|docs| docs.iter().filter(|r| query.matches(r)).collect())
                .unwrap_or_default();

            Ok(SearchResponse {
                total: matched.len() as u64,
                hits: matched.into_iter().take(self.page_size).cloned().collect(),
            })
        })
    }
}
