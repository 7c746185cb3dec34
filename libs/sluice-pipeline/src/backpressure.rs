use std::sync::Arc;

use tokio::sync::Semaphore;

use sluice_api::BackendError;

use crate::batch::Batch;
use crate::sink::{BulkSink, FlushOutcome};
use crate::source::SourceGate;

/// Couples the record source with the bulk sink.
///
/// The source is paused before a flush is issued and resumed once the
/// flush has settled, so at most one batch is ever in flight and at most
/// one batch worth of records is buffered.
pub struct FlushController {
    gate: Arc<SourceGate>,
    in_flight: Semaphore,
}

impl FlushController {
    pub fn new(gate: Arc<SourceGate>) -> Self {
        Self { gate, in_flight: Semaphore::new(1) }
    }

    /// Flush `batch` with the source paused.
    ///
    /// The source is resumed afterwards unless `terminating` is set or the
    /// flush failed (a failed flush always ends the run).
    pub async fn flush(&self, sink: &BulkSink, batch: Batch, terminating: bool) -> FlushOutcome {
        self.gate.pause();

        let outcome = match self.in_flight.acquire().await {
            Ok(_permit) => sink.flush(batch).await,
            Err(_) => FlushOutcome::Failed(BackendError::new("flush controller closed")),
        };

        if !terminating && !outcome.is_failed() {
            self.gate.resume();
        }
        outcome
    }

    pub fn is_source_paused(&self) -> bool {
        self.gate.is_paused()
    }

    /// Flushes currently running: 0 or 1.
    pub fn in_flight(&self) -> usize {
        1 - self.in_flight.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::io::Cursor;
    use std::pin::Pin;
    use std::sync::Mutex;

    use sluice_api::{
        BulkOp, BulkResponse, QueryExpr, Record, Refresh, SearchBackend, SearchResponse,
    };
    use sluice_memory::MemoryBackend;

    use super::*;
    use crate::batch::BatchAccumulator;
    use crate::source::RecordSource;

    /// Records whether the source was paused while each bulk call ran.
    struct GateWatcher {
        gate: Arc<SourceGate>,
        seen: Mutex<Vec<bool>>,
    }

    impl SearchBackend for GateWatcher {
        fn name(&self) -> &str {
            "gate-watcher"
        }

        fn bulk<'a>(
            &'a self,
            _ops: &'a [BulkOp],
            _refresh: Refresh,
        ) -> Pin<Box<dyn Future<Output = Result<BulkResponse, BackendError>> + Send + 'a>> {
            Box::pin(async move {
                self.seen.lock().unwrap().push(self.gate.is_paused());
                Ok(BulkResponse::default())
            })
        }

        fn search<'a>(
            &'a self,
            _index: &'a str,
            _query: &'a QueryExpr,
        ) -> Pin<Box<dyn Future<Output = Result<SearchResponse, BackendError>> + Send + 'a>> {
            Box::pin(async { Ok(SearchResponse::default()) })
        }
    }

    fn one_record_batch() -> Batch {
        let mut acc = BatchAccumulator::new("campaigns", 1);
        let record: Record = [("id", "1")].into_iter().collect();
        acc.append(record);
        acc.drain().unwrap()
    }

    fn source() -> RecordSource {
        RecordSource::spawn(Cursor::new(b"id\n1\n".to_vec()), 1)
    }

    #[tokio::test]
    async fn source_is_paused_during_flush_and_resumed_after() {
        let source = source();
        let watcher = Arc::new(GateWatcher { gate: source.gate(), seen: Mutex::new(Vec::new()) });
        let sink = BulkSink::new(watcher.clone(), Refresh::Immediate);
        let controller = FlushController::new(source.gate());

        let outcome = controller.flush(&sink, one_record_batch(), false).await;
        assert_eq!(outcome, FlushOutcome::Accepted { items: 1 });
        assert_eq!(*watcher.seen.lock().unwrap(), vec![true]);
        assert!(!controller.is_source_paused());
        assert_eq!(controller.in_flight(), 0);
        source.shutdown().await;
    }

    #[tokio::test]
    async fn terminating_flush_skips_resume() {
        let source = source();
        let sink = BulkSink::new(Arc::new(MemoryBackend::new()), Refresh::Immediate);
        let controller = FlushController::new(source.gate());

        controller.flush(&sink, one_record_batch(), true).await;
        assert!(controller.is_source_paused());
        source.shutdown().await;
    }

    #[tokio::test]
    async fn failed_flush_leaves_source_paused() {
        let source = source();
        let sink = BulkSink::new(Arc::new(MemoryBackend::new().fail_flush_at(1)), Refresh::Immediate);
        let controller = FlushController::new(source.gate());

        let outcome = controller.flush(&sink, one_record_batch(), false).await;
        assert!(outcome.is_failed());
        assert!(controller.is_source_paused());
        assert_eq!(controller.in_flight(), 0);
        source.shutdown().await;
    }
}
