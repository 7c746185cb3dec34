use std::fmt;
use std::io;
use std::sync::Arc;

use tokio::io::AsyncRead;

use sluice_api::{BackendError, HeaderCoverage, SearchBackend};

use crate::backpressure::FlushController;
use crate::batch::BatchAccumulator;
use crate::config::IngestConfig;
use crate::error::{CleanupError, IngestError};
use crate::sink::{BulkSink, FlushOutcome};
use crate::source::RecordSource;

// ═══════════════════════════════════════════════════════════════
//  Input resource
// ═══════════════════════════════════════════════════════════════

/// Whatever backs the input stream and has to be let go of once the run
/// is over (a temporary upload file, usually).
pub trait InputResource: Send {
    /// Name used in logs.
    fn label(&self) -> String;

    fn release(self) -> io::Result<()>;
}

impl InputResource for tempfile::TempPath {
    fn label(&self) -> String {
        self.display().to_string()
    }

    fn release(self) -> io::Result<()> {
        self.close()
    }
}

/// For inputs the caller keeps ownership of.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResource;

impl InputResource for NoResource {
    fn label(&self) -> String {
        "none".into()
    }

    fn release(self) -> io::Result<()> {
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════
//  Orchestrator
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestState {
    Streaming,
    Flushing,
    DrainingFinal,
    Done,
    Aborted,
}

impl fmt::Display for IngestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IngestState::Streaming => "streaming",
            IngestState::Flushing => "flushing",
            IngestState::DrainingFinal => "draining_final",
            IngestState::Done => "done",
            IngestState::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub rows_processed: u64,
    /// Bulk requests that were acknowledged.
    pub flushes: u64,
    /// Items the backend refused across all flushes.
    pub rejected: u64,
    /// Header columns checked against the campaign schema.
    pub header: HeaderCoverage,
}

/// Where the run loop can be. Aborting leaves the loop by returning the
/// error, so there is no aborted phase to fall through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Streaming,
    Flushing,
    DrainingFinal,
    Done,
}

impl From<Phase> for IngestState {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Streaming => IngestState::Streaming,
            Phase::Flushing => IngestState::Flushing,
            Phase::DrainingFinal => IngestState::DrainingFinal,
            Phase::Done => IngestState::Done,
        }
    }
}

/// Drives one CSV stream into the backend: source → accumulator → sink,
/// with the source paused for the duration of each flush.
///
/// An `Ingestor` holds no per-run state; concurrent calls to
/// [`Ingestor::ingest`] each get their own source, batch and controller.
pub struct Ingestor {
    sink: BulkSink,
    config: IngestConfig,
}

impl Ingestor {
    pub fn new(backend: Arc<dyn SearchBackend>, config: IngestConfig) -> Result<Self, IngestError> {
        config.validate()?;
        Ok(Self {
            sink: BulkSink::new(backend, config.refresh),
            config,
        })
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Ingest `input` into `index`, then release `resource`.
    ///
    /// The resource is released exactly once on every exit path, after the
    /// decoder has stopped reading. A failed release is logged and does not
    /// change the returned outcome.
    pub async fn ingest<R, I>(
        &self,
        input: R,
        index: &str,
        resource: I,
    ) -> Result<IngestReport, IngestError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        I: InputResource,
    {
        tracing::info!(
            index = %index,
            backend = %self.sink.backend_name(),
            batch_size = self.config.batch_size,
            "ingestion started"
        );

        let mut source = RecordSource::spawn(input, self.config.source_buffer);
        let controller = FlushController::new(source.gate());

        let mut result = self.run(&mut source, &controller, index).await;
        if let Ok(report) = &mut result {
            report.header = source.header_coverage().unwrap_or_default();
        }

        source.shutdown().await;
        release(resource);

        match &result {
            Ok(report) => tracing::info!(
                index = %index,
                rows = report.rows_processed,
                flushes = report.flushes,
                rejected = report.rejected,
                "ingestion finished"
            ),
            Err(e) => tracing::error!(
                index = %index,
                rows_accepted = e.rows_accepted().unwrap_or(0),
                error = %e,
                "ingestion aborted"
            ),
        }
        result
    }

    async fn run(
        &self,
        source: &mut RecordSource,
        controller: &FlushController,
        index: &str,
    ) -> Result<IngestReport, IngestError> {
        let mut batch = BatchAccumulator::new(index, self.config.batch_size);
        let mut report = IngestReport::default();
        let mut phase = Phase::Streaming;

        loop {
            let next = match phase {
                Phase::Streaming => match source.next().await {
                    Some(Ok(record)) => {
                        report.rows_processed += 1;
                        if batch.append(record) {
                            Phase::Flushing
                        } else {
                            Phase::Streaming
                        }
                    }
                    Some(Err(e)) => {
                        transition(phase.into(), IngestState::Aborted);
                        return Err(IngestError::MalformedInput {
                            rows_accepted: report.rows_processed,
                            source: e,
                        });
                    }
                    None => Phase::DrainingFinal,
                },

                Phase::Flushing => {
                    if let Some(ready) = batch.drain() {
                        let outcome = controller.flush(&self.sink, ready, false).await;
                        if let Err(e) = settle(outcome, index, &mut report) {
                            transition(phase.into(), IngestState::Aborted);
                            return Err(IngestError::BackendUnavailable {
                                rows_accepted: report.rows_processed,
                                source: e,
                            });
                        }
                    }
                    Phase::Streaming
                }

                Phase::DrainingFinal => {
                    if let Some(residual) = batch.drain() {
                        let outcome = controller.flush(&self.sink, residual, true).await;
                        if let Err(e) = settle(outcome, index, &mut report) {
                            transition(phase.into(), IngestState::Aborted);
                            return Err(IngestError::BackendUnavailable {
                                rows_accepted: report.rows_processed,
                                source: e,
                            });
                        }
                    }
                    Phase::Done
                }

                Phase::Done => return Ok(report),
            };

            if next != phase {
                transition(phase.into(), next.into());
            }
            phase = next;
        }
    }
}

fn transition(from: IngestState, to: IngestState) {
    tracing::debug!(from = %from, to = %to, "ingest state");
}

/// Fold one flush outcome into the report. Only a failed flush is an error.
fn settle(outcome: FlushOutcome, index: &str, report: &mut IngestReport) -> Result<(), BackendError> {
    match outcome {
        FlushOutcome::Accepted { items } => {
            report.flushes += 1;
            tracing::info!(index = %index, flush = report.flushes, items, "batch flushed");
            Ok(())
        }
        FlushOutcome::Partial { items, rejected } => {
            report.flushes += 1;
            report.rejected += rejected.len() as u64;
            for item in &rejected {
                tracing::error!(
                    index = %item.directive.index,
                    position = item.position,
                    status = item.status,
                    kind = %item.error.kind,
                    reason = %item.error.reason,
                    "bulk item rejected"
                );
            }
            tracing::info!(
                index = %index,
                flush = report.flushes,
                items,
                rejected = rejected.len(),
                "batch flushed with rejections"
            );
            Ok(())
        }
        FlushOutcome::Failed(e) => Err(e),
    }
}

fn release<I: InputResource>(resource: I) {
    let label = resource.label();
    match resource.release() {
        Ok(()) => tracing::debug!(resource = %label, "input resource released"),
        Err(source) => {
            let e = CleanupError { resource: label, source };
            tracing::warn!(error = %e, "input resource cleanup failed");
        }
    }
}
