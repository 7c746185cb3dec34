//! Streaming CSV → bulk-index ingestion.
//!
//! A [`RecordSource`] decodes rows on its own task, the [`Ingestor`]
//! groups them with a [`BatchAccumulator`] and hands each full batch to the
//! [`BulkSink`] through a [`FlushController`] that pauses decoding while
//! the flush is in flight.

pub mod backpressure;
pub mod batch;
pub mod config;
pub mod error;
pub mod ingest;
pub mod sink;
pub mod source;

pub use backpressure::FlushController;
pub use batch::{Batch, BatchAccumulator};
pub use config::IngestConfig;
pub use error::{CleanupError, DecodeError, IngestError};
pub use ingest::{IngestReport, IngestState, Ingestor, InputResource, NoResource};
pub use sink::{BulkSink, FlushOutcome, RejectedItem};
pub use source::{RecordSource, SourceGate};
