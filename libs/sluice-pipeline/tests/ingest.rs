use std::io::{self, Cursor};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use sluice_api::{FieldValue, QueryExpr, Record, SearchBackend};
use sluice_memory::MemoryBackend;
use sluice_pipeline::{IngestConfig, IngestError, Ingestor, InputResource, NoResource};

struct Tracked(Arc<AtomicUsize>);

impl InputResource for Tracked {
    fn label(&self) -> String {
        "tracked".into()
    }

    fn release(self) -> io::Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn id_cost_csv(rows: usize) -> Cursor<Vec<u8>> {
    let mut text = String::from("id,cost\n");
    for i in 1..=rows {
        text.push_str(&format!("{i},{}.50\n", i % 97));
    }
    Cursor::new(text.into_bytes())
}

fn ingestor(backend: Arc<MemoryBackend>, batch_size: usize) -> Ingestor {
    let config = IngestConfig {
        batch_size,
        source_buffer: 64,
        ..IngestConfig::default()
    };
    Ingestor::new(backend, config).unwrap()
}

fn id_of(record: &Record) -> u64 {
    record.get("id").and_then(FieldValue::as_text).unwrap().parse().unwrap()
}

#[tokio::test]
async fn twenty_five_hundred_rows_flush_as_1000_1000_500() {
    let backend = Arc::new(MemoryBackend::new());
    let report = ingestor(backend.clone(), 1000)
        .ingest(id_cost_csv(2500), "campaigns", NoResource)
        .await
        .unwrap();

    assert_eq!(report.rows_processed, 2500);
    assert_eq!(report.flushes, 3);
    assert_eq!(report.rejected, 0);
    assert_eq!(backend.flush_sizes(), vec![1000, 1000, 500]);
}

#[tokio::test]
async fn flush_count_is_ceil_of_rows_over_batch() {
    for (rows, batch) in [(0, 7), (1, 7), (7, 7), (8, 7), (100, 7), (100, 1), (3, 1000)] {
        let backend = Arc::new(MemoryBackend::new());
        let report = ingestor(backend.clone(), batch)
            .ingest(id_cost_csv(rows), "campaigns", NoResource)
            .await
            .unwrap();

        let expected = rows.div_ceil(batch);
        assert_eq!(backend.flush_sizes().len(), expected, "rows={rows} batch={batch}");
        assert_eq!(report.flushes as usize, expected);
        assert_eq!(report.rows_processed as usize, rows);
        assert!(backend.flush_sizes().iter().all(|&n| n <= batch));
    }
}

#[tokio::test]
async fn flushed_batches_concatenate_to_input_order() {
    let backend = Arc::new(MemoryBackend::new().capture_records());
    ingestor(backend.clone(), 33)
        .ingest(id_cost_csv(500), "campaigns", NoResource)
        .await
        .unwrap();

    let ids: Vec<u64> = backend.flushed_records().iter().map(id_of).collect();
    assert_eq!(ids, (1..=500).collect::<Vec<u64>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn at_most_one_flush_in_flight() {
    let backend = Arc::new(MemoryBackend::new().with_flush_delay(Duration::from_millis(5)));
    ingestor(backend.clone(), 10)
        .ingest(id_cost_csv(200), "campaigns", NoResource)
        .await
        .unwrap();

    assert_eq!(backend.flush_sizes().len(), 20);
    assert_eq!(backend.max_in_flight(), 1);
}

#[tokio::test]
async fn partial_rejections_still_succeed() {
    let backend = Arc::new(MemoryBackend::new().reject_where(|r: &Record| id_of(r) % 10 == 0));
    let report = ingestor(backend.clone(), 25)
        .ingest(id_cost_csv(100), "campaigns", NoResource)
        .await
        .unwrap();

    assert_eq!(report.rows_processed, 100);
    assert_eq!(report.rejected, 10);
    assert_eq!(report.flushes, 4);
    assert_eq!(backend.documents("campaigns").len(), 90);
}

#[tokio::test]
async fn transport_failure_aborts_and_releases_input() {
    let backend = Arc::new(MemoryBackend::new().fail_flush_at(2));
    let releases = Arc::new(AtomicUsize::new(0));

    let err = ingestor(backend.clone(), 100)
        .ingest(id_cost_csv(1000), "campaigns", Tracked(releases.clone()))
        .await
        .unwrap_err();

    match &err {
        IngestError::BackendUnavailable { rows_accepted, source } => {
            assert_eq!(*rows_accepted, 200);
            assert!(source.message().contains("bulk write"));
        }
        other => panic!("expected BackendUnavailable, got {other:?}"),
    }
    assert_eq!(backend.flush_sizes(), vec![100, 100], "no retry, no further flushes");
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn decode_failure_at_row_1200_aborts_after_one_flush() {
    let mut text = String::from("id,cost\n");
    for i in 1..=2000 {
        if i == 1200 {
            text.push_str("1200\n");
        } else {
            text.push_str(&format!("{i},1\n"));
        }
    }

    let backend = Arc::new(MemoryBackend::new().capture_records());
    let releases = Arc::new(AtomicUsize::new(0));
    let err = ingestor(backend.clone(), 1000)
        .ingest(Cursor::new(text.into_bytes()), "campaigns", Tracked(releases.clone()))
        .await
        .unwrap_err();

    match &err {
        IngestError::MalformedInput { rows_accepted, source } => {
            assert_eq!(*rows_accepted, 1199);
            assert_eq!(source.row(), 1200);
        }
        other => panic!("expected MalformedInput, got {other:?}"),
    }
    assert_eq!(err.rows_accepted(), Some(1199));
    assert_eq!(backend.flush_sizes(), vec![1000]);
    let ids: Vec<u64> = backend.flushed_records().iter().map(id_of).collect();
    assert_eq!(ids, (1..=1000).collect::<Vec<u64>>());
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn ingested_rows_are_all_searchable() {
    let backend = Arc::new(MemoryBackend::new());
    let report = ingestor(backend.clone(), 64)
        .ingest(id_cost_csv(300), "campaigns", NoResource)
        .await
        .unwrap();

    let found = backend.search("campaigns", &QueryExpr::MatchAll).await.unwrap();
    assert_eq!(found.total, report.rows_processed);
}

#[tokio::test]
async fn concurrent_runs_are_independent() {
    let backend = Arc::new(MemoryBackend::new());
    let ingestor = Arc::new(ingestor(backend.clone(), 50));

    let a = {
        let ingestor = ingestor.clone();
        tokio::spawn(async move { ingestor.ingest(id_cost_csv(120), "a", NoResource).await })
    };
    let b = {
        let ingestor = ingestor.clone();
        tokio::spawn(async move { ingestor.ingest(id_cost_csv(80), "b", NoResource).await })
    };

    assert_eq!(a.await.unwrap().unwrap().rows_processed, 120);
    assert_eq!(b.await.unwrap().unwrap().rows_processed, 80);
    assert_eq!(backend.documents("a").len(), 120);
    assert_eq!(backend.documents("b").len(), 80);
}
