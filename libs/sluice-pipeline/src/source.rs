use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use csv_async::{AsyncReaderBuilder, StringRecord};
use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use sluice_api::{FieldValue, HeaderCoverage, Record};

use crate::error::DecodeError;

type Decoded = Result<Record, DecodeError>;

// ═══════════════════════════════════════════════════════════════
//  Source gate: pause / resume
// ═══════════════════════════════════════════════════════════════

/// Pause switch shared by the decoder task and the flush controller.
///
/// While paused the decoder does not start decoding another row. A row
/// already decoded is still delivered, so nothing is lost or repeated.
pub struct SourceGate {
    paused: watch::Sender<bool>,
}

impl SourceGate {
    fn new() -> Self {
        let (paused, _) = watch::channel(false);
        Self { paused }
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.paused.subscribe()
    }

    pub fn pause(&self) {
        self.paused.send_replace(true);
    }

    pub fn resume(&self) {
        self.paused.send_replace(false);
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Quote tracking
// ═══════════════════════════════════════════════════════════════

/// Passes bytes through and keeps the parity of `"` seen so far.
///
/// Escaped quotes come in pairs, so an odd count once the input is
/// exhausted means a quoted field was never closed. The decoder itself
/// closes such a field silently at EOF.
struct QuoteTracker<R> {
    inner: R,
    open: Arc<AtomicBool>,
}

impl<R: AsyncRead + Unpin> AsyncRead for QuoteTracker<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let polled = Pin::new(&mut self.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = polled {
            let quotes = buf.filled()[before..].iter().filter(|&&b| b == b'"').count();
            if quotes % 2 == 1 {
                self.open.fetch_xor(true, Ordering::Relaxed);
            }
        }
        polled
    }
}

// ═══════════════════════════════════════════════════════════════
//  Record source: bytes → CSV decoder → records
// ═══════════════════════════════════════════════════════════════

/// Lazy, single-pass sequence of records decoded from delimited text with
/// a header row.
///
/// Decoding runs on its own task and hands records over a bounded channel;
/// the first decode failure is delivered as the last item. Each record is
/// held back until the next one (or the end of input) has been decoded, so
/// a row swallowed by an unterminated quote is reported instead of
/// delivered.
pub struct RecordSource {
    rx: mpsc::Receiver<Decoded>,
    gate: Arc<SourceGate>,
    coverage: watch::Receiver<Option<HeaderCoverage>>,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl RecordSource {
    /// Start decoding `reader`. `buffer` bounds the number of decoded
    /// records waiting to be consumed.
    pub fn spawn<R>(reader: R, buffer: usize) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let gate = Arc::new(SourceGate::new());
        let (coverage_tx, coverage) = watch::channel(None);
        let token = CancellationToken::new();

        let task = tokio::spawn(produce(reader, tx, coverage_tx, gate.subscribe(), token.clone()));

        Self { rx, gate, coverage, token, task }
    }

    pub fn gate(&self) -> Arc<SourceGate> {
        self.gate.clone()
    }

    /// How the decoded header matches the campaign schema. `None` until the
    /// header has been read, or if it could not be.
    pub fn header_coverage(&self) -> Option<HeaderCoverage> {
        self.coverage.borrow().clone()
    }

    /// Next record in file order. `None` once the input is exhausted or
    /// after a decode error has been returned.
    pub async fn next(&mut self) -> Option<Decoded> {
        self.rx.recv().await
    }

    /// Stop the decoder and wait for it to let go of the reader.
    pub async fn shutdown(self) {
        let RecordSource { rx, token, task, .. } = self;
        token.cancel();
        drop(rx);
        if let Err(e) = task.await {
            tracing::error!(error = %e, "record source task failed");
        }
    }
}

async fn produce<R>(
    reader: R,
    tx: mpsc::Sender<Decoded>,
    coverage: watch::Sender<Option<HeaderCoverage>>,
    mut paused: watch::Receiver<bool>,
    token: CancellationToken,
) where
    R: AsyncRead + Unpin + Send + 'static,
{
    let quote_open = Arc::new(AtomicBool::new(false));
    let reader = QuoteTracker { inner: reader, open: quote_open.clone() };
    let mut rdr = AsyncReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .create_reader(reader);

    let header: Vec<String> = match rdr.headers().await {
        Ok(h) => h.iter().map(str::to_string).collect(),
        Err(e) => {
            let _ = tx.send(Err(DecodeError::Csv { row: 0, source: e })).await;
            return;
        }
    };
    tracing::debug!(columns = header.len(), "decoded header");
    coverage.send_replace(Some(check_header(&header)));

    let mut row = StringRecord::new();
    let mut rows: u64 = 0;
    let mut held: Option<Record> = None;

    loop {
        let open = tokio::select! {
            res = paused.wait_for(|paused| !*paused) => res.is_ok(),
            _ = token.cancelled() => false,
        };
        if !open {
            break;
        }

        let step = tokio::select! {
            res = rdr.read_record(&mut row) => res,
            _ = token.cancelled() => break,
        };

        let (item, last): (Option<Decoded>, bool) = match step {
            Ok(true) => {
                rows += 1;
                let record: Record = header
                    .iter()
                    .zip(row.iter())
                    .map(|(name, value)| (name.clone(), FieldValue::from(value)))
                    .collect();
                (held.replace(record).map(Ok), false)
            }
            Ok(false) if quote_open.load(Ordering::Relaxed) => {
                // The held record ran to EOF inside the open quote.
                held = None;
                (Some(Err(DecodeError::UnterminatedQuote { row: rows })), true)
            }
            Ok(false) => (held.take().map(Ok), true),
            Err(e) => {
                if let Some(record) = held.take() {
                    if !deliver(&tx, &token, Ok(record)).await {
                        break;
                    }
                }
                (Some(Err(DecodeError::Csv { row: rows + 1, source: e })), true)
            }
        };

        if let Some(item) = item {
            if !deliver(&tx, &token, item).await {
                break;
            }
        }
        if last {
            break;
        }
    }

    tracing::debug!(rows, "record source finished");
}

async fn deliver(tx: &mpsc::Sender<Decoded>, token: &CancellationToken, item: Decoded) -> bool {
    tokio::select! {
        res = tx.send(item) => res.is_ok(),
        _ = token.cancelled() => false,
    }
}

fn check_header(header: &[String]) -> HeaderCoverage {
    let coverage = HeaderCoverage::of(header);
    if !coverage.unknown.is_empty() {
        tracing::warn!(
            columns = ?coverage.unknown,
            "header columns outside the campaign schema; they cannot be filtered on"
        );
    }
    if !coverage.missing.is_empty() {
        let missing: Vec<&str> = coverage.missing.iter().map(|f| f.as_str()).collect();
        tracing::warn!(fields = ?missing, "campaign fields missing from header");
    }
    coverage
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::time::Duration;

    use super::*;

    fn csv(rows: usize) -> Cursor<Vec<u8>> {
        let mut text = String::from("id,cost\n");
        for i in 1..=rows {
            text.push_str(&format!("{i},{}\n", i * 10));
        }
        Cursor::new(text.into_bytes())
    }

    async fn collect(source: &mut RecordSource) -> Vec<Record> {
        let mut out = Vec::new();
        while let Some(item) = source.next().await {
            out.push(item.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn decodes_rows_in_file_order() {
        let mut source = RecordSource::spawn(csv(5), 2);
        let records = collect(&mut source).await;
        assert_eq!(records.len(), 5);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.keys().collect::<Vec<_>>(), ["id", "cost"]);
            assert_eq!(record.get("id"), Some(&FieldValue::from((i + 1).to_string())));
        }
        source.shutdown().await;
    }

    #[tokio::test]
    async fn values_are_raw_strings() {
        let input = "name,clicks,note\n\"Smith, J\",0042,\"two\nlines\"\n";
        let mut source = RecordSource::spawn(Cursor::new(input.as_bytes().to_vec()), 4);
        let records = collect(&mut source).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("name"), Some(&FieldValue::from("Smith, J")));
        assert_eq!(records[0].get("clicks"), Some(&FieldValue::from("0042")));
        assert_eq!(records[0].get("note"), Some(&FieldValue::from("two\nlines")));
    }

    #[tokio::test]
    async fn empty_and_header_only_inputs_yield_nothing() {
        let mut empty = RecordSource::spawn(Cursor::new(Vec::new()), 4);
        assert!(empty.next().await.is_none());

        let mut header_only = RecordSource::spawn(Cursor::new(b"id,cost\n".to_vec()), 4);
        assert!(header_only.next().await.is_none());
    }

    #[tokio::test]
    async fn ragged_row_is_a_decode_error() {
        let input = "id,cost\n1,10\n2\n3,30\n";
        let mut source = RecordSource::spawn(Cursor::new(input.as_bytes().to_vec()), 4);

        assert!(source.next().await.unwrap().is_ok());
        let err = source.next().await.unwrap().unwrap_err();
        assert_eq!(err.row(), 2);
        assert!(source.next().await.is_none(), "nothing is produced after a decode error");
    }

    #[tokio::test]
    async fn invalid_utf8_is_a_decode_error() {
        let mut input = b"id,cost\n1,".to_vec();
        input.extend_from_slice(&[0xff, 0xfe]);
        input.push(b'\n');
        let mut source = RecordSource::spawn(Cursor::new(input), 4);
        let err = source.next().await.unwrap().unwrap_err();
        assert_eq!(err.row(), 1);
    }

    #[tokio::test]
    async fn unterminated_quote_is_a_decode_error() {
        let input = "id,cost\n1,10\n2,\"20\n3,30\n";
        let mut source = RecordSource::spawn(Cursor::new(input.as_bytes().to_vec()), 4);

        let first = source.next().await.unwrap().unwrap();
        assert_eq!(first.get("id"), Some(&FieldValue::from("1")));
        let err = source.next().await.unwrap().unwrap_err();
        assert!(matches!(err, DecodeError::UnterminatedQuote { row: 2 }));
        assert!(source.next().await.is_none(), "the swallowed rows are never delivered");
    }

    #[tokio::test]
    async fn quote_left_open_on_the_first_row_is_caught() {
        let input = "id,cost\n1,\"10\n2,20\n3,30\n";
        let mut source = RecordSource::spawn(Cursor::new(input.as_bytes().to_vec()), 4);
        let err = source.next().await.unwrap().unwrap_err();
        assert_eq!(err.row(), 1);
        assert!(source.next().await.is_none());
    }

    #[tokio::test]
    async fn escaped_quotes_are_not_an_open_quote() {
        let input = "id,note\n1,\"say \"\"hi\"\"\"\n2,plain\n";
        let mut source = RecordSource::spawn(Cursor::new(input.as_bytes().to_vec()), 4);
        let records = collect(&mut source).await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("note"), Some(&FieldValue::from("say \"hi\"")));
    }

    #[tokio::test]
    async fn header_is_checked_against_the_campaign_schema() {
        let input = "Campaign_ID,location,Clicks\n1,US,5\n";
        let mut source = RecordSource::spawn(Cursor::new(input.as_bytes().to_vec()), 4);
        let records = collect(&mut source).await;
        assert_eq!(records.len(), 1);

        let coverage = source.header_coverage().unwrap();
        assert_eq!(coverage.unknown, vec!["location".to_string()]);
        assert!(coverage.missing.contains(&sluice_api::CampaignField::Location));
        assert!(!coverage.missing.contains(&sluice_api::CampaignField::Clicks));
    }

    #[tokio::test]
    async fn paused_source_produces_nothing_until_resumed() {
        let mut source = RecordSource::spawn(csv(20), 4);
        let gate = source.gate();
        gate.pause();
        assert!(gate.is_paused());

        let waited = tokio::time::timeout(Duration::from_millis(50), source.next()).await;
        assert!(waited.is_err(), "no record while paused");

        gate.resume();
        let records = collect(&mut source).await;
        let ids: Vec<String> = records
            .iter()
            .map(|r| r.get("id").and_then(FieldValue::as_text).unwrap().into_owned())
            .collect();
        let expected: Vec<String> = (1..=20).map(|i| i.to_string()).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn pause_mid_stream_loses_and_repeats_nothing() {
        let mut source = RecordSource::spawn(csv(50), 2);
        let gate = source.gate();

        let mut seen = Vec::new();
        for _ in 0..10 {
            seen.push(source.next().await.unwrap().unwrap());
        }
        gate.pause();

        // Rows decoded before the pause are still delivered, then it stops.
        while let Ok(Some(item)) =
            tokio::time::timeout(Duration::from_millis(30), source.next()).await
        {
            seen.push(item.unwrap());
        }
        assert!(seen.len() < 50);

        gate.resume();
        seen.extend(collect(&mut source).await);

        let ids: Vec<u64> = seen
            .iter()
            .map(|r| r.get("id").and_then(FieldValue::as_text).unwrap().parse().unwrap())
            .collect();
        assert_eq!(ids, (1..=50).collect::<Vec<u64>>());
    }

    #[tokio::test]
    async fn shutdown_while_paused_returns() {
        let source = RecordSource::spawn(csv(10), 1);
        source.gate().pause();
        source.shutdown().await;
    }
}
