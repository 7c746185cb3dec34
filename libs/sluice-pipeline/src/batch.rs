use sluice_api::{BulkOp, IndexDirective, Record};

/// A drained, ready-to-send group of bulk operations.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    ops: Vec<BulkOp>,
}

impl Batch {
    pub fn ops(&self) -> &[BulkOp] {
        &self.ops
    }

    /// Logical records in the batch.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Bulk-protocol entries on the wire (directive + payload per record).
    pub fn physical_len(&self) -> usize {
        self.ops.len() * BulkOp::ENTRIES
    }

    pub fn into_records(self) -> impl Iterator<Item = Record> {
        self.ops.into_iter().map(|op| op.record)
    }
}

/// Append-only buffer that fills up to `threshold` records.
pub struct BatchAccumulator {
    index: String,
    threshold: usize,
    ops: Vec<BulkOp>,
}

impl BatchAccumulator {
    pub fn new(index: impl Into<String>, threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            index: index.into(),
            threshold,
            ops: Vec::with_capacity(threshold),
        }
    }

    /// Add a record. Returns `true` once the batch has reached the
    /// threshold and should be drained.
    pub fn append(&mut self, record: Record) -> bool {
        self.ops.push(BulkOp {
            directive: IndexDirective::new(self.index.clone()),
            record,
        });
        self.is_ready()
    }

    pub fn is_ready(&self) -> bool {
        self.ops.len() >= self.threshold
    }

    /// Take the current contents and start an empty batch. `None` when
    /// there is nothing to send.
    pub fn drain(&mut self) -> Option<Batch> {
        if self.ops.is_empty() {
            return None;
        }
        let ops = std::mem::replace(&mut self.ops, Vec::with_capacity(self.threshold));
        Some(Batch { ops })
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn physical_len(&self) -> usize {
        self.ops.len() * BulkOp::ENTRIES
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }
}
