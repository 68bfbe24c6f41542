use crate::record::LogRecord;

/// Records accepted by the write path but not yet persisted.
///
/// Insertion order is preserved. The buffer itself is not synchronized;
/// [`FileLogger`](crate::logger::FileLogger) keeps it behind its lock.
#[derive(Debug)]
pub struct RecordBuffer {
    records: Vec<LogRecord>,
    threshold: usize,
}

impl RecordBuffer {
    pub fn new(threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            records: Vec::with_capacity(threshold),
            threshold,
        }
    }

    /// Append a record; returns `true` once the flush threshold is reached.
    pub fn push(&mut self, record: LogRecord) -> bool {
        self.records.push(record);
        self.is_full()
    }

    pub fn is_full(&self) -> bool {
        self.records.len() >= self.threshold
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    /// Drop everything after a successful flush. Capacity is kept.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}
