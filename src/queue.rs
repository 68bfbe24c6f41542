use crate::record::LogRecord;
use crate::sink::{LogSink, NotPersisted};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

/// Tuning for a [`QueuedSink`].
#[derive(Clone, Debug)]
pub struct QueueConfig {
    /// Records that may wait in the channel before new ones are dropped.
    pub channel_buffer: usize,
    /// Attempts per record after the first failed `send`.
    pub max_retries: u32,
    /// Delay before the first retry; doubled per attempt up to ten seconds.
    pub retry_backoff: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            channel_buffer: 1024,
            max_retries: 3,
            retry_backoff: Duration::from_millis(100),
        }
    }
}

/// Non-blocking front of a [`LogSink`]: records go into a bounded channel
/// and a background task hands them to the sink one by one, in order.
///
/// Unlike [`FileLogger::write`](crate::logger::FileLogger::write), submitting
/// never performs disk I/O on the caller's thread and never reports flush
/// failures to the caller; a full channel drops the record instead of
/// blocking.
#[derive(Clone)]
pub struct QueuedSink {
    sender: mpsc::Sender<LogRecord>,
    /// Accepted into the channel.
    pub enqueued_records: Arc<AtomicU64>,
    /// Dropped because the channel was full or closed.
    pub dropped_records: Arc<AtomicU64>,
    /// Given up on after exhausting retries, or kept by the sink without
    /// being persisted.
    pub failed_records: Arc<AtomicU64>,
}

impl QueuedSink {
    /// Spawn the worker task. Must be called from within a Tokio runtime.
    ///
    /// The task ends, after flushing the sink, once every clone of the
    /// returned handle has been dropped.
    pub fn spawn(sink: Arc<dyn LogSink>, config: QueueConfig) -> (Self, JoinHandle<()>) {
        // Enforce minimal thresholds to avoid degenerate configs.
        let buffer = config.channel_buffer.max(1);
        let backoff = config.retry_backoff.max(Duration::from_millis(1));
        let max_retries = config.max_retries;

        let (tx, mut rx) = mpsc::channel::<LogRecord>(buffer);

        let enqueued_records = Arc::new(AtomicU64::new(0));
        let dropped_records = Arc::new(AtomicU64::new(0));
        let failed_records = Arc::new(AtomicU64::new(0));
        let failed_bg = Arc::clone(&failed_records);

        let handle = tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                if let Err(e) = send_with_retry(&*sink, &record, max_retries, backoff).await {
                    failed_bg.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(error = %e, "log record not persisted");
                }
            }
            if let Err(e) = sink.flush().await {
                tracing::error!(error = %e, "final log sink flush failed");
            }
        });

        (
            Self {
                sender: tx,
                enqueued_records,
                dropped_records,
                failed_records,
            },
            handle,
        )
    }

    /// Queue a record without waiting; returns `false` if it was dropped.
    pub fn try_submit(&self, record: LogRecord) -> bool {
        match self.sender.try_send(record) {
            Ok(()) => {
                self.enqueued_records.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(_) => {
                self.dropped_records.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Queue a record, waiting for channel capacity. Returns `false` only if
    /// the worker has stopped.
    pub async fn submit(&self, record: LogRecord) -> bool {
        match self.sender.send(record).await {
            Ok(()) => {
                self.enqueued_records.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(_) => {
                self.dropped_records.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }
}

async fn send_with_retry(
    sink: &dyn LogSink,
    record: &LogRecord,
    max_retries: u32,
    mut backoff: Duration,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let max_backoff = Duration::from_secs(10);
    let mut attempt = 0;
    loop {
        match sink.send(record).await {
            Ok(()) => return Ok(()),
            Err(e) if attempt >= max_retries || e.is::<NotPersisted>() => return Err(e),
            Err(e) => {
                tracing::warn!(error = %e, ?backoff, "log sink send failed, retrying");
                sleep(backoff).await;
                backoff = std::cmp::min(backoff * 2, max_backoff);
                attempt += 1;
            }
        }
    }
}
