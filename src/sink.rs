use crate::error::LogStoreError;
use crate::logger::FileLogger;
use crate::record::LogRecord;
use async_trait::async_trait;
use std::error::Error;

/// Asynchronous destination for [`LogRecord`]s drained by a
/// [`QueuedSink`](crate::queue::QueuedSink).
///
/// The queue worker calls `send` from a background task and never on the
/// thread that produced the record.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Hand a single record to the destination.
    ///
    /// **Returns**
    /// - `Ok(())` if the record was accepted.
    /// - `Err(..)` if it was not; the queue worker retries with backoff, so
    ///   an implementation must only fail when resending is safe.
    /// - a [`NotPersisted`] error if the record was kept but could not be
    ///   written yet; the worker counts it as failed and does not resend it.
    async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Persist anything the destination still holds in memory.
    ///
    /// Called once when the queue shuts down. Default implementation is a
    /// no-op.
    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}

/// The sink kept the record but failed to persist it. Resending would store
/// it twice.
#[derive(thiserror::Error, Debug)]
#[error("record kept but not persisted: {0}")]
pub struct NotPersisted(#[source] pub LogStoreError);

/// Buffers through the regular write path on the blocking pool.
#[async_trait]
impl LogSink for FileLogger {
    async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        let logger = self.clone();
        let record = record.clone();
        // A failed flush leaves the record buffered for the next one.
        tokio::task::spawn_blocking(move || logger.append(record))
            .await?
            .map_err(|e| NotPersisted(e).into())
    }

    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let logger = self.clone();
        tokio::task::spawn_blocking(move || FileLogger::flush(&logger)).await??;
        Ok(())
    }
}
