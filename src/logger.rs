use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

use crate::buffer::RecordBuffer;
use crate::clock::{Clock, SystemClock};
use crate::config::{validate, validate_source_name, LogConfiguration};
use crate::error::LogStoreError;
use crate::flush::{flush, FlushMode, FlushOutcome};
use crate::record::{is_own_target, LogRecord};
use crate::report::{scan_files, LogReport};

/// Handle to the log store of one source.
///
/// Records go into an in-memory buffer that is flushed synchronously, on
/// the writing thread, into `<dir>/<name>/<date>_<index>.log.json` once it
/// holds `max_stack_size` records. Handles are cheap to clone and all clones
/// share the buffer.
///
/// One lock per store serializes buffer appends, flushes and the part of
/// [`get_logs`](Self::get_logs) that consults the buffer. The store emits its
/// own `tracing` events only after that lock is released.
#[derive(Clone)]
pub struct FileLogger {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    dir: PathBuf,
    min_level: Level,
    max_file_size: u64,
    flush_mode: FlushMode,
    clock: Box<dyn Clock>,
    buffer: Mutex<RecordBuffer>,
}

impl FileLogger {
    /// Open the store for `name` below `config.dir()`, creating the source
    /// directory if needed.
    pub fn new(name: &str, config: &impl LogConfiguration) -> Result<Self, LogStoreError> {
        Self::with_clock(name, config, SystemClock)
    }

    /// Like [`new`](Self::new), with "today" taken from `clock`.
    pub fn with_clock(
        name: &str,
        config: &impl LogConfiguration,
        clock: impl Clock + 'static,
    ) -> Result<Self, LogStoreError> {
        validate(config)?;
        validate_source_name(name)?;

        let dir = config.dir().join(name);
        fs::create_dir_all(&dir).map_err(|e| LogStoreError::io(&dir, e))?;

        let logger = FileLogger {
            inner: Arc::new(Inner {
                name: name.to_string(),
                dir,
                min_level: config.min_level(),
                max_file_size: config.max_file_size(),
                flush_mode: config.flush_mode(),
                clock: Box::new(clock),
                buffer: Mutex::new(RecordBuffer::new(config.max_stack_size())),
            }),
        };
        tracing::debug!(
            source = %logger.inner.name,
            dir = %logger.inner.dir.display(),
            max_stack_size = config.max_stack_size(),
            max_file_size = logger.inner.max_file_size,
            "opened log store"
        );
        Ok(logger)
    }

    /// Accept one JSON-encoded record.
    ///
    /// Returns the number of bytes accepted. When the record fills the
    /// buffer, the buffer is flushed before returning and a flush failure is
    /// returned here; the record itself stays buffered in that case.
    ///
    /// Records whose `target` is this crate are accepted and discarded: they
    /// are the store's own diagnostics coming back through a `fmt` layer.
    pub fn write(&self, bytes: &[u8]) -> Result<usize, LogStoreError> {
        self.intake(bytes)
    }

    /// Buffer an already built record, flushing when the buffer fills.
    pub fn append(&self, record: LogRecord) -> Result<(), LogStoreError> {
        let result = {
            let mut buffer = self.inner.buffer.lock();
            if !buffer.push(record) {
                return Ok(());
            }
            self.flush_locked(&mut buffer)
        };
        self.trace_flush(&result);
        result.map(|_| ())
    }

    /// Flush whatever is buffered now. Returns `None` when the buffer was
    /// empty.
    pub fn flush(&self) -> Result<Option<FlushOutcome>, LogStoreError> {
        let result = {
            let mut buffer = self.inner.buffer.lock();
            if buffer.is_empty() {
                return Ok(None);
            }
            self.flush_locked(&mut buffer)
        };
        self.trace_flush(&result);
        result.map(Some)
    }

    /// Reconstruct the records of today and the `days_back` preceding days.
    ///
    /// Files that cannot be read or decoded are left out without an error.
    /// Records still in the buffer are appended to today's entry when the
    /// on-disk scan produced one.
    ///
    /// `_severity` is accepted for callers that pass a level but does not
    /// filter: records of every level are returned.
    pub fn get_logs(&self, days_back: u32, _severity: &str) -> LogReport {
        let (report, skipped) = {
            let buffer = self.inner.buffer.lock();
            let today = self.inner.clock.today();
            let (mut report, skipped) = scan_files(&self.inner.dir, &self.inner.name, today, days_back);
            report.merge_buffered(today, &self.inner.name, buffer.records());
            (report, skipped)
        };
        for file in skipped {
            tracing::warn!(
                source = %self.inner.name,
                path = %file.path.display(),
                reason = %file.reason,
                "skipping unreadable log file in report"
            );
        }
        report
    }

    /// Copy of the records waiting for the next flush.
    pub fn buffered(&self) -> Vec<LogRecord> {
        self.inner.buffer.lock().records().to_vec()
    }

    pub fn buffered_len(&self) -> usize {
        self.inner.buffer.lock().len()
    }

    /// Source name used as directory name and report key.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Directory holding this source's files.
    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    pub fn min_level(&self) -> Level {
        self.inner.min_level
    }

    fn intake(&self, bytes: &[u8]) -> Result<usize, LogStoreError> {
        let record = LogRecord::from_json(bytes)?;
        if record.target().map_or(false, is_own_target) {
            return Ok(bytes.len());
        }
        self.append(record)?;
        Ok(bytes.len())
    }

    fn flush_locked(&self, buffer: &mut RecordBuffer) -> Result<FlushOutcome, LogStoreError> {
        flush(
            buffer,
            &self.inner.dir,
            self.inner.clock.today(),
            self.inner.max_file_size,
            self.inner.flush_mode,
        )
    }

    fn trace_flush(&self, result: &Result<FlushOutcome, LogStoreError>) {
        match result {
            Ok(outcome) => {
                if let Some(full) = outcome.rotated_from {
                    tracing::info!(
                        source = %self.inner.name,
                        full = %full,
                        next = %outcome.file,
                        "rotated log file"
                    );
                }
                tracing::debug!(
                    source = %self.inner.name,
                    file = %outcome.file,
                    flushed = outcome.flushed,
                    total = outcome.total,
                    "flushed log buffer"
                );
            }
            Err(e) => tracing::warn!(
                source = %self.inner.name,
                error = %e,
                "log buffer flush failed; records stay buffered"
            ),
        }
    }
}

impl std::fmt::Debug for FileLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLogger")
            .field("name", &self.inner.name)
            .field("dir", &self.inner.dir)
            .field("max_file_size", &self.inner.max_file_size)
            .field("flush_mode", &self.inner.flush_mode)
            .finish_non_exhaustive()
    }
}

/// Each `write` call must carry exactly one JSON object, which is what the
/// JSON formatter of `tracing_subscriber::fmt` produces per event.
/// `flush` is a no-op: records reach disk when the buffer fills.
impl io::Write for FileLogger {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.intake(buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for FileLogger {
    type Writer = FileLogger;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

impl From<LogStoreError> for io::Error {
    fn from(err: LogStoreError) -> Self {
        match err {
            LogStoreError::Io { source, .. } => source,
            other if other.is_decode() => io::Error::new(io::ErrorKind::InvalidData, other),
            other => io::Error::new(io::ErrorKind::Other, other),
        }
    }
}
