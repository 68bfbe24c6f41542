//! Structured log store: records are buffered in memory, flushed into
//! size-rotated JSON array files per source and day, and reassembled into
//! day-window reports that include still-buffered records.
//!
//! ```rust,no_run
//! use tracing_log_store::{FileLogger, LogConfig, LogRecord};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LogConfig::default().with_dir("/var/log/plant");
//! let logger = FileLogger::new("press-3", &config)?;
//!
//! logger.write(br#"{"level":"INFO","message":"cycle done","count":12}"#)?;
//! logger.append(LogRecord::new("WARN", "die temperature high").with_field("celsius", 281))?;
//!
//! let report = logger.get_logs(7, "");
//! println!("{} records this week", report.record_count());
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod clock;
pub mod config;
pub mod env;
pub mod error;
pub mod flush;
pub mod init;
pub mod layer;
pub mod logger;
pub mod queue;
pub mod record;
pub mod report;
pub mod rotation;
pub mod sink;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{LogConfig, LogConfiguration};
pub use error::{ConfigError, LogStoreError};
pub use flush::{FlushMode, FlushOutcome};
pub use layer::RecordLayer;
pub use logger::FileLogger;
pub use record::LogRecord;
pub use report::LogReport;
