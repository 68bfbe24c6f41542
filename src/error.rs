use chrono::NaiveDate;
use std::io;
use std::path::PathBuf;

/// Error type returned by the write, flush and construction paths of a
/// [`FileLogger`](crate::logger::FileLogger).
#[derive(thiserror::Error, Debug)]
pub enum LogStoreError {
    /// The caller handed in bytes that are not one JSON object.
    #[error("malformed log record: {0}")]
    Decode(#[from] serde_json::Error),

    /// An existing log file no longer holds a JSON array of records.
    #[error("corrupt log file {}: {source}", path.display())]
    CorruptFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("log file i/o failed on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A full file already carries the highest representable index.
    #[error("no log file index left for {date} in {}", dir.display())]
    IndexExhausted { dir: PathBuf, date: NaiveDate },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl LogStoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        LogStoreError::Io {
            path: path.into(),
            source,
        }
    }

    /// Malformed input or corrupt on-disk JSON.
    pub fn is_decode(&self) -> bool {
        matches!(self, LogStoreError::Decode(_) | LogStoreError::CorruptFile { .. })
    }

    pub fn is_io(&self) -> bool {
        matches!(self, LogStoreError::Io { .. })
    }
}

/// Invalid logger configuration, detected before the first write.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("log directory is not configured")]
    EmptyDir,

    #[error("max file size must be greater than zero")]
    ZeroMaxFileSize,

    #[error("max stack size must be greater than zero")]
    ZeroMaxStackSize,

    #[error("invalid source name {0:?}")]
    InvalidName(String),

    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
}
