use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use tracing::Level;

use crate::env::{
    env_or, LOG_STORE_DIR_ENV, LOG_STORE_FLUSH_MODE_ENV, LOG_STORE_LEVEL_ENV,
    LOG_STORE_MAX_FILE_SIZE_ENV, LOG_STORE_MAX_STACK_SIZE_ENV,
};
use crate::error::ConfigError;
use crate::flush::FlushMode;

/// Buffered records that trigger a flush when no other value is configured.
pub const DEFAULT_MAX_STACK_SIZE: usize = 5;

/// Rotation threshold in bytes when no other value is configured.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 5_096_000;

/// What a [`FileLogger`](crate::logger::FileLogger) needs to know about its
/// environment.
///
/// Applications usually hand in a [`LogConfig`], but anything that can
/// answer these questions works (a section of a larger settings struct, a
/// test fixture, ...).
pub trait LogConfiguration {
    /// Least severe level that the tracing integration records.
    fn min_level(&self) -> Level;

    /// Base directory; each source gets its own subdirectory below it.
    fn dir(&self) -> &Path;

    /// A day's current file is rotated once it reaches this many bytes.
    fn max_file_size(&self) -> u64;

    /// Buffered records that trigger a synchronous flush.
    fn max_stack_size(&self) -> usize {
        DEFAULT_MAX_STACK_SIZE
    }

    fn flush_mode(&self) -> FlushMode {
        FlushMode::default()
    }
}

/// Plain configuration for the log store.
///
/// Deserializes from the `logging` section of a service config using either
/// the snake_case field names or the older `filePath` / `maxSize` keys.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    #[serde(alias = "filePath", alias = "file_path")]
    pub dir: PathBuf,
    #[serde(alias = "maxSize", alias = "max_size")]
    pub max_file_size: u64,
    #[serde(alias = "maxStackSize")]
    pub max_stack_size: usize,
    #[serde(alias = "flushMode")]
    pub flush_mode: FlushMode,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: PathBuf::from("logs"),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_stack_size: DEFAULT_MAX_STACK_SIZE,
            flush_mode: FlushMode::Rewrite,
        }
    }
}

impl LogConfig {
    /// Defaults overlaid with the `LOG_STORE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        LogConfig::default().with_env_overlay()
    }

    /// Replace every field whose environment variable is set.
    pub fn with_env_overlay(mut self) -> Result<Self, ConfigError> {
        self.level = env_or(LOG_STORE_LEVEL_ENV, &self.level);
        self.dir = PathBuf::from(env_or(LOG_STORE_DIR_ENV, &self.dir.to_string_lossy()));
        self.max_file_size = parse_env(LOG_STORE_MAX_FILE_SIZE_ENV, self.max_file_size)?;
        self.max_stack_size = parse_env(LOG_STORE_MAX_STACK_SIZE_ENV, self.max_stack_size)?;
        self.flush_mode = parse_env(LOG_STORE_FLUSH_MODE_ENV, self.flush_mode)?;
        Ok(self)
    }

    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn with_max_stack_size(mut self, records: usize) -> Self {
        self.max_stack_size = records;
        self
    }

    pub fn with_flush_mode(mut self, mode: FlushMode) -> Self {
        self.flush_mode = mode;
        self
    }
}

impl LogConfiguration for LogConfig {
    fn min_level(&self) -> Level {
        parse_level(&self.level)
    }

    fn dir(&self) -> &Path {
        &self.dir
    }

    fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    fn max_stack_size(&self) -> usize {
        self.max_stack_size
    }

    fn flush_mode(&self) -> FlushMode {
        self.flush_mode
    }
}

/// Map a configured level name onto a tracing [`Level`].
///
/// Unknown names fall back to `INFO`.
pub fn parse_level(name: &str) -> Level {
    match name.trim().to_ascii_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        other => {
            tracing::warn!(level = other, "log level not recognized; using INFO");
            Level::INFO
        }
    }
}

/// Check the numeric and path settings of a configuration.
pub fn validate(config: &impl LogConfiguration) -> Result<(), ConfigError> {
    if config.dir().as_os_str().is_empty() {
        return Err(ConfigError::EmptyDir);
    }
    if config.max_file_size() == 0 {
        return Err(ConfigError::ZeroMaxFileSize);
    }
    if config.max_stack_size() == 0 {
        return Err(ConfigError::ZeroMaxStackSize);
    }
    Ok(())
}

/// A source name becomes a directory name, so it must be a single normal
/// path component.
pub fn validate_source_name(name: &str) -> Result<(), ConfigError> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) if part == name => Ok(()),
        _ => Err(ConfigError::InvalidName(name.to_string())),
    }
}

fn parse_env<T: FromStr>(key: &str, current: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw,
        }),
        Err(_) => Ok(current),
    }
}
