/// Environment variable names read by [`LogConfig::with_env_overlay`].
///
/// These are purely helpers; the logger itself only ever sees a
/// [`LogConfiguration`](crate::config::LogConfiguration).
///
/// [`LogConfig::with_env_overlay`]: crate::config::LogConfig::with_env_overlay

/// Minimum severity, e.g. `debug`, `info`, `warn`, `error`.
pub const LOG_STORE_LEVEL_ENV: &str = "LOG_STORE_LEVEL";

/// Base directory; one subdirectory per source is created below it.
pub const LOG_STORE_DIR_ENV: &str = "LOG_STORE_DIR";

/// Size in bytes at which the current day's file is rotated.
pub const LOG_STORE_MAX_FILE_SIZE_ENV: &str = "LOG_STORE_MAX_FILE_SIZE";

/// Number of buffered records that triggers a flush.
pub const LOG_STORE_MAX_STACK_SIZE_ENV: &str = "LOG_STORE_MAX_STACK_SIZE";

/// `rewrite` or `atomic_replace`.
pub const LOG_STORE_FLUSH_MODE_ENV: &str = "LOG_STORE_FLUSH_MODE";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
