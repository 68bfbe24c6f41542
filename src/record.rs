use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key holding the RFC 3339 creation time of a record.
pub const TIMESTAMP_KEY: &str = "timestamp";
/// Key holding the severity name of a record.
pub const LEVEL_KEY: &str = "level";
/// Key holding the human readable message of a record.
pub const MESSAGE_KEY: &str = "message";
/// Key holding the `tracing` target the record was emitted under.
pub const TARGET_KEY: &str = "target";

/// Target prefix of the events this crate emits about itself.
pub(crate) const SELF_TARGET: &str = env!("CARGO_CRATE_NAME");

/// Whether `target` is this crate or one of its modules. Such events are
/// never stored, so a flush cannot feed back into the store it is flushing.
pub(crate) fn is_own_target(target: &str) -> bool {
    target
        .strip_prefix(SELF_TARGET)
        .map_or(false, |rest| rest.is_empty() || rest.starts_with("::"))
}

/// One structured log entry: an ordered bag of string keys to JSON values.
///
/// A record is built once (through [`LogRecord::new`] plus
/// [`with_field`](LogRecord::with_field), or from an already decoded JSON
/// object) and only read afterwards. On disk and on the wire it is a plain
/// JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogRecord(Map<String, Value>);

impl LogRecord {
    /// Create a record stamped with the current UTC time.
    pub fn new(level: impl Into<String>, message: impl Into<String>) -> Self {
        let mut map = Map::new();
        map.insert(
            TIMESTAMP_KEY.to_string(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)),
        );
        map.insert(LEVEL_KEY.to_string(), Value::String(level.into()));
        map.insert(MESSAGE_KEY.to_string(), Value::String(message.into()));
        LogRecord(map)
    }

    /// Attach (or replace) a field, consuming and returning `self`.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Decode a single record from one JSON object.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn level(&self) -> Option<&str> {
        self.get(LEVEL_KEY).and_then(Value::as_str)
    }

    pub fn message(&self) -> Option<&str> {
        self.get(MESSAGE_KEY).and_then(Value::as_str)
    }

    pub fn target(&self) -> Option<&str> {
        self.get(TARGET_KEY).and_then(Value::as_str)
    }

    /// Parsed `timestamp` field, if present and valid RFC 3339.
    pub fn timestamp(&self) -> Option<DateTime<FixedOffset>> {
        self.get(TIMESTAMP_KEY)
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for LogRecord {
    fn from(map: Map<String, Value>) -> Self {
        LogRecord(map)
    }
}

/// Decode the content of a log file: a JSON array of records.
///
/// Zero-length (or whitespace-only) content is a file nothing has been
/// flushed into yet and decodes to an empty sequence.
pub fn decode_records(bytes: &[u8]) -> Result<Vec<LogRecord>, serde_json::Error> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    serde_json::from_slice(bytes)
}

/// Encode records as the JSON array stored in a log file.
pub fn encode_records(records: &[LogRecord]) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(records)
}
