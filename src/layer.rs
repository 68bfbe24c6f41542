use crate::logger::FileLogger;
use crate::queue::QueuedSink;
use crate::record::{is_own_target, LogRecord, LEVEL_KEY, MESSAGE_KEY, TARGET_KEY, TIMESTAMP_KEY};
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::sync::{atomic::{AtomicU64, Ordering}, Arc};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Where the layer sends the records it builds.
enum Dispatch {
    /// Synchronous write path; may flush on the emitting thread.
    Direct(FileLogger),
    /// Background worker; never blocks the emitting thread.
    Queued(QueuedSink),
}

/// `tracing_subscriber` layer that turns events into [`LogRecord`]s and
/// stores them.
///
/// Events more verbose than the configured minimum level are ignored.
/// Each record carries `timestamp`, `level`, `message`, `target`, a `fields`
/// object with the event's other fields, plus any static attributes added
/// with [`with_attr`](Self::with_attr).
pub struct RecordLayer {
    dispatch: Dispatch,
    min_level: Level,
    attrs: Map<String, Value>,
    /// Total events seen by the layer (before filtering by level).
    pub total_events: Arc<AtomicU64>,
    /// Events turned into records and handed on.
    pub recorded_events: Arc<AtomicU64>,
    /// Events whose record could not be written or queued.
    pub failed_events: Arc<AtomicU64>,
}

impl RecordLayer {
    /// Write records straight into `logger`, at the logger's minimum level.
    pub fn new(logger: FileLogger) -> Self {
        let min_level = logger.min_level();
        Self::with_dispatch(Dispatch::Direct(logger), min_level)
    }

    /// Hand records to a queue worker instead of writing them inline.
    pub fn queued(queue: QueuedSink, min_level: Level) -> Self {
        Self::with_dispatch(Dispatch::Queued(queue), min_level)
    }

    fn with_dispatch(dispatch: Dispatch, min_level: Level) -> Self {
        Self {
            dispatch,
            min_level,
            attrs: Map::new(),
            total_events: Arc::new(AtomicU64::new(0)),
            recorded_events: Arc::new(AtomicU64::new(0)),
            failed_events: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    /// Add a top-level attribute to every record.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// Tag every record with the plant and workplace that produced it.
    pub fn with_workplace(self, plant: impl Into<String>, name: impl Into<String>) -> Self {
        let mut workplace = Map::new();
        workplace.insert("plant".to_string(), Value::String(plant.into()));
        workplace.insert("name".to_string(), Value::String(name.into()));
        self.with_attr("workplace", Value::Object(workplace))
    }

    fn build_record(&self, event: &Event<'_>) -> LogRecord {
        let mut fields = Map::new();
        let mut message: Option<String> = None;

        let mut visitor = FieldVisitor { fields: &mut fields, message: &mut message };
        event.record(&mut visitor);

        let meta = event.metadata();
        let mut map = self.attrs.clone();
        map.insert(
            TIMESTAMP_KEY.to_string(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)),
        );
        map.insert(LEVEL_KEY.to_string(), Value::String(meta.level().to_string()));
        map.insert(MESSAGE_KEY.to_string(), Value::String(message.unwrap_or_default()));
        map.insert(TARGET_KEY.to_string(), Value::String(meta.target().to_string()));
        if !fields.is_empty() {
            map.insert("fields".to_string(), Value::Object(fields));
        }
        LogRecord::from(map)
    }
}

impl<S> Layer<S> for RecordLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        let meta = event.metadata();
        if *meta.level() > self.min_level || is_own_target(meta.target()) {
            return;
        }

        let record = self.build_record(event);
        let stored = match &self.dispatch {
            Dispatch::Direct(logger) => match logger.append(record) {
                Ok(()) => true,
                Err(e) => {
                    eprintln!("log store write failed: {}", e);
                    false
                }
            },
            Dispatch::Queued(queue) => {
                let queued = queue.try_submit(record);
                if !queued {
                    eprintln!("log queue full, dropping log record");
                }
                queued
            }
        };

        if stored {
            self.recorded_events.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_events.fetch_add(1, Ordering::Relaxed);
        }
    }
}

use tracing::field::{Field, Visit};

pub struct FieldVisitor<'a> {
    pub fields: &'a mut Map<String, Value>,
    pub message: &'a mut Option<String>,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.fields.insert(field.name().to_string(), Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.fields.insert(field.name().to_string(), Value::String(format!("{:?}", value)));
        }
    }
}
