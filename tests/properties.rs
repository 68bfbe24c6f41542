use std::fs;

use chrono::NaiveDate;
use proptest::prelude::*;
use serde_json::{Map, Value};
use tempfile::TempDir;
use tracing_log_store::buffer::RecordBuffer;
use tracing_log_store::flush::flush;
use tracing_log_store::record::{decode_records, encode_records};
use tracing_log_store::rotation::LogFileName;
use tracing_log_store::{FileLogger, FixedClock, FlushMode, LogConfig, LogRecord};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 31).unwrap()
}

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 _:\"\\\\]{0,16}".prop_map(Value::from),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    leaf().prop_recursive(2, 16, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::from),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn record() -> impl Strategy<Value = LogRecord> {
    prop::collection::btree_map("[a-z_]{1,8}", value(), 0..6)
        .prop_map(|m| LogRecord::from(m.into_iter().collect::<Map<_, _>>()))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Encoding a sequence of records and decoding it gives the same records.
    #[test]
    fn records_survive_encoding(records in prop::collection::vec(record(), 0..8)) {
        let bytes = encode_records(&records).unwrap();
        prop_assert_eq!(decode_records(&bytes).unwrap(), records.clone());

        for record in &records {
            let one = serde_json::to_vec(record).unwrap();
            prop_assert_eq!(&LogRecord::from_json(&one).unwrap(), record);
        }
    }

    /// The buffer never reaches the threshold after a write returns, and
    /// every completed threshold's worth of records is on disk.
    #[test]
    fn flush_triggers_exactly_at_threshold(stack in 1usize..8, writes in 0usize..40) {
        let tmp = TempDir::new().unwrap();
        let config = LogConfig::default().with_dir(tmp.path()).with_max_stack_size(stack);
        let logger = FileLogger::with_clock("prop", &config, FixedClock(today())).unwrap();

        for i in 0..writes {
            logger.append(LogRecord::new("INFO", i.to_string())).unwrap();
            prop_assert!(logger.buffered_len() < stack);
            prop_assert_eq!(logger.buffered_len(), (i + 1) % stack);
        }

        let file = logger.dir().join(LogFileName::new(today(), 0).to_string());
        let on_disk = if file.exists() {
            decode_records(&fs::read(&file).unwrap()).unwrap().len()
        } else {
            0
        };
        prop_assert_eq!(on_disk, writes - writes % stack);
    }

    /// After a flush the file holds its previous records followed by the
    /// buffered ones, in order.
    #[test]
    fn flush_preserves_prior_content(
        prior in prop::collection::vec(record(), 0..6),
        pending in prop::collection::vec(record(), 1..6),
        atomic in any::<bool>(),
    ) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(LogFileName::new(today(), 0).to_string());
        if !prior.is_empty() {
            fs::write(&path, encode_records(&prior).unwrap()).unwrap();
        }

        let mut buffer = RecordBuffer::new(pending.len());
        for record in &pending {
            buffer.push(record.clone());
        }
        let mode = if atomic { FlushMode::AtomicReplace } else { FlushMode::Rewrite };
        flush(&mut buffer, tmp.path(), today(), u64::MAX, mode).unwrap();

        let mut expected = prior.clone();
        expected.extend(pending.iter().cloned());
        prop_assert!(buffer.is_empty());
        prop_assert_eq!(decode_records(&fs::read(&path).unwrap()).unwrap(), expected);
    }

    /// The severity argument never changes the report.
    #[test]
    fn severity_is_ignored(writes in 0usize..12, severity in "(debug|info|warn|error|)") {
        let tmp = TempDir::new().unwrap();
        let config = LogConfig::default().with_dir(tmp.path()).with_max_stack_size(3);
        let logger = FileLogger::with_clock("prop", &config, FixedClock(today())).unwrap();
        for i in 0..writes {
            let level = ["DEBUG", "INFO", "WARN", "ERROR"][i % 4];
            logger.append(LogRecord::new(level, i.to_string())).unwrap();
        }

        prop_assert_eq!(logger.get_logs(2, &severity), logger.get_logs(2, "debug"));
    }
}
