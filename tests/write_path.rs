use std::fs;
use std::path::Path;
use std::thread;

use chrono::NaiveDate;
use tempfile::TempDir;
use tracing_log_store::record::decode_records;
use tracing_log_store::rotation::LogFileName;
use tracing_log_store::{FileLogger, FixedClock, FlushMode, LogConfig, LogRecord};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 9, 15).unwrap()
}

fn open(dir: &Path, config: LogConfig) -> FileLogger {
    FileLogger::with_clock("workplace-m1", &config.with_dir(dir), FixedClock(today())).unwrap()
}

fn record_json(i: usize) -> Vec<u8> {
    format!(r#"{{"level":"INFO","message":"message_number: {i}","n":{i}}}"#).into_bytes()
}

fn file_messages(path: &Path) -> Vec<String> {
    decode_records(&fs::read(path).unwrap())
        .unwrap()
        .iter()
        .map(|r| r.message().unwrap().to_string())
        .collect()
}

#[test]
fn six_writes_flush_five_and_report_all_six() {
    let tmp = TempDir::new().unwrap();
    let logger = open(
        tmp.path(),
        LogConfig::default().with_max_stack_size(5).with_max_file_size(5_096_000),
    );

    for i in 0..6 {
        logger.write(&record_json(i)).unwrap();
    }

    let file = logger.dir().join(LogFileName::new(today(), 0).to_string());
    assert_eq!(fs::read_dir(logger.dir()).unwrap().count(), 1);
    assert_eq!(
        file_messages(&file),
        (0..5).map(|i| format!("message_number: {i}")).collect::<Vec<_>>()
    );
    assert_eq!(logger.buffered_len(), 1);
    assert_eq!(logger.buffered()[0].message(), Some("message_number: 5"));

    let report = logger.get_logs(0, "");
    let records = report.get(today(), "workplace-m1").unwrap();
    assert_eq!(records.len(), 6);
    assert_eq!(records[5].message(), Some("message_number: 5"));
}

#[test]
fn flush_happens_exactly_at_threshold() {
    let tmp = TempDir::new().unwrap();
    let logger = open(tmp.path(), LogConfig::default().with_max_stack_size(3));

    for i in 0..2 {
        logger.write(&record_json(i)).unwrap();
        assert_eq!(fs::read_dir(logger.dir()).unwrap().count(), 0);
    }
    logger.write(&record_json(2)).unwrap();
    assert_eq!(logger.buffered_len(), 0);
    assert_eq!(fs::read_dir(logger.dir()).unwrap().count(), 1);
}

#[test]
fn full_file_rotates_to_next_index() {
    let tmp = TempDir::new().unwrap();
    // Any flushed file exceeds 10 bytes, so every flush after the first rotates.
    let logger = open(
        tmp.path(),
        LogConfig::default().with_max_stack_size(2).with_max_file_size(10),
    );

    for i in 0..6 {
        logger.write(&record_json(i)).unwrap();
    }

    let names: Vec<_> = (0..3)
        .map(|index| logger.dir().join(LogFileName::new(today(), index).to_string()))
        .collect();
    assert_eq!(file_messages(&names[0]), ["message_number: 0", "message_number: 1"]);
    assert_eq!(file_messages(&names[1]), ["message_number: 2", "message_number: 3"]);
    assert_eq!(file_messages(&names[2]), ["message_number: 4", "message_number: 5"]);

    let report = logger.get_logs(0, "");
    let messages: Vec<_> = report
        .get(today(), "workplace-m1")
        .unwrap()
        .iter()
        .filter_map(LogRecord::message)
        .collect();
    assert_eq!(messages.len(), 6);
    assert_eq!(messages[0], "message_number: 0");
    assert_eq!(messages[5], "message_number: 5");
}

#[test]
fn file_below_limit_keeps_receiving_flushes() {
    let tmp = TempDir::new().unwrap();
    let logger = open(tmp.path(), LogConfig::default().with_max_stack_size(2));

    for i in 0..6 {
        logger.write(&record_json(i)).unwrap();
    }

    assert_eq!(fs::read_dir(logger.dir()).unwrap().count(), 1);
    let file = logger.dir().join(LogFileName::new(today(), 0).to_string());
    assert_eq!(file_messages(&file).len(), 6);
}

#[test]
fn atomic_replace_mode_behaves_like_rewrite() {
    let tmp = TempDir::new().unwrap();
    let logger = open(
        tmp.path(),
        LogConfig::default()
            .with_max_stack_size(2)
            .with_flush_mode(FlushMode::AtomicReplace),
    );

    for i in 0..5 {
        logger.write(&record_json(i)).unwrap();
    }

    let file = logger.dir().join(LogFileName::new(today(), 0).to_string());
    assert_eq!(file_messages(&file).len(), 4);
    assert_eq!(logger.get_logs(0, "").record_count(), 5);
}

#[test]
fn severity_argument_does_not_filter() {
    let tmp = TempDir::new().unwrap();
    let logger = open(tmp.path(), LogConfig::default().with_max_stack_size(2));
    logger.write(br#"{"level":"DEBUG","message":"d"}"#).unwrap();
    logger.write(br#"{"level":"ERROR","message":"e"}"#).unwrap();
    logger.write(br#"{"level":"INFO","message":"i"}"#).unwrap();

    let errors = logger.get_logs(3, "error");
    let debug = logger.get_logs(3, "debug");
    assert_eq!(errors, debug);
    assert_eq!(errors.record_count(), 3);
}

#[test]
fn buffered_records_without_a_file_today_are_not_reported() {
    let tmp = TempDir::new().unwrap();
    let logger = open(tmp.path(), LogConfig::default().with_max_stack_size(5));
    logger.write(&record_json(0)).unwrap();

    let report = logger.get_logs(0, "");

    assert!(report.is_empty());
    assert_eq!(logger.buffered_len(), 1);
}

#[test]
fn report_spans_previous_days() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let yesterday = today().pred_opt().unwrap();
    let source_dir = dir.join("workplace-m1");
    fs::create_dir_all(&source_dir).unwrap();
    fs::write(
        source_dir.join(LogFileName::new(yesterday, 0).to_string()),
        br#"[{"level":"INFO","message":"old"}]"#,
    )
    .unwrap();

    let logger = open(dir, LogConfig::default().with_max_stack_size(1));
    logger.write(&record_json(0)).unwrap();

    assert_eq!(logger.get_logs(0, "").record_count(), 1);
    let report = logger.get_logs(1, "");
    assert_eq!(report.dates().collect::<Vec<_>>(), [yesterday, today()]);
    assert_eq!(report.get(yesterday, "workplace-m1").unwrap()[0].message(), Some("old"));
}

#[test]
fn corrupt_file_is_silently_left_out_of_report() {
    let tmp = TempDir::new().unwrap();
    let logger = open(tmp.path(), LogConfig::default().with_max_stack_size(1));
    logger.write(&record_json(0)).unwrap();
    let yesterday = today().pred_opt().unwrap();
    fs::write(
        logger.dir().join(LogFileName::new(yesterday, 0).to_string()),
        b"[{\"truncated",
    )
    .unwrap();

    let report = logger.get_logs(1, "");

    assert_eq!(report.record_count(), 1);
    assert!(!report.contains(yesterday, "workplace-m1"));
}

#[test]
fn concurrent_writers_lose_no_records() {
    let tmp = TempDir::new().unwrap();
    let logger = open(tmp.path(), LogConfig::default().with_max_stack_size(7));

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let logger = logger.clone();
            thread::spawn(move || {
                for i in 0..25 {
                    logger.write(&record_json(t * 100 + i)).unwrap();
                    assert!(logger.buffered_len() < 7);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let file = logger.dir().join(LogFileName::new(today(), 0).to_string());
    let flushed = file_messages(&file).len();
    assert_eq!(flushed % 7, 0);
    assert_eq!(flushed + logger.buffered_len(), 100);
    assert_eq!(logger.get_logs(0, "").record_count(), 100);
}
