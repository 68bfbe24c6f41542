use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::record::{decode_records, LogRecord};
use crate::rotation::files_for_date;

/// Records reconstructed for a window of days, grouped by date and then by
/// source name.
///
/// Built fresh for every query and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LogReport(BTreeMap<NaiveDate, BTreeMap<String, Vec<LogRecord>>>);

impl LogReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records of `source` on `date`, in file order.
    pub fn get(&self, date: NaiveDate, source: &str) -> Option<&[LogRecord]> {
        self.0.get(&date)?.get(source).map(Vec::as_slice)
    }

    pub fn contains(&self, date: NaiveDate, source: &str) -> bool {
        self.get(date, source).is_some()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.0.keys().copied()
    }

    /// Number of dates present.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Records across every date and source.
    pub fn record_count(&self) -> usize {
        self.0
            .values()
            .flat_map(|sources| sources.values())
            .map(Vec::len)
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDate, &BTreeMap<String, Vec<LogRecord>>)> {
        self.0.iter()
    }

    pub fn into_inner(self) -> BTreeMap<NaiveDate, BTreeMap<String, Vec<LogRecord>>> {
        self.0
    }

    fn extend(&mut self, date: NaiveDate, source: &str, records: Vec<LogRecord>) {
        self.0
            .entry(date)
            .or_default()
            .entry(source.to_string())
            .or_default()
            .extend(records);
    }

    /// Append still-buffered records to today's entry for `source`.
    ///
    /// Only an entry that the disk scan already produced is extended; with no
    /// file for today the buffered records are not part of the report.
    pub(crate) fn merge_buffered(&mut self, today: NaiveDate, source: &str, buffered: &[LogRecord]) {
        if buffered.is_empty() {
            return;
        }
        if let Some(records) = self.0.get_mut(&today).and_then(|s| s.get_mut(source)) {
            records.extend_from_slice(buffered);
        }
    }
}

/// A file (or directory) the report scan could not use.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Read every log file of `source` dated between `today - days_back` and
/// `today` (inclusive) from `dir`.
///
/// Unreadable or undecodable files are left out of the report and returned
/// separately; they never fail the scan.
pub fn scan_files(
    dir: &Path,
    source: &str,
    today: NaiveDate,
    days_back: u32,
) -> (LogReport, Vec<SkippedFile>) {
    let mut report = LogReport::new();
    let mut skipped = Vec::new();

    for offset in 0..=u64::from(days_back) {
        let Some(date) = today.checked_sub_days(Days::new(offset)) else {
            break;
        };
        let files = match files_for_date(dir, date) {
            Ok(files) => files,
            Err(e) => {
                skipped.push(SkippedFile {
                    path: dir.to_path_buf(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        for (name, path) in files {
            let decoded = fs::read(&path)
                .map_err(|e| e.to_string())
                .and_then(|content| decode_records(&content).map_err(|e| e.to_string()));
            match decoded {
                Ok(records) => report.extend(name.date, source, records),
                Err(reason) => skipped.push(SkippedFile { path, reason }),
            }
        }
    }

    (report, skipped)
}
