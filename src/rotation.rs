use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::NaiveDate;

use crate::error::LogStoreError;

const FILE_SUFFIX: &str = ".log.json";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Name of one physical log file: `<date>_<index>.log.json`.
///
/// Ordering is by date, then by sequence index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogFileName {
    pub date: NaiveDate,
    pub index: u32,
}

impl LogFileName {
    pub fn new(date: NaiveDate, index: u32) -> Self {
        Self { date, index }
    }

    /// Parse a bare file name. Anything that is not exactly
    /// `YYYY-MM-DD_<n>.log.json` yields `None`.
    pub fn parse(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(FILE_SUFFIX)?;
        let (date, index) = stem.split_once('_')?;
        if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let date = NaiveDate::parse_from_str(date, DATE_FORMAT).ok()?;
        Some(Self {
            date,
            index: index.parse().ok()?,
        })
    }
}

impl fmt::Display for LogFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}{}", self.date.format(DATE_FORMAT), self.index, FILE_SUFFIX)
    }
}

/// Log files of `date` found in `dir`, sorted by sequence index.
///
/// A missing directory has no files.
pub fn files_for_date(dir: &Path, date: NaiveDate) -> io::Result<Vec<(LogFileName, PathBuf)>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        let Some(name) = entry.file_name().to_str().and_then(LogFileName::parse) else {
            continue;
        };
        if name.date == date {
            files.push((name, entry.path()));
        }
    }
    files.sort_by_key(|(name, _)| name.index);
    Ok(files)
}

/// File chosen to receive the next flush.
#[derive(Debug)]
pub struct TargetFile {
    pub name: LogFileName,
    pub path: PathBuf,
    /// Opened read + write, created if it did not exist.
    pub file: File,
    /// The full file this one replaces, when a rotation happened.
    pub rotated_from: Option<LogFileName>,
}

/// Choose (and open) the file that today's records go to.
///
/// Among the files of `date`, the most recently modified one is the
/// candidate; equal modification times favour the higher index. The
/// candidate is reused until it holds at least `max_file_size` bytes, after
/// which the next index (highest existing + 1) is created. With no files for
/// the date, index 0 is used.
pub fn select_target_file(
    dir: &Path,
    date: NaiveDate,
    max_file_size: u64,
) -> Result<TargetFile, LogStoreError> {
    fs::create_dir_all(dir).map_err(|e| LogStoreError::io(dir, e))?;
    let files = files_for_date(dir, date).map_err(|e| LogStoreError::io(dir, e))?;

    let mut candidate: Option<(SystemTime, u64, LogFileName)> = None;
    for (name, path) in &files {
        let meta = fs::metadata(path).map_err(|e| LogStoreError::io(path, e))?;
        let modified = meta.modified().map_err(|e| LogStoreError::io(path, e))?;
        // `files` is sorted by index, so `>=` lets the later index win ties.
        if candidate.as_ref().map_or(true, |(latest, ..)| modified >= *latest) {
            candidate = Some((modified, meta.len(), *name));
        }
    }

    let (name, rotated_from) = match candidate {
        None => (LogFileName::new(date, 0), None),
        Some((_, size, name)) if size < max_file_size => (name, None),
        Some((_, _, full)) => {
            let next_index = match files.last() {
                Some((last, _)) => last.index.checked_add(1).ok_or_else(|| {
                    LogStoreError::IndexExhausted {
                        dir: dir.to_path_buf(),
                        date,
                    }
                })?,
                None => 0,
            };
            (LogFileName::new(date, next_index), Some(full))
        }
    };

    let path = dir.join(name.to_string());
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&path)
        .map_err(|e| LogStoreError::io(&path, e))?;

    Ok(TargetFile {
        name,
        path,
        file,
        rotated_from,
    })
}
