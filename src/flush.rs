use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::buffer::RecordBuffer;
use crate::error::LogStoreError;
use crate::record::{decode_records, encode_records};
use crate::rotation::{select_target_file, LogFileName, TargetFile};

/// How merged content reaches the target file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushMode {
    /// Truncate the target and write the merged array in place.
    ///
    /// A crash after the truncate and before the write completes loses the
    /// file's previous content.
    #[default]
    Rewrite,
    /// Write the merged array to a hidden sibling file, fsync it and rename
    /// it over the target.
    AtomicReplace,
}

impl FromStr for FlushMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rewrite" => Ok(FlushMode::Rewrite),
            "atomic_replace" | "atomic" => Ok(FlushMode::AtomicReplace),
            other => Err(format!("unknown flush mode {other:?}")),
        }
    }
}

/// Result of one successful flush.
#[derive(Debug, Clone)]
pub struct FlushOutcome {
    pub file: LogFileName,
    pub path: PathBuf,
    /// Records moved out of the buffer.
    pub flushed: usize,
    /// Records in the file after the flush.
    pub total: usize,
    pub rotated_from: Option<LogFileName>,
}

/// Merge the buffered records into the file selected for `date` and empty
/// the buffer.
///
/// The target's existing array is read, the buffer is appended to it and
/// the whole array is written back. Any failure leaves the buffer untouched
/// so the caller can retry; a corrupt target fails the flush without
/// merging anything.
pub fn flush(
    buffer: &mut RecordBuffer,
    dir: &Path,
    date: NaiveDate,
    max_file_size: u64,
    mode: FlushMode,
) -> Result<FlushOutcome, LogStoreError> {
    let TargetFile {
        name,
        path,
        mut file,
        rotated_from,
    } = select_target_file(dir, date, max_file_size)?;

    let mut content = Vec::new();
    file.read_to_end(&mut content)
        .map_err(|e| LogStoreError::io(&path, e))?;
    let mut records = decode_records(&content).map_err(|source| LogStoreError::CorruptFile {
        path: path.clone(),
        source,
    })?;

    let flushed = buffer.len();
    records.extend_from_slice(buffer.records());
    let encoded = encode_records(&records)?;

    match mode {
        FlushMode::Rewrite => rewrite_in_place(&mut file, &path, &encoded)?,
        FlushMode::AtomicReplace => {
            drop(file);
            replace_atomically(dir, &name, &path, &encoded)?;
        }
    }

    buffer.clear();
    Ok(FlushOutcome {
        file: name,
        path,
        flushed,
        total: records.len(),
        rotated_from,
    })
}

fn rewrite_in_place(file: &mut File, path: &Path, content: &[u8]) -> Result<(), LogStoreError> {
    let io = |e| LogStoreError::io(path, e);
    file.set_len(0).map_err(io)?;
    file.seek(SeekFrom::Start(0)).map_err(io)?;
    file.write_all(content).map_err(io)?;
    file.flush().map_err(io)
}

fn replace_atomically(
    dir: &Path,
    name: &LogFileName,
    path: &Path,
    content: &[u8],
) -> Result<(), LogStoreError> {
    let tmp_path = dir.join(format!(".{name}.tmp"));
    let mut tmp = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tmp_path)
        .map_err(|e| LogStoreError::io(&tmp_path, e))?;
    tmp.write_all(content)
        .and_then(|()| tmp.sync_all())
        .map_err(|e| LogStoreError::io(&tmp_path, e))?;
    drop(tmp);

    fs::rename(&tmp_path, path).map_err(|e| LogStoreError::io(path, e))?;
    sync_dir(dir)
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<(), LogStoreError> {
    File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| LogStoreError::io(dir, e))
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<(), LogStoreError> {
    Ok(())
}
