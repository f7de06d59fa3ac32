//! JSON Lines files: one serialized record per line.

use super::StorageError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const BUFFER_BYTES: usize = 64 * 1024;

/// Write `records` to `path`, replacing it atomically.
///
/// Lines go to a sibling temp file first, which is renamed over `path` once
/// everything is flushed, so a reader never sees a half-written file.
pub fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<(), StorageError> {
    let tmp = temp_path(path);
    let file = File::create(&tmp).map_err(|e| StorageError::io(&tmp, e))?;
    let mut writer = BufWriter::with_capacity(BUFFER_BYTES, file);

    for record in records {
        serde_json::to_writer(&mut writer, record).map_err(StorageError::Serialize)?;
        writer.write_all(b"\n").map_err(|e| StorageError::io(&tmp, e))?;
    }
    writer.flush().map_err(|e| StorageError::io(&tmp, e))?;
    drop(writer);

    fs::rename(&tmp, path).map_err(|e| StorageError::io(path, e))
}

/// Read every record of a JSON Lines file, skipping blank lines.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StorageError> {
    let file = File::open(path).map_err(|e| StorageError::io(path, e))?;
    let reader = BufReader::with_capacity(BUFFER_BYTES, file);

    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| StorageError::io(path, e))?;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(line).map_err(|source| StorageError::Parse {
            path: path.to_path_buf(),
            line: index + 1,
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
