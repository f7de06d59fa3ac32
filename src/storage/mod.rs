//! Durable output: the post table, numbered comment batches, and the
//! combined comment table.
//!
//! ```text
//! <output_dir>/
//!   posts.jsonl
//!   comments_batch_00000.jsonl
//!   comments_batch_00001.jsonl
//!   ...
//!   comments_combined.jsonl
//!   harvested_posts.txt
//! ```
//!
//! `harvested_posts.txt` lists, one per line, the posts whose comment
//! records have all been flushed to batches. A post is listed only after
//! the batch holding its last record is on disk.

use crate::models::{CommentRecord, PostRecord};
use log::{debug, info};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod jsonl;

pub const POSTS_FILE: &str = "posts.jsonl";
pub const COMBINED_FILE: &str = "comments_combined.jsonl";
pub const HARVESTED_FILE: &str = "harvested_posts.txt";
const BATCH_PREFIX: &str = "comments_batch_";
const BATCH_SUFFIX: &str = ".jsonl";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not serialize record: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("bad record in {path} at line {line}: {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    fn io(path: &Path, source: io::Error) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub fn batch_file_name(index: u32) -> String {
    format!("{BATCH_PREFIX}{index:05}{BATCH_SUFFIX}")
}

/// The batch index encoded in a batch file name, if it is one.
pub fn parse_batch_index(file_name: &str) -> Option<u32> {
    file_name
        .strip_prefix(BATCH_PREFIX)?
        .strip_suffix(BATCH_SUFFIX)?
        .parse()
        .ok()
}

/// Batch files in `dir`, ordered by batch index. A missing directory has
/// no batches.
pub fn list_batches(dir: &Path) -> Result<Vec<(u32, PathBuf)>, StorageError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StorageError::io(dir, e)),
    };

    let mut batches = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StorageError::io(dir, e))?;
        let name = entry.file_name();
        if let Some(index) = name.to_str().and_then(parse_batch_index) {
            batches.push((index, entry.path()));
        }
    }
    batches.sort();
    Ok(batches)
}

/// Write the post table to `<dir>/posts.jsonl`.
pub fn write_posts(dir: &Path, posts: &[PostRecord]) -> Result<PathBuf, StorageError> {
    fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;
    let path = dir.join(POSTS_FILE);
    jsonl::write_records(&path, posts)?;
    info!("Wrote {} posts to {}", posts.len(), path.display());
    Ok(path)
}

/// What a [`BatchWriter`] produced.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BatchSummary {
    pub batches: Vec<PathBuf>,
    pub records: usize,
}

/// Accumulates comment records and writes them out in numbered batches of
/// `batch_size`.
///
/// Numbering continues after the highest batch already in the directory,
/// so a re-run never overwrites earlier output. Records still pending when
/// the process dies are lost; everything flushed is durable.
#[derive(Debug)]
pub struct BatchWriter {
    dir: PathBuf,
    batch_size: usize,
    next_index: u32,
    pending: Vec<CommentRecord>,
    /// Finished posts whose last records are still pending.
    finished: Vec<String>,
    summary: BatchSummary,
}

impl BatchWriter {
    pub fn open(dir: &Path, batch_size: usize) -> Result<Self, StorageError> {
        fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;
        let next_index = list_batches(dir)?
            .last()
            .map(|(index, _)| index + 1)
            .unwrap_or(0);
        if next_index > 0 {
            info!(
                "{} already holds batches, continuing at batch {}",
                dir.display(),
                next_index
            );
        }
        let ledger = dir.join(HARVESTED_FILE);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&ledger)
            .map_err(|e| StorageError::io(&ledger, e))?;

        let batch_size = batch_size.max(1);
        Ok(Self {
            dir: dir.to_path_buf(),
            batch_size,
            next_index,
            pending: Vec::with_capacity(batch_size),
            finished: Vec::new(),
            summary: BatchSummary::default(),
        })
    }

    /// Note that every record of `post_id` has been pushed. The post is
    /// listed as harvested once those records are flushed.
    pub fn finish_post(&mut self, post_id: &str) -> Result<(), StorageError> {
        self.finished.push(post_id.to_string());
        if self.pending.is_empty() {
            self.record_finished()?;
        }
        Ok(())
    }

    fn record_finished(&mut self) -> Result<(), StorageError> {
        if self.finished.is_empty() {
            return Ok(());
        }
        let path = self.dir.join(HARVESTED_FILE);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StorageError::io(&path, e))?;
        let mut lines = String::new();
        for post_id in self.finished.drain(..) {
            lines.push_str(&post_id);
            lines.push('\n');
        }
        file.write_all(lines.as_bytes())
            .and_then(|_| file.sync_data())
            .map_err(|e| StorageError::io(&path, e))
    }

    /// Add one record, flushing if the batch is now full. Returns the path
    /// of the batch written, if any.
    pub fn push(&mut self, record: CommentRecord) -> Result<Option<PathBuf>, StorageError> {
        self.pending.push(record);
        if self.pending.len() >= self.batch_size {
            self.flush()
        } else {
            Ok(None)
        }
    }

    pub fn extend<I>(&mut self, records: I) -> Result<(), StorageError>
    where
        I: IntoIterator<Item = CommentRecord>,
    {
        for record in records {
            self.push(record)?;
        }
        Ok(())
    }

    /// Write out whatever is pending, even a short batch. Does nothing when
    /// nothing is pending.
    pub fn flush(&mut self) -> Result<Option<PathBuf>, StorageError> {
        if self.pending.is_empty() {
            return Ok(None);
        }
        let path = self.dir.join(batch_file_name(self.next_index));
        jsonl::write_records(&path, &self.pending)?;
        debug!("Wrote {} comments to {}", self.pending.len(), path.display());

        self.summary.records += self.pending.len();
        self.summary.batches.push(path.clone());
        self.pending.clear();
        self.next_index += 1;
        self.record_finished()?;
        Ok(Some(path))
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn next_index(&self) -> u32 {
        self.next_index
    }

    /// Flush the final partial batch and report what was written.
    pub fn finish(mut self) -> Result<BatchSummary, StorageError> {
        self.flush()?;
        info!(
            "Wrote {} comments in {} batches to {}",
            self.summary.records,
            self.summary.batches.len(),
            self.dir.display()
        );
        Ok(self.summary)
    }
}

/// Concatenate every batch in `dir`, in batch order, into `output`.
/// Returns the number of records written. Nothing is deduplicated.
pub fn combine_batches(dir: &Path, output: &Path) -> Result<usize, StorageError> {
    let batches = list_batches(dir)?;
    let mut combined: Vec<CommentRecord> = Vec::new();
    for (_, path) in &batches {
        let mut records = jsonl::read_records(path)?;
        debug!("Loaded {} comments from {}", records.len(), path.display());
        combined.append(&mut records);
    }
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
    }
    jsonl::write_records(output, &combined)?;
    info!(
        "Combined {} batches into {} ({} comments)",
        batches.len(),
        output.display(),
        combined.len()
    );
    Ok(combined.len())
}

/// Posts of `dir` whose comment records are all on disk. A directory
/// without a ledger has none.
pub fn harvested_post_ids(dir: &Path) -> Result<HashSet<String>, StorageError> {
    let path = dir.join(HARVESTED_FILE);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(HashSet::new()),
        Err(e) => return Err(StorageError::io(&path, e)),
    };
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Drop the rows left at the end of the batches by a post that was never
/// finished, so the post can be fetched again without duplicating them.
///
/// Posts are written one after another, so such rows only ever sit at the
/// tail of the highest batches. Emptied batches are deleted. Does nothing
/// in a directory without a ledger. Returns the number of rows dropped.
pub fn discard_unfinished(dir: &Path, harvested: &HashSet<String>) -> Result<usize, StorageError> {
    if !dir.join(HARVESTED_FILE).exists() {
        return Ok(0);
    }

    let mut dropped = 0;
    for (index, path) in list_batches(dir)?.into_iter().rev() {
        let mut records: Vec<CommentRecord> = jsonl::read_records(&path)?;
        let keep = records
            .iter()
            .rposition(|record| harvested.contains(&record.post_id))
            .map_or(0, |last| last + 1);
        if keep == records.len() {
            break;
        }

        dropped += records.len() - keep;
        if keep == 0 {
            fs::remove_file(&path).map_err(|e| StorageError::io(&path, e))?;
            info!("Removed batch {} of unfinished posts", index);
            continue;
        }
        records.truncate(keep);
        jsonl::write_records(&path, &records)?;
        info!("Trimmed batch {} to its {} finished rows", index, keep);
        break;
    }
    Ok(dropped)
}
