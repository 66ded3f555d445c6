//! In-memory log store with scoped transactions.
//!
//! [`LogStore`] holds committed [`LogRecord`]s and can optionally be backed by a
//! JSON file. Writes made through [`LogStore::atomic`] are kept in a
//! [`Transaction`] and only reach the store when the closure returns `Ok`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A single persisted log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub id: u64,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Display for LogRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Log store file {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Write access shared by the store itself and by an open transaction.
pub trait Persistence {
    /// Create and persist a record with the given message.
    fn create(&mut self, message: &str) -> StoreResult<LogRecord>;

    /// Number of records visible from this scope.
    fn count(&self) -> usize;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    records: Vec<LogRecord>,
}

#[derive(Debug)]
pub struct LogStore {
    records: Vec<LogRecord>,
    path: Option<PathBuf>,
}

impl LogStore {
    pub fn in_memory() -> Self {
        Self {
            records: Vec::new(),
            path: None,
        }
    }

    /// Open a file-backed store. A missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let records = if path.exists() {
            let data = fs::read_to_string(&path)?;
            let file: StoreFile = serde_json::from_str(&data)?;
            check_ids(&path, &file.records)?;
            file.records
        } else {
            Vec::new()
        };
        log::debug!("Opened log store {} with {} records", path.display(), records.len());
        Ok(Self {
            records,
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    /// Run `f` inside a transaction.
    ///
    /// Writes made through the transaction are committed when `f` returns
    /// `Ok` and discarded when it returns `Err`. The error from `f` is returned
    /// as-is.
    pub fn atomic<T, F>(&mut self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> anyhow::Result<T>,
    {
        let mut tx = Transaction::begin(self);
        match f(&mut tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                tx.rollback();
                Err(err)
            }
        }
    }

    fn next_id(&self) -> u64 {
        self.records.last().map_or(1, |r| r.id + 1)
    }

    fn append(&mut self, mut records: Vec<LogRecord>) -> StoreResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        if let Some(path) = &self.path {
            let mut all = self.records.clone();
            all.extend(records.iter().cloned());
            write_file(path, &all)?;
            self.records = all;
        } else {
            self.records.append(&mut records);
        }
        Ok(())
    }
}

impl Persistence for LogStore {
    fn create(&mut self, message: &str) -> StoreResult<LogRecord> {
        let record = new_record(self.next_id(), message);
        self.append(vec![record.clone()])?;
        log::debug!("Autocommitted log record {}", record.id);
        Ok(record)
    }

    fn count(&self) -> usize {
        self.records.len()
    }
}

/// An open scoped transaction over a [`LogStore`].
pub struct Transaction<'s> {
    store: &'s mut LogStore,
    pending: Vec<LogRecord>,
    depth: usize,
}

impl<'s> Transaction<'s> {
    fn begin(store: &'s mut LogStore) -> Self {
        log::debug!("Transaction started");
        Self {
            store,
            pending: Vec::new(),
            depth: 0,
        }
    }

    /// Run `f` inside a savepoint of this transaction.
    ///
    /// On `Err` only the writes made inside `f` are discarded; the outer
    /// transaction stays open.
    pub fn atomic<T, F>(&mut self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&mut Transaction<'s>) -> anyhow::Result<T>,
    {
        let savepoint = self.pending.len();
        self.depth += 1;
        log::debug!("Savepoint {} at {} pending writes", self.depth, savepoint);
        let result = f(self);
        if result.is_err() {
            log::debug!(
                "Rolling back savepoint {} ({} writes)",
                self.depth,
                self.pending.len() - savepoint
            );
            self.pending.truncate(savepoint);
        }
        self.depth -= 1;
        result
    }

    /// Uncommitted writes made in this transaction so far.
    pub fn pending(&self) -> &[LogRecord] {
        &self.pending
    }

    fn commit(self) -> StoreResult<()> {
        let written = self.pending.len();
        self.store.append(self.pending)?;
        log::debug!("Transaction committed ({} writes)", written);
        Ok(())
    }

    fn rollback(self) {
        log::debug!("Transaction rolled back ({} writes)", self.pending.len());
    }
}

impl Persistence for Transaction<'_> {
    fn create(&mut self, message: &str) -> StoreResult<LogRecord> {
        let id = self
            .pending
            .last()
            .map_or_else(|| self.store.next_id(), |r| r.id + 1);
        let record = new_record(id, message);
        self.pending.push(record.clone());
        Ok(record)
    }

    fn count(&self) -> usize {
        self.store.count() + self.pending.len()
    }
}

fn new_record(id: u64, message: &str) -> LogRecord {
    LogRecord {
        id,
        message: message.to_string(),
        created_at: Utc::now(),
    }
}

fn check_ids(path: &Path, records: &[LogRecord]) -> StoreResult<()> {
    for pair in records.windows(2) {
        if pair[1].id <= pair[0].id {
            return Err(StoreError::Corrupt {
                path: path.to_path_buf(),
                reason: format!("record id {} follows {}", pair[1].id, pair[0].id),
            });
        }
    }
    Ok(())
}

fn write_file(path: &Path, records: &[LogRecord]) -> StoreResult<()> {
    let file = StoreFile {
        records: records.to_vec(),
    };
    let data = serde_json::to_string_pretty(&file)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
