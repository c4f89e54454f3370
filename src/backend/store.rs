//! The generic flat-record store.
//!
//! A [`Store`] owns every record of one type, bounded by a fixed capacity, and
//! mirrors them to a single file. The whole file is read on [`Store::load`];
//! every successful mutation rewrites it before returning (or appends, for
//! [`WriteMode::Append`] stores). Rewrites go through a temporary file in the
//! same directory and an atomic rename, so a crash mid-save leaves either the
//! old file or the new one.
//!
//! Deleting shifts later records down by one. A `list()` iterator borrows the
//! store, so a pass over the records has to end before anything is deleted.

use std::fmt::{Display, Formatter};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::codec::Codec;
use super::errors::{StoreError, ValidationError};
use super::schedule::{find_conflict, Interval};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordKey {
    /// Store-assigned sequence number, starting at 1.
    Id(u32),
    /// Caller-supplied key that must be unique within the store.
    Natural(String),
    /// No identity beyond the position in the file.
    Positional,
}

impl Display for RecordKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKey::Id(id) => write!(f, "{}", id),
            RecordKey::Natural(key) => write!(f, "{}", key),
            RecordKey::Positional => write!(f, "(positional)"),
        }
    }
}

pub trait Record: Clone {
    /// Short name used in log lines.
    const KIND: &'static str;

    fn key(&self) -> RecordKey;

    /// Called for `RecordKey::Id` records on insert and on update, so the
    /// stored id always comes from the store.
    fn assign_id(&mut self, _id: u32) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    #[default]
    Rewrite,
    /// Inserts append the new record; updates and deletes still rewrite.
    Append,
}

#[derive(Debug)]
pub struct Store<R, C> {
    path: PathBuf,
    capacity: usize,
    codec: C,
    mode: WriteMode,
    records: Vec<R>,
    // highest id seen this session, so deleted ids are never handed out again
    high_water: u32,
}

impl<R: Record, C: Codec<R>> Store<R, C> {
    /// An empty store; nothing is read until [`Store::load`].
    pub fn new(path: impl Into<PathBuf>, capacity: usize, codec: C) -> Self {
        Self {
            path: path.into(),
            capacity,
            codec,
            mode: WriteMode::Rewrite,
            records: Vec::new(),
            high_water: 0,
        }
    }

    pub fn open(path: impl Into<PathBuf>, capacity: usize, codec: C) -> Result<Self, StoreError> {
        let mut store = Self::new(path, capacity, codec);
        store.load()?;
        Ok(store)
    }

    pub fn with_mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    /// Replaces the in-memory records with the file contents. A missing file
    /// is an empty store.
    pub fn load(&mut self) -> Result<usize, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(kind = R::KIND, path = %self.path.display(), "no backing file, starting empty");
                self.records.clear();
                return Ok(0);
            }
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };

        let decoded = self.codec.decode(&bytes, self.capacity);

        if decoded.skipped > 0 {
            debug!(kind = R::KIND, skipped = decoded.skipped, "skipped malformed records");
        }
        if decoded.dropped > 0 {
            warn!(
                kind = R::KIND,
                dropped = decoded.dropped,
                capacity = self.capacity,
                "file holds more records than the store capacity"
            );
        }

        self.records = decoded.records;
        for record in &self.records {
            if let RecordKey::Id(id) = record.key() {
                self.high_water = self.high_water.max(id);
            }
        }

        info!(kind = R::KIND, count = self.records.len(), "loaded records");
        Ok(self.records.len())
    }

    /// Rewrites the backing file with every in-memory record.
    pub fn save(&self) -> Result<(), StoreError> {
        let bytes = self.codec.encode(&self.records);
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
        tmp.write_all(&bytes)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| StoreError::io(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| StoreError::io(&self.path, e.error))?;

        debug!(kind = R::KIND, count = self.records.len(), "saved records");
        Ok(())
    }

    fn append(&self, record: &R) -> Result<(), StoreError> {
        let io_error = |e: std::io::Error| StoreError::io(&self.path, e);
        let mut bytes = self.codec.encode(std::slice::from_ref(record));

        let mut file = OpenOptions::new()
            .read(true)
            .append(true) // Append, don't override
            .create(true)
            .open(&self.path)
            .map_err(io_error)?;

        // a file edited by hand may have lost its final newline
        if let Some(terminator) = self.codec.terminator() {
            if file.metadata().map_err(io_error)?.len() > 0 {
                let mut last = [0u8; 1];
                file.seek(SeekFrom::End(-1))
                    .and_then(|_| file.read_exact(&mut last))
                    .map_err(io_error)?;
                if last[0] != terminator {
                    bytes.insert(0, terminator);
                }
            }
        }

        file.write_all(&bytes).map_err(io_error)
    }

    pub fn add(&mut self, record: R) -> Result<RecordKey, StoreError> {
        if self.records.len() >= self.capacity {
            warn!(kind = R::KIND, capacity = self.capacity, "insert rejected, store is full");
            return Err(StoreError::CapacityExceeded {
                capacity: self.capacity,
            });
        }

        let mut record = record;
        let key = match record.key() {
            RecordKey::Id(_) => {
                let id = self.high_water.checked_add(1).ok_or_else(|| {
                    warn!(kind = R::KIND, "insert rejected, ids exhausted");
                    StoreError::IdsExhausted
                })?;
                record.assign_id(id);
                RecordKey::Id(id)
            }
            natural @ RecordKey::Natural(_) => {
                if self.position(&natural).is_some() {
                    return Err(StoreError::DuplicateKey(natural.to_string()));
                }
                natural
            }
            RecordKey::Positional => RecordKey::Positional,
        };

        self.records.push(record);

        let persisted = match self.mode {
            WriteMode::Rewrite => self.save(),
            WriteMode::Append => self.append(&self.records[self.records.len() - 1]),
        };
        if let Err(e) = persisted {
            self.records.pop();
            return Err(e);
        }

        if let RecordKey::Id(id) = key {
            self.high_water = id;
        }

        debug!(kind = R::KIND, key = %key, "added record");
        Ok(key)
    }

    /// Like [`Store::add`], but refuses a record whose span overlaps an
    /// existing record in the same partition.
    pub fn add_exclusive(&mut self, record: R) -> Result<RecordKey, StoreError>
    where
        R: Interval,
    {
        if let Some(hit) = find_conflict(&self.records, &record) {
            let existing_id = match hit.key() {
                RecordKey::Id(id) => id,
                _ => 0,
            };
            debug!(kind = R::KIND, existing_id, "insert rejected, span overlaps");

            return Err(ValidationError::Overlap {
                existing_id,
                existing: hit.span().to_string(),
            }
            .into());
        }

        self.add(record)
    }

    pub fn update(&mut self, index: usize, record: R) -> Result<(), StoreError> {
        let current = self
            .records
            .get(index)
            .ok_or_else(|| StoreError::NotFound(format!("#{}", index)))?;

        let mut record = record;
        match current.key() {
            RecordKey::Id(id) => record.assign_id(id),
            RecordKey::Natural(_) => {
                let new_key = record.key();
                if matches!(self.position(&new_key), Some(other) if other != index) {
                    return Err(StoreError::DuplicateKey(new_key.to_string()));
                }
            }
            RecordKey::Positional => {}
        }

        let previous = std::mem::replace(&mut self.records[index], record);
        if let Err(e) = self.save() {
            self.records[index] = previous;
            return Err(e);
        }

        Ok(())
    }

    pub fn update_by_key(&mut self, key: &RecordKey, record: R) -> Result<(), StoreError> {
        let index = self
            .position(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        self.update(index, record)
    }

    /// Updates the record with the same key, or adds it when there is none.
    pub fn upsert(&mut self, record: R) -> Result<RecordKey, StoreError> {
        let key = record.key();
        match self.position(&key) {
            Some(index) => {
                self.update(index, record)?;
                Ok(key)
            }
            None => self.add(record),
        }
    }

    /// Removes the record at `index`; later records move down by one.
    pub fn delete(&mut self, index: usize) -> Result<R, StoreError> {
        if index >= self.records.len() {
            return Err(StoreError::NotFound(format!("#{}", index)));
        }

        let removed = self.records.remove(index);
        if let Err(e) = self.save() {
            self.records.insert(index, removed);
            return Err(e);
        }

        debug!(kind = R::KIND, index, "deleted record");
        Ok(removed)
    }

    pub fn delete_by_key(&mut self, key: &RecordKey) -> Result<R, StoreError> {
        let index = self
            .position(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        self.delete(index)
    }

    pub fn list(&self) -> std::slice::Iter<'_, R> {
        self.records.iter()
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&R> {
        self.records.get(index)
    }

    pub fn position(&self, key: &RecordKey) -> Option<usize> {
        if *key == RecordKey::Positional {
            return None;
        }
        self.records.iter().position(|r| r.key() == *key)
    }

    pub fn find(&self, key: &RecordKey) -> Option<&R> {
        self.position(key).map(|i| &self.records[i])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
