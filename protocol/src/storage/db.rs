//! # SledRecordStore
//!
//! Persistent record store on sled's embedded key-value engine.
//!
//! ## Tree Layout
//!
//! | Tree            | Key                                  | Value                      |
//! |-----------------|--------------------------------------|----------------------------|
//! | `records`       | record id (16B)                      | `bincode(AssessmentRecord)`|
//! | `subject_index` | `subject_id` ‖ `0x00` ‖ seq (8B BE)  | record id (16B)            |
//!
//! `seq` comes from sled's monotonic id generator, so a prefix scan over
//! `subject_index` yields a subject's records in insertion order. Subject
//! ids never contain NUL (control characters are rejected upstream), which
//! keeps the `0x00` separator unambiguous.
//!
//! ## Atomicity
//!
//! A record and its index entry are written in one multi-tree transaction.
//! Either both land or neither does.

use std::path::Path;

use sled::transaction::{ConflictableTransactionError, TransactionError, Transactional};
use sled::{Db, Tree};
use uuid::Uuid;

use super::{RecordStore, StoreError, StoreResult};
use crate::assessment::AssessmentRecord;

/// sled-backed [`RecordStore`].
///
/// sled trees support concurrent reads and serialized writes, so the store
/// can be shared across tasks via `Arc<SledRecordStore>` without external
/// locking.
#[derive(Debug, Clone)]
pub struct SledRecordStore {
    db: Db,
    /// Records keyed by id.
    records: Tree,
    /// `subject ‖ 0x00 ‖ seq` -> record id.
    subject_index: Tree,
}

impl SledRecordStore {
    /// Open or create a store at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// A store that lives in a temporary directory and is removed when
    /// dropped.
    pub fn open_temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let records = db.open_tree("records")?;
        let subject_index = db.open_tree("subject_index")?;
        Ok(Self {
            db,
            records,
            subject_index,
        })
    }

    /// Flush dirty buffers to disk.
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

fn subject_prefix(subject_id: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(subject_id.len() + 1);
    prefix.extend_from_slice(subject_id.as_bytes());
    prefix.push(0);
    prefix
}

fn decode(bytes: &[u8]) -> StoreResult<AssessmentRecord> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

impl RecordStore for SledRecordStore {
    fn put(&self, record: &AssessmentRecord) -> StoreResult<()> {
        let key = *record.id.as_bytes();
        let bytes =
            bincode::serialize(record).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut index_key = subject_prefix(&record.subject_id);
        index_key.extend_from_slice(&self.db.generate_id()?.to_be_bytes());

        (&self.records, &self.subject_index)
            .transaction(|(records, index)| {
                if let Some(existing) = records.get(&key[..])? {
                    if existing.as_ref() == bytes.as_slice() {
                        return Ok(());
                    }
                    return Err(ConflictableTransactionError::Abort(StoreError::Conflict(
                        record.id.to_string(),
                    )));
                }
                records.insert(&key[..], bytes.as_slice())?;
                index.insert(index_key.as_slice(), &key[..])?;
                Ok(())
            })
            .map_err(|e| match e {
                TransactionError::Abort(e) => e,
                TransactionError::Storage(e) => StoreError::Sled(e),
            })?;

        self.db.flush()?;
        Ok(())
    }

    fn get(&self, id: &Uuid) -> StoreResult<Option<AssessmentRecord>> {
        match self.records.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn list_by_subject(&self, subject_id: &str) -> StoreResult<Vec<AssessmentRecord>> {
        let mut out = Vec::new();
        for entry in self.subject_index.scan_prefix(subject_prefix(subject_id)) {
            let (_key, id) = entry?;
            let bytes = self.records.get(&id)?.ok_or_else(|| {
                StoreError::NotFound(format!("indexed record {}", hex::encode(&id)))
            })?;
            out.push(decode(&bytes)?);
        }
        Ok(out)
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
