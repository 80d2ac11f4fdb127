//! # Storage Module
//!
//! Append-only persistence for assessment records.
//!
//! ```text
//! db.rs      sled-backed store (records + per-subject index)
//! memory.rs  in-process store for tests and ephemeral nodes
//! ```
//!
//! Records are written once, when they reach a terminal state. Writing the
//! same record twice is a no-op; writing a *different* record under an
//! existing id is a conflict. Nothing is ever updated in place, so a
//! subject's history is the complete audit trail of its assessments.
//!
//! On disk, records are bincode. JSON is for the API.

pub mod db;
pub mod memory;

pub use db::SledRecordStore;
pub use memory::MemoryRecordStore;

use uuid::Uuid;

use crate::assessment::AssessmentRecord;

/// Errors that can occur during record store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("record {0} already exists with different contents")]
    Conflict(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Where assessment records live.
pub trait RecordStore: Send + Sync {
    /// Persist a record. Idempotent for identical records.
    fn put(&self, record: &AssessmentRecord) -> StoreResult<()>;

    fn get(&self, id: &Uuid) -> StoreResult<Option<AssessmentRecord>>;

    /// Every record for `subject_id`, in the order they were stored.
    fn list_by_subject(&self, subject_id: &str) -> StoreResult<Vec<AssessmentRecord>>;

    fn latest_for_subject(&self, subject_id: &str) -> StoreResult<Option<AssessmentRecord>> {
        Ok(self.list_by_subject(subject_id)?.pop())
    }

    /// Total number of records.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
