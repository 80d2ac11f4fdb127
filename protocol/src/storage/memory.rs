//! In-process [`RecordStore`]. Same semantics as the sled store, no
//! durability.

use std::collections::HashMap;

use parking_lot::RwLock;
use uuid::Uuid;

use super::{RecordStore, StoreError, StoreResult};
use crate::assessment::AssessmentRecord;

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<Uuid, AssessmentRecord>,
    by_subject: HashMap<String, Vec<Uuid>>,
}

#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    inner: RwLock<Inner>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryRecordStore {
    fn put(&self, record: &AssessmentRecord) -> StoreResult<()> {
        let mut inner = self.inner.write();
        if let Some(existing) = inner.records.get(&record.id) {
            if existing == record {
                return Ok(());
            }
            return Err(StoreError::Conflict(record.id.to_string()));
        }
        inner.records.insert(record.id, record.clone());
        inner
            .by_subject
            .entry(record.subject_id.clone())
            .or_default()
            .push(record.id);
        Ok(())
    }

    fn get(&self, id: &Uuid) -> StoreResult<Option<AssessmentRecord>> {
        Ok(self.inner.read().records.get(id).cloned())
    }

    fn list_by_subject(&self, subject_id: &str) -> StoreResult<Vec<AssessmentRecord>> {
        let inner = self.inner.read();
        let Some(ids) = inner.by_subject.get(subject_id) else {
            return Ok(Vec::new());
        };
        ids.iter()
            .map(|id| {
                inner
                    .records
                    .get(id)
                    .cloned()
                    .ok_or_else(|| StoreError::NotFound(id.to_string()))
            })
            .collect()
    }

    fn len(&self) -> usize {
        self.inner.read().records.len()
    }
}
