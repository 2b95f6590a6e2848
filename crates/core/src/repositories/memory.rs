//! In-process record storage, used by tests and short-lived tooling.

use super::{check_version, RecordRepository};
use crate::{CoreError, CoreResult, RecordId};
use std::collections::HashMap;
use std::sync::RwLock;
use workflow::EncounterRecord;

#[derive(Debug, Default)]
pub struct InMemoryRepository {
    records: RwLock<HashMap<RecordId, EncounterRecord>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordRepository for InMemoryRepository {
    fn insert(&self, record: EncounterRecord) -> CoreResult<EncounterRecord> {
        let id = RecordId::from(record.id());
        let mut records = self.records.write().map_err(|_| CoreError::LockPoisoned)?;
        if records.contains_key(&id) {
            return Err(CoreError::AlreadyExists(id.to_string()));
        }
        let stored = record.with_version(1);
        records.insert(id, stored.clone());
        Ok(stored)
    }

    fn load(&self, id: &RecordId) -> CoreResult<EncounterRecord> {
        let records = self.records.read().map_err(|_| CoreError::LockPoisoned)?;
        records
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(id.to_string()))
    }

    fn save(&self, record: EncounterRecord) -> CoreResult<EncounterRecord> {
        let id = RecordId::from(record.id());
        let mut records = self.records.write().map_err(|_| CoreError::LockPoisoned)?;
        let current = records
            .get(&id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
        check_version(&id, current.version(), record.version())?;

        let next = record.version() + 1;
        let stored = record.with_version(next);
        records.insert(id, stored.clone());
        Ok(stored)
    }

    fn list(&self) -> CoreResult<Vec<EncounterRecord>> {
        let records = self.records.read().map_err(|_| CoreError::LockPoisoned)?;
        Ok(records.values().cloned().collect())
    }
}
