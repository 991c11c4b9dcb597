//! Identifier-keyed storage of form records.

use crate::index::models::{FormId, FormRecord};
use std::collections::HashMap;

/// In-memory form records, keyed by identifier.
#[derive(Debug, Clone, Default)]
pub struct FormStore {
    records: HashMap<FormId, FormRecord>,
}

impl FormStore {
    pub fn get(&self, id: &str) -> Option<&FormRecord> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// Snapshot of every record.
    pub fn list(&self) -> Vec<FormRecord> {
        self.records.values().cloned().collect()
    }

    /// Insert or replace the record for `id`.
    pub fn put(&mut self, id: FormId, record: FormRecord) -> Option<FormRecord> {
        self.records.insert(id, record)
    }

    pub fn delete(&mut self, id: &str) -> Option<FormRecord> {
        self.records.remove(id)
    }

    /// Replace the whole contents; returns how many old identifiers were dropped.
    pub fn replace_all(&mut self, records: HashMap<FormId, FormRecord>) -> usize {
        let dropped = self
            .records
            .keys()
            .filter(|id| !records.contains_key(*id))
            .count();
        self.records = records;
        dropped
    }

    /// Record whose backing file is `path`, if any.
    pub fn find_by_file(&self, path: &std::path::Path) -> Option<&FormRecord> {
        self.records.values().find(|record| record.file == path)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FormId, &FormRecord)> {
        self.records.iter()
    }
}
