//! Persona store: the only stateful component of the service.
//!
//! Callers hold an `Arc<dyn PersonaStore>` handle; nothing reaches the
//! records through ambient global state. [`InMemoryPersonaStore`] keeps
//! records in insertion order and guards each record with its own mutex,
//! so partial updates to the same id apply whole-update-at-a-time while
//! updates to different ids never contend.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::error::{Error, Result};

use super::types::{PersonaPatch, PersonaRecord};

// ─────────────────────────────────────────────────────────────────
// Store Trait
// ─────────────────────────────────────────────────────────────────

/// Storage contract for persona records.
pub trait PersonaStore: Send + Sync {
    /// Insert a record, or overwrite the record with the same id.
    fn put(&self, record: PersonaRecord);

    /// Current record for `id`, or `PersonaNotFound`.
    fn get(&self, id: &str) -> Result<PersonaRecord>;

    /// All current records. Order is implementation-defined.
    fn list(&self) -> Vec<PersonaRecord>;

    /// Merge the fields named in `patch` into the record and return the
    /// updated record. Atomic with respect to other operations on `id`.
    fn apply_partial(&self, id: &str, patch: &PersonaPatch) -> Result<PersonaRecord>;

    /// Number of stored records.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ─────────────────────────────────────────────────────────────────
// In-Memory Store
// ─────────────────────────────────────────────────────────────────

/// Process-local store; contents are lost on restart.
#[derive(Default)]
pub struct InMemoryPersonaStore {
    records: RwLock<IndexMap<String, Arc<Mutex<PersonaRecord>>>>,
}

impl InMemoryPersonaStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-record guard, released from the map lock before use.
    fn entry(&self, id: &str) -> Option<Arc<Mutex<PersonaRecord>>> {
        self.records.read().get(id).cloned()
    }
}

impl PersonaStore for InMemoryPersonaStore {
    fn put(&self, record: PersonaRecord) {
        if let Some(existing) = self.entry(&record.id) {
            debug!(persona_id = %record.id, "Overwriting persona");
            *existing.lock() = record;
            return;
        }

        let mut records = self.records.write();
        match records.get(&record.id) {
            // Lost a race with another insert of the same id
            Some(existing) => *existing.lock() = record,
            None => {
                debug!(persona_id = %record.id, "Storing persona");
                records.insert(record.id.clone(), Arc::new(Mutex::new(record)));
            }
        }
    }

    fn get(&self, id: &str) -> Result<PersonaRecord> {
        self.entry(id)
            .map(|entry| entry.lock().clone())
            .ok_or_else(|| Error::persona_not_found(id))
    }

    fn list(&self) -> Vec<PersonaRecord> {
        let entries: Vec<_> = self.records.read().values().cloned().collect();
        entries.iter().map(|entry| entry.lock().clone()).collect()
    }

    fn apply_partial(&self, id: &str, patch: &PersonaPatch) -> Result<PersonaRecord> {
        let entry = self.entry(id).ok_or_else(|| Error::persona_not_found(id))?;
        let mut record = entry.lock();
        patch.apply_to(&mut record);
        debug!(persona_id = %id, fields = ?patch.changed_fields(), "Applied partial update");
        Ok(record.clone())
    }

    fn len(&self) -> usize {
        self.records.read().len()
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
