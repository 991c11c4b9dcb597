//! The single owner of all mutable index state.
//!
//! Registry and store live behind one lock so a reader never sees an
//! identifier in one without the other. Per-file processing is serialized by
//! the in-flight path set rather than by holding that lock across I/O.

use crate::error::FormError;
use crate::index::models::{FORM_ID_LEN, FormId, FormRecord};
use crate::index::registry::IdentifierRegistry;
use crate::index::store::FormStore;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rand::Rng as _;
use rand::distr::Alphanumeric;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Maps {
    registry: IdentifierRegistry,
    store: FormStore,
}

/// Registry, record store, and the set of paths being processed.
#[derive(Debug, Default)]
pub struct IndexState {
    maps: RwLock<Maps>,
    in_flight: Mutex<HashSet<PathBuf>>,
}

impl IndexState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, app: &str, form: &str) -> Option<FormId> {
        self.maps.read().registry.lookup(app, form).cloned()
    }

    pub fn get(&self, id: &str) -> Option<FormRecord> {
        self.maps.read().store.get(id).cloned()
    }

    /// Snapshot of every record keyed by identifier.
    pub fn forms(&self) -> HashMap<FormId, FormRecord> {
        self.maps
            .read()
            .store
            .iter()
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect()
    }

    pub fn list(&self) -> Vec<FormRecord> {
        self.maps.read().store.list()
    }

    pub fn len(&self) -> usize {
        self.maps.read().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bind `(app, form)` to `id`, moving `id` off any pair it held before.
    pub fn bind(&self, id: &str, app: &str, form: &str) {
        let mut maps = self.maps.write();
        if let Some(displaced) = maps.registry.lookup(app, form).cloned() {
            if displaced != id {
                maps.store.delete(&displaced);
            }
        }
        maps.registry.assign(id, app, form);
    }

    /// Remove the binding for `(app, form)` and its record.
    pub fn unbind(&self, app: &str, form: &str) -> bool {
        let mut maps = self.maps.write();
        match maps.registry.unbind(app, form) {
            Some(id) => {
                maps.store.delete(&id);
                true
            }
            None => false,
        }
    }

    /// Draw a fresh identifier not present in the store or registry.
    pub fn generate_id(&self, max_attempts: usize) -> Result<FormId, FormError> {
        self.generate_id_excluding(max_attempts, |_| false)
    }

    /// Like [`generate_id`](Self::generate_id), also rejecting candidates
    /// for which `taken` returns true.
    pub fn generate_id_excluding(
        &self,
        max_attempts: usize,
        taken: impl Fn(&str) -> bool,
    ) -> Result<FormId, FormError> {
        let mut rng = rand::rng();
        for _ in 0..max_attempts {
            let candidate: FormId = (&mut rng)
                .sample_iter(&Alphanumeric)
                .take(FORM_ID_LEN)
                .map(char::from)
                .collect();

            let maps = self.maps.read();
            if !maps.store.contains(&candidate)
                && !maps.registry.contains_id(&candidate)
                && !taken(&candidate)
            {
                return Ok(candidate);
            }
        }

        Err(FormError::IdentifierExhausted {
            attempts: max_attempts,
        })
    }

    /// The stored record for `(app, form)` if it still describes `file` as
    /// last modified at `modified`.
    pub fn fresh_by_name(
        &self,
        app: &str,
        form: &str,
        file: &Path,
        modified: DateTime<Utc>,
    ) -> Option<FormRecord> {
        let maps = self.maps.read();
        let id = maps.registry.lookup(app, form)?;
        maps.store
            .get(id)
            .filter(|record| {
                record.modified == modified
                    && record.file == file
                    && record.app == app
                    && record.form == form
            })
            .cloned()
    }

    /// The stored record backed by `file`, if its modification time matches.
    pub fn fresh_by_file(&self, file: &Path, modified: DateTime<Utc>) -> Option<FormRecord> {
        let maps = self.maps.read();
        let record = maps.store.find_by_file(file)?;
        let bound = maps.registry.lookup(&record.app, &record.form) == Some(&record.id);
        (bound && record.modified == modified).then(|| record.clone())
    }

    /// Bind the record's pair to its identifier and store it, in one step.
    ///
    /// Any other record backed by the same file is retired along with its
    /// binding, so a file never describes more than one form.
    pub fn commit(&self, record: FormRecord) {
        let mut maps = self.maps.write();
        let superseded: Vec<FormId> = maps
            .store
            .iter()
            .filter(|(id, stored)| stored.file == record.file && **id != record.id)
            .map(|(id, _)| id.clone())
            .collect();
        for id in superseded {
            let owner = maps
                .registry
                .owner(&id)
                .map(|(app, form)| (app.to_string(), form.to_string()));
            if let Some((app, form)) = owner {
                maps.registry.unbind(&app, &form);
            }
            maps.store.delete(&id);
        }


        if let Some(displaced) = maps.registry.lookup(&record.app, &record.form).cloned() {
            if displaced != record.id {
                maps.store.delete(&displaced);
            }
        }
        maps.registry.assign(&record.id, &record.app, &record.form);
        maps.store.put(record.id.clone(), record);
    }

    /// Swap in a freshly derived record set and rebuild the registry from it.
    ///
    /// Returns how many previously stored identifiers were dropped.
    pub fn replace_all(&self, fresh: HashMap<FormId, FormRecord>) -> usize {
        let mut registry = IdentifierRegistry::default();
        for (id, record) in &fresh {
            registry.assign(id, &record.app, &record.form);
        }

        let mut maps = self.maps.write();
        let dropped = maps.store.replace_all(fresh);
        maps.registry = registry;
        dropped
    }

    /// Claim `path` for processing. `None` while another claim is held.
    pub fn try_lease(self: &Arc<Self>, path: &Path) -> Option<PathLease> {
        if self.in_flight.lock().insert(path.to_path_buf()) {
            Some(PathLease {
                state: Arc::clone(self),
                path: path.to_path_buf(),
            })
        } else {
            None
        }
    }

    pub fn is_in_flight(&self, path: &Path) -> bool {
        self.in_flight.lock().contains(path)
    }

    /// Every `(app, form)` whose registry entry and record disagree.
    #[cfg(test)]
    pub(crate) fn divergent_pairs(&self) -> Vec<(String, String)> {
        let maps = self.maps.read();
        let mut divergent: Vec<(String, String)> = maps
            .registry
            .iter()
            .filter(|(app, form, id)| {
                maps.store
                    .get(id)
                    .is_none_or(|record| record.app != *app || record.form != *form)
            })
            .map(|(app, form, _)| (app.to_string(), form.to_string()))
            .collect();
        for (id, record) in maps.store.iter() {
            if maps.registry.lookup(&record.app, &record.form) != Some(id) {
                divergent.push((record.app.clone(), record.form.clone()));
            }
        }
        divergent
    }
}

/// Exclusive claim on a path; released when dropped.
#[derive(Debug)]
pub struct PathLease {
    state: Arc<IndexState>,
    path: PathBuf,
}

impl Drop for PathLease {
    fn drop(&mut self) {
        self.state.in_flight.lock().remove(&self.path);
    }
}
