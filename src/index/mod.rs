//! Live index of form documents kept in step with the filesystem.
//!
//! Forms live under `<source>/<application>/<form>.<ext>`. Each one gets a
//! stable random identifier that survives renames. An initial sweep builds the
//! index, then a directory watcher re-derives entries as notifications
//! arrive.

pub mod builder;
pub mod config;
pub mod indexer;
pub mod metadata;
pub mod models;
pub mod registry;
pub mod scanner;
pub mod state;
pub mod store;
pub mod watcher;

use crate::error::Result;
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;

pub use builder::Commit;
pub use config::IndexConfig;
pub use indexer::{FormIndexer, IndexStats};
pub use metadata::MetadataExtractor;
pub use models::{FORM_ID_LEN, FormId, FormMetadata, FormRecord};
pub use scanner::FormCandidate;
pub use state::IndexState;
pub use watcher::{ChangeKind, Dispatch, FormWatcher, Notification};

/// Validate `config`, index the whole tree, and start watching it.
pub async fn initialize(config: IndexConfig) -> Result<IndexHandle> {
    let index = FormIndex::open(config)?;
    let stats = index.index_tree().await?;
    let watcher = FormWatcher::start(index.indexer.clone())?;

    tracing::info!(
        forms = index.len(),
        failed = stats.failed,
        "form index ready"
    );
    Ok(IndexHandle {
        index,
        _watcher: watcher,
    })
}

/// Shared access to the form index and its mutators.
#[derive(Debug, Clone)]
pub struct FormIndex {
    indexer: FormIndexer,
}

impl FormIndex {
    /// Open an empty index over a validated source folder.
    pub fn open(config: IndexConfig) -> Result<Self> {
        config.validate()?;
        let indexer = FormIndexer::new(Arc::new(IndexState::new()), Arc::new(config));
        Ok(Self { indexer })
    }

    pub fn config(&self) -> &IndexConfig {
        self.indexer.config()
    }

    /// Snapshot of every form keyed by identifier.
    pub fn forms(&self) -> HashMap<FormId, FormRecord> {
        self.indexer.state().forms()
    }

    /// Snapshot of every form, oldest first.
    pub fn forms_by_creation(&self) -> Vec<FormRecord> {
        let mut forms = self.indexer.state().list();
        forms.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));
        forms
    }

    pub fn get(&self, id: &str) -> Option<FormRecord> {
        self.indexer.state().get(id)
    }

    pub fn len(&self) -> usize {
        self.indexer.state().len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexer.state().is_empty()
    }

    pub fn lookup_identifier(&self, app: &str, form: &str) -> Option<FormId> {
        self.indexer.state().lookup(app, form)
    }

    /// Bind `(app, form)` to `id`. An identifier moved onto a new pair stops
    /// resolving under its old one.
    pub fn bind(&self, id: &str, app: &str, form: &str) {
        self.indexer.state().bind(id, app, form);
    }

    /// Forget `(app, form)` and its record. Returns whether it was bound.
    pub fn unbind(&self, app: &str, form: &str) -> bool {
        self.indexer.state().unbind(app, form)
    }

    /// A fresh identifier not used by any form.
    pub fn new_identifier(&self) -> Result<FormId> {
        Ok(self
            .indexer
            .state()
            .generate_id(self.config().max_id_attempts)?)
    }

    pub fn extract_metadata(&self, raw: &[u8]) -> Result<FormMetadata> {
        Ok(MetadataExtractor::extract(raw)?)
    }

    /// Rebuild `<app>/<stem>.<ext>` now and commit the result.
    ///
    /// Takes the same path lease as watcher-driven builds; returns
    /// `Ok(None)` if one is already in flight for this file.
    pub async fn refresh(&self, app: &str, stem: &str) -> Result<Option<FormRecord>> {
        let file_name = format!("{stem}.{}", self.config().extension);
        let relative = std::path::Path::new(app).join(file_name);
        let candidate = FormCandidate::from_relative(self.config(), &relative).ok_or_else(|| {
            crate::Error::Other(anyhow::anyhow!(
                "not an <application>/<form> path: {}",
                relative.display()
            ))
        })?;

        let Some(_lease) = self.indexer.state().try_lease(&candidate.path) else {
            return Ok(None);
        };
        Ok(Some(self.indexer.build(&candidate, Commit::Store).await?))
    }

    /// Index every form on disk, committing as it goes.
    pub async fn index_tree(&self) -> Result<IndexStats> {
        Ok(self.indexer.index_tree().await?)
    }

    /// Re-derive the index from disk and replace it atomically.
    pub async fn reconcile(&self) -> Result<IndexStats> {
        Ok(self.indexer.reconcile().await?)
    }

    /// Route a filesystem notification without waiting for its work.
    pub fn dispatch(&self, notification: Notification) -> Dispatch {
        watcher::dispatch(&self.indexer, notification)
    }
}

/// A running index: the shared [`FormIndex`] plus its directory watch.
pub struct IndexHandle {
    index: FormIndex,
    _watcher: FormWatcher,
}

impl IndexHandle {
    /// A clonable handle to the index that does not own the watch.
    pub fn index(&self) -> &FormIndex {
        &self.index
    }
}

impl Deref for IndexHandle {
    type Target = FormIndex;

    fn deref(&self) -> &FormIndex {
        &self.index
    }
}
