//! Live reconciliation of the index against filesystem notifications.
//!
//! Notifications are treated as prompts to re-derive state from disk, never
//! as a description of what changed. Each one takes one of two shapes: a
//! structural change somewhere in the tree, which triggers a full
//! reconciliation, or a change at a single form path, which rebuilds that
//! file while holding a lease on its path.

use crate::error::WatchError;
use crate::index::builder::Commit;
use crate::index::indexer::FormIndexer;
use crate::index::scanner::FormCandidate;
use notify::event::{AccessKind, AccessMode, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// What kind of single-path change was reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Content,
    Name,
}

/// A filesystem notification reduced to the shapes the index acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Something changed that is not a single-file edit.
    Structural,
    /// A change at `path`, relative to the source folder.
    Changed { kind: ChangeKind, path: PathBuf },
}

/// What [`dispatch`] did with a notification.
#[derive(Debug)]
pub enum Dispatch {
    /// A full reconciliation was started.
    Reconciling(JoinHandle<()>),
    /// A single-file build was started.
    Building(JoinHandle<()>),
    /// A build for the same path is already in flight.
    Dropped,
    /// The path is not shaped like a form.
    Ignored,
}

/// Route one notification. Returns without waiting for the work it starts.
pub fn dispatch(indexer: &FormIndexer, notification: Notification) -> Dispatch {
    let (kind, relative) = match notification {
        Notification::Structural => {
            let indexer = indexer.clone();
            return Dispatch::Reconciling(tokio::spawn(async move {
                if let Err(error) = indexer.reconcile().await {
                    tracing::warn!(%error, "reconciliation failed");
                }
            }));
        }
        Notification::Changed { kind, path } => (kind, path),
    };

    let Some(candidate) = FormCandidate::from_relative(indexer.config(), &relative) else {
        tracing::trace!(path = %relative.display(), "ignoring path outside form layout");
        return Dispatch::Ignored;
    };

    let Some(lease) = indexer.state().try_lease(&candidate.path) else {
        tracing::debug!(path = %candidate.path.display(), ?kind, "build in flight, dropping event");
        return Dispatch::Dropped;
    };

    let indexer = indexer.clone();
    Dispatch::Building(tokio::spawn(async move {
        let _lease = lease;
        if let Err(error) = indexer.build(&candidate, Commit::Store).await {
            tracing::warn!(
                path = %candidate.path.display(),
                ?kind,
                %error,
                "failed to rebuild form"
            );
        }
    }))
}

/// Reduce a raw `notify` event to index notifications.
///
/// Removals, the source side of renames, rescans, and anything touching the
/// root or an application directory become a single structural
/// notification. Creations, writes, and the target side of renames become
/// per-path changes.
pub fn classify(root: &Path, event: &Event) -> Vec<Notification> {
    if event.need_rescan() {
        return vec![Notification::Structural];
    }

    let kind = match event.kind {
        EventKind::Create(_) => ChangeKind::Name,
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => ChangeKind::Name,
        EventKind::Modify(ModifyKind::Name(_)) => return vec![Notification::Structural],
        EventKind::Modify(_) => ChangeKind::Content,
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => ChangeKind::Content,
        EventKind::Access(_) | EventKind::Other => return Vec::new(),
        EventKind::Remove(_) | EventKind::Any => return vec![Notification::Structural],
    };

    let mut notifications = Vec::new();
    for path in &event.paths {
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        if relative.components().count() < 2 {
            return vec![Notification::Structural];
        }
        notifications.push(Notification::Changed {
            kind,
            path: relative.to_path_buf(),
        });
    }
    notifications
}

/// The live directory subscription feeding [`dispatch`].
///
/// Registered once; dropping it stops delivery.
pub struct FormWatcher {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl FormWatcher {
    /// Subscribe to changes under the source folder.
    pub fn start(indexer: FormIndexer) -> Result<Self, WatchError> {
        let root = indexer.config().source_folder.clone();
        let (tx, mut rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

        let register = |source| WatchError::Register {
            path: root.clone(),
            source,
        };
        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            let _ = tx.send(result);
        })
        .map_err(register)?;
        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(register)?;

        // Some platforms report canonical paths for the watched tree.
        let canonical_root = root.canonicalize().unwrap_or_else(|_| root.clone());
        tracing::info!(path = %root.display(), "watching form tree");

        let task = tokio::spawn(async move {
            while let Some(result) = rx.recv().await {
                let event = match result {
                    Ok(event) => event,
                    Err(error) => {
                        tracing::warn!(%error, "filesystem watch error");
                        continue;
                    }
                };

                let mut notifications = classify(&root, &event);
                if notifications.is_empty() && canonical_root != root {
                    notifications = classify(&canonical_root, &event);
                }
                for notification in notifications {
                    dispatch(&indexer, notification);
                }
            }
        });

        Ok(Self {
            _watcher: watcher,
            task,
        })
    }
}

impl Drop for FormWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}
