//! Tree-wide indexing: the initial sweep and full reconciliation.

use crate::error::FormError;
use crate::index::builder::{Commit, build_form};
use crate::index::config::IndexConfig;
use crate::index::models::{FormId, FormRecord};
use crate::index::scanner::{FormCandidate, FormScanner};
use crate::index::state::IndexState;
use std::collections::HashMap;
use std::sync::Arc;

/// Statistics from a sweep or reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub discovered: usize,
    pub indexed: usize,
    pub failed: usize,
    /// Identifiers dropped because their form no longer exists.
    pub removed: usize,
}

/// Builds forms from the source tree into the shared index state.
#[derive(Debug, Clone)]
pub struct FormIndexer {
    state: Arc<IndexState>,
    config: Arc<IndexConfig>,
}

impl FormIndexer {
    pub fn new(state: Arc<IndexState>, config: Arc<IndexConfig>) -> Self {
        Self { state, config }
    }

    pub fn state(&self) -> &Arc<IndexState> {
        &self.state
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Build one candidate.
    pub async fn build(
        &self,
        candidate: &FormCandidate,
        commit: Commit,
    ) -> Result<FormRecord, FormError> {
        build_form(&self.state, &self.config, candidate, commit).await
    }

    /// Index every form in the tree, committing each as it is built.
    pub async fn index_tree(&self) -> Result<IndexStats, FormError> {
        let candidates = FormScanner::new(&self.config).discover().await?;
        let discovered = candidates.len();

        let mut stats = IndexStats {
            discovered,
            ..IndexStats::default()
        };
        for outcome in self.build_all(&candidates, Commit::Store).await {
            match outcome {
                Ok(_) => stats.indexed += 1,
                Err(_) => stats.failed += 1,
            }
        }

        tracing::info!(
            discovered = stats.discovered,
            indexed = stats.indexed,
            failed = stats.failed,
            "form tree indexed"
        );
        Ok(stats)
    }

    /// Re-derive the whole index from disk and swap it in at once.
    ///
    /// Fresh entries carry over without re-parsing. Anything the walk does
    /// not find is dropped by the swap.
    pub async fn reconcile(&self) -> Result<IndexStats, FormError> {
        let candidates = FormScanner::new(&self.config).discover().await?;

        let mut stats = IndexStats {
            discovered: candidates.len(),
            ..IndexStats::default()
        };
        let mut fresh: HashMap<FormId, FormRecord> = HashMap::with_capacity(candidates.len());
        let mut claimed: HashMap<(String, String), FormId> = HashMap::new();

        for outcome in self.build_all(&candidates, Commit::DryRun).await {
            let Ok(mut record) = outcome else {
                stats.failed += 1;
                continue;
            };

            let pair = (record.app.clone(), record.form.clone());
            if claimed.contains_key(&pair) {
                tracing::warn!(
                    app = %record.app,
                    form = %record.form,
                    path = %record.file.display(),
                    "duplicate form name, skipping"
                );
                stats.failed += 1;
                continue;
            }

            // Unbound forms each drew an identifier independently.
            if fresh.contains_key(&record.id) {
                record.id = match self
                    .state
                    .generate_id_excluding(self.config.max_id_attempts, |id| {
                        fresh.contains_key(id)
                    }) {
                    Ok(id) => id,
                    Err(error) => {
                        tracing::warn!(path = %record.file.display(), %error, "failed to identify form");
                        stats.failed += 1;
                        continue;
                    }
                };
            }

            claimed.insert(pair, record.id.clone());
            fresh.insert(record.id.clone(), record);
            stats.indexed += 1;
        }

        stats.removed = self.state.replace_all(fresh);

        tracing::info!(
            discovered = stats.discovered,
            indexed = stats.indexed,
            failed = stats.failed,
            removed = stats.removed,
            "form tree reconciled"
        );
        Ok(stats)
    }

    /// Build every candidate concurrently; failures are logged per file.
    async fn build_all(
        &self,
        candidates: &[FormCandidate],
        commit: Commit,
    ) -> Vec<Result<FormRecord, FormError>> {
        let builds = candidates.iter().map(|candidate| async move {
            let outcome = self.build(candidate, commit).await;
            if let Err(error) = &outcome {
                tracing::warn!(
                    app = %candidate.app,
                    path = %candidate.path.display(),
                    %error,
                    "failed to index form"
                );
            }
            outcome
        });

        futures::future::join_all(builds).await
    }
}
