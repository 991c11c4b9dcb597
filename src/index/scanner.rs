//! Discovery of candidate form files in the `<application>/<form>.<ext>` tree.

use crate::error::FormError;
use crate::index::config::IndexConfig;
use std::path::{Component, Path, PathBuf};

/// A file that looks like a form by location and extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormCandidate {
    /// Application namespace (the parent directory name).
    pub app: String,
    /// File name without the document extension.
    pub stem: String,
    /// Absolute path to the file.
    pub path: PathBuf,
}

impl FormCandidate {
    /// Candidate for a path relative to the source folder, if it has the
    /// exact two-level `<application>/<form>.<ext>` shape.
    pub fn from_relative(config: &IndexConfig, relative: &Path) -> Option<Self> {
        let mut components = relative.components();
        let (Some(Component::Normal(app)), Some(Component::Normal(file)), None) =
            (components.next(), components.next(), components.next())
        else {
            return None;
        };

        let app = app.to_str()?;
        let stem = config.document_stem(file.to_str()?)?;
        Some(Self {
            app: app.to_string(),
            stem: stem.to_string(),
            path: config.source_folder.join(app).join(file),
        })
    }

    /// The form name this candidate is indexed under.
    pub fn form_name(&self, store_versions: bool, version: Option<&str>) -> String {
        match version {
            Some(version) if store_versions => format!("{}-{}", self.stem, version),
            _ => self.stem.clone(),
        }
    }
}

/// Walks the source folder for form candidates.
pub struct FormScanner<'a> {
    config: &'a IndexConfig,
}

impl<'a> FormScanner<'a> {
    pub fn new(config: &'a IndexConfig) -> Self {
        Self { config }
    }

    /// List every candidate form under the source folder.
    ///
    /// Fails only if the source folder itself cannot be read. Unreadable
    /// application directories are logged and skipped, and non-directory
    /// entries at the top level are ignored.
    pub async fn discover(&self) -> Result<Vec<FormCandidate>, FormError> {
        let root = &self.config.source_folder;
        let mut apps = tokio::fs::read_dir(root)
            .await
            .map_err(|source| FormError::Access {
                path: root.clone(),
                source,
            })?;

        let mut candidates = Vec::new();
        loop {
            let entry = match apps.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(source) => {
                    return Err(FormError::Access {
                        path: root.clone(),
                        source,
                    });
                }
            };

            let path = entry.path();
            let Some(app) = entry.file_name().to_str().map(str::to_string) else {
                tracing::debug!(path = %path.display(), "ignoring non UTF-8 entry");
                continue;
            };

            match tokio::fs::metadata(&path).await {
                Ok(metadata) if metadata.is_dir() => {}
                Ok(_) => {
                    tracing::debug!(path = %path.display(), "ignoring file in source folder");
                    continue;
                }
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "failed to stat entry");
                    continue;
                }
            }

            if let Err(error) = self.discover_app(&app, &path, &mut candidates).await {
                tracing::warn!(%app, path = %path.display(), %error, "failed to read application directory");
            }
        }

        tracing::debug!(count = candidates.len(), "discovered form candidates");
        Ok(candidates)
    }

    async fn discover_app(
        &self,
        app: &str,
        dir: &Path,
        candidates: &mut Vec<FormCandidate>,
    ) -> std::io::Result<()> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(stem) = file_name
                .to_str()
                .and_then(|name| self.config.document_stem(name))
            else {
                continue;
            };

            candidates.push(FormCandidate {
                app: app.to_string(),
                stem: stem.to_string(),
                path: entry.path(),
            });
        }
        Ok(())
    }
}
