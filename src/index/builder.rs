//! Single-file build: stat, freshness check, extract, validate, identify.

use crate::error::FormError;
use crate::index::config::IndexConfig;
use crate::index::metadata::MetadataExtractor;
use crate::index::models::FormRecord;
use crate::index::scanner::FormCandidate;
use crate::index::state::IndexState;
use chrono::{DateTime, Utc};
use std::io;

/// Whether a build writes its result into the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    /// Bind the identifier and store the record.
    Store,
    /// Return the record without touching the index.
    DryRun,
}

/// Build the record for one candidate file.
///
/// A stored record whose modification time still matches the file is
/// returned as is, without reading the file. No identifier is generated for
/// a document that fails extraction or identity checks.
pub async fn build_form(
    state: &IndexState,
    config: &IndexConfig,
    candidate: &FormCandidate,
    commit: Commit,
) -> Result<FormRecord, FormError> {
    let path = &candidate.path;
    let access = |source: io::Error| FormError::Access {
        path: path.clone(),
        source,
    };

    let stat = tokio::fs::metadata(path).await.map_err(access)?;
    if !stat.is_file() {
        return Err(access(io::Error::new(
            io::ErrorKind::InvalidInput,
            "not a regular file",
        )));
    }
    if stat.permissions().readonly() {
        return Err(access(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "file is read-only",
        )));
    }

    let modified: DateTime<Utc> = stat.modified().map_err(access)?.into();
    let created = stat
        .created()
        .map(DateTime::<Utc>::from)
        .unwrap_or(modified);

    let cached = if config.store_versions {
        state.fresh_by_file(path, modified)
    } else {
        state.fresh_by_name(&candidate.app, &candidate.stem, path, modified)
    };
    if let Some(record) = cached {
        tracing::trace!(path = %path.display(), id = %record.id, "form unchanged");
        return Ok(record);
    }

    let raw = tokio::fs::read(path).await.map_err(access)?;
    let metadata = MetadataExtractor::extract(&raw)?;

    let form = candidate.form_name(config.store_versions, metadata.form_version.as_deref());
    if metadata.application_name.as_deref() != Some(candidate.app.as_str())
        || metadata.form_name.as_deref() != Some(form.as_str())
    {
        return Err(FormError::Consistency {
            app: candidate.app.clone(),
            form,
            claimed_app: metadata.application_name.unwrap_or_default(),
            claimed_form: metadata.form_name.unwrap_or_default(),
        });
    }

    let id = match state.lookup(&candidate.app, &form) {
        Some(id) => id,
        None => state.generate_id(config.max_id_attempts)?,
    };

    let record = FormRecord {
        id,
        app: candidate.app.clone(),
        form,
        title: metadata.title,
        description: metadata.description,
        version: metadata.form_version,
        file: path.clone(),
        created,
        modified,
    };

    if commit == Commit::Store {
        state.commit(record.clone());
        tracing::debug!(
            app = %record.app,
            form = %record.form,
            id = %record.id,
            "form indexed"
        );
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn document(app: &str, form: &str, title: &str, version: Option<&str>) -> String {
        let version = version
            .map(|v| format!("<form-version>{v}</form-version>"))
            .unwrap_or_default();
        format!(
            "<html><head><instance><metadata>\
             <application-name>{app}</application-name>\
             <form-name>{form}</form-name>\
             <title>{title}</title>{version}\
             </metadata></instance></head></html>"
        )
    }

    fn write_form(root: &Path, app: &str, file: &str, body: &str) -> FormCandidate {
        std::fs::create_dir_all(root.join(app)).unwrap();
        std::fs::write(root.join(app).join(file), body).unwrap();
        let config = IndexConfig::new(root);
        FormCandidate::from_relative(&config, &Path::new(app).join(file)).unwrap()
    }

    fn set_mtime(path: &Path, unix_secs: i64) {
        filetime::set_file_mtime(path, filetime::FileTime::from_unix_time(unix_secs, 0)).unwrap();
    }

    #[tokio::test]
    async fn builds_and_commits_valid_form() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = IndexConfig::new(temp.path());
        let candidate = write_form(
            temp.path(),
            "acme",
            "intake.xhtml",
            &document("acme", "intake", "Intake", None),
        );
        let state = IndexState::new();

        let record = build_form(&state, &config, &candidate, Commit::Store)
            .await
            .unwrap();
        assert_eq!(record.title.as_deref(), Some("Intake"));
        assert_eq!(record.file, candidate.path);
        assert_eq!(state.lookup("acme", "intake"), Some(record.id.clone()));
        assert_eq!(state.get(&record.id), Some(record));
    }

    #[tokio::test]
    async fn dry_run_leaves_index_untouched() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = IndexConfig::new(temp.path());
        let candidate = write_form(
            temp.path(),
            "acme",
            "intake.xhtml",
            &document("acme", "intake", "Intake", None),
        );
        let state = IndexState::new();

        let record = build_form(&state, &config, &candidate, Commit::DryRun)
            .await
            .unwrap();
        assert_eq!(record.form, "intake");
        assert!(state.is_empty());
        assert_eq!(state.lookup("acme", "intake"), None);
    }

    #[tokio::test]
    async fn unchanged_file_is_not_reparsed() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = IndexConfig::new(temp.path());
        let candidate = write_form(
            temp.path(),
            "acme",
            "intake.xhtml",
            &document("acme", "intake", "Intake", None),
        );
        set_mtime(&candidate.path, 1_700_000_000);
        let state = IndexState::new();
        let first = build_form(&state, &config, &candidate, Commit::Store)
            .await
            .unwrap();

        // Garbage with the same mtime is never read.
        std::fs::write(&candidate.path, "not xml").unwrap();
        set_mtime(&candidate.path, 1_700_000_000);
        let second = build_form(&state, &config, &candidate, Commit::Store)
            .await
            .unwrap();
        assert_eq!(first, second);

        // A new mtime forces a rebuild, keeping the identifier.
        std::fs::write(
            &candidate.path,
            document("acme", "intake", "Intake v2", None),
        )
        .unwrap();
        set_mtime(&candidate.path, 1_700_000_600);
        let third = build_form(&state, &config, &candidate, Commit::Store)
            .await
            .unwrap();
        assert_eq!(third.id, first.id);
        assert_eq!(third.title.as_deref(), Some("Intake v2"));
    }

    #[tokio::test]
    async fn mismatched_identity_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = IndexConfig::new(temp.path());
        let candidate = write_form(
            temp.path(),
            "globex",
            "intake.xhtml",
            &document("acme", "intake", "Intake", None),
        );
        let state = IndexState::new();

        let error = build_form(&state, &config, &candidate, Commit::Store)
            .await
            .unwrap_err();
        assert!(matches!(error, FormError::Consistency { .. }));
        assert!(state.is_empty());
        assert_eq!(state.lookup("globex", "intake"), None);
        assert_eq!(state.lookup("acme", "intake"), None);
    }

    #[tokio::test]
    async fn padded_identity_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = IndexConfig::new(temp.path());
        let candidate = write_form(
            temp.path(),
            "acme",
            "intake.xhtml",
            &document(" acme ", "intake", "Intake", None),
        );
        let state = IndexState::new();

        let error = build_form(&state, &config, &candidate, Commit::Store)
            .await
            .unwrap_err();
        assert!(matches!(error, FormError::Consistency { .. }));
        assert!(state.is_empty());
    }

    #[tokio::test]
    async fn vanished_file_is_an_access_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = IndexConfig::new(temp.path());
        let candidate =
            FormCandidate::from_relative(&config, Path::new("acme/gone.xhtml")).unwrap();
        let error = build_form(&IndexState::new(), &config, &candidate, Commit::Store)
            .await
            .unwrap_err();
        assert!(matches!(error, FormError::Access { .. }));
    }

    #[tokio::test]
    async fn metadata_errors_propagate() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = IndexConfig::new(temp.path());
        let state = IndexState::new();

        let broken = write_form(temp.path(), "acme", "broken.xhtml", "<html><head>");
        let error = build_form(&state, &config, &broken, Commit::Store)
            .await
            .unwrap_err();
        assert!(matches!(error, FormError::Parse(_)));

        let bare = write_form(temp.path(), "acme", "bare.xhtml", "<html/>");
        let error = build_form(&state, &config, &bare, Commit::Store)
            .await
            .unwrap_err();
        assert!(matches!(error, FormError::MetadataMissing));
        assert!(state.is_empty());
    }

    #[tokio::test]
    async fn versioned_names_include_form_version() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut config = IndexConfig::new(temp.path());
        config.store_versions = true;
        let candidate = write_form(
            temp.path(),
            "acme",
            "intake.xhtml",
            &document("acme", "intake-2", "Intake", Some("2")),
        );
        let state = IndexState::new();

        let record = build_form(&state, &config, &candidate, Commit::Store)
            .await
            .unwrap();
        assert_eq!(record.form, "intake-2");
        assert_eq!(record.version.as_deref(), Some("2"));
        assert_eq!(state.lookup("acme", "intake-2"), Some(record.id.clone()));

        let again = build_form(&state, &config, &candidate, Commit::Store)
            .await
            .unwrap();
        assert_eq!(again.id, record.id);
    }

    #[tokio::test]
    async fn version_bump_replaces_record_for_same_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut config = IndexConfig::new(temp.path());
        config.store_versions = true;
        let candidate = write_form(
            temp.path(),
            "acme",
            "intake.xhtml",
            &document("acme", "intake-2", "Intake", Some("2")),
        );
        set_mtime(&candidate.path, 1_700_000_000);
        let state = IndexState::new();
        let old = build_form(&state, &config, &candidate, Commit::Store)
            .await
            .unwrap();

        std::fs::write(
            &candidate.path,
            document("acme", "intake-3", "Intake", Some("3")),
        )
        .unwrap();
        set_mtime(&candidate.path, 1_700_000_600);
        let new = build_form(&state, &config, &candidate, Commit::Store)
            .await
            .unwrap();

        assert_eq!(new.form, "intake-3");
        assert_eq!(state.len(), 1);
        assert_eq!(state.lookup("acme", "intake-2"), None);
        assert!(state.get(&old.id).is_none());
        assert_eq!(state.lookup("acme", "intake-3"), Some(new.id.clone()));

        // The surviving record now answers the freshness check.
        let again = build_form(&state, &config, &candidate, Commit::Store)
            .await
            .unwrap();
        assert_eq!(again, new);
    }
}
