//! Form records and extracted document metadata.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// Stable opaque identifier addressing a form across renames and moves.
pub type FormId = String;

/// Number of characters in a generated [`FormId`].
pub const FORM_ID_LEN: usize = 40;

/// Descriptive fields pulled from a document's embedded metadata block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub application_name: Option<String>,
    pub form_name: Option<String>,
    pub form_version: Option<String>,
}

impl FormMetadata {
    /// Element names of the fields that are extracted.
    pub const FIELDS: [&'static str; 5] = [
        "title",
        "description",
        "application-name",
        "form-name",
        "form-version",
    ];

    /// Look up a field by its element name in the document.
    pub fn get(&self, field: &str) -> Option<&str> {
        match field {
            "title" => self.title.as_deref(),
            "description" => self.description.as_deref(),
            "application-name" => self.application_name.as_deref(),
            "form-name" => self.form_name.as_deref(),
            "form-version" => self.form_version.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn slot_mut(&mut self, field: &str) -> Option<&mut Option<String>> {
        match field {
            "title" => Some(&mut self.title),
            "description" => Some(&mut self.description),
            "application-name" => Some(&mut self.application_name),
            "form-name" => Some(&mut self.form_name),
            "form-version" => Some(&mut self.form_version),
            _ => None,
        }
    }
}

/// One indexed form document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormRecord {
    pub id: FormId,
    /// Application namespace; the parent directory name.
    pub app: String,
    /// Form name as indexed (the file stem, plus `-<version>` in
    /// version-storage mode).
    pub form: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    /// Absolute path to the backing file.
    pub file: PathBuf,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl FormRecord {
    /// Value of a searchable detail, addressed by document field name.
    pub fn detail(&self, name: &str) -> Option<&str> {
        match name {
            "title" => self.title.as_deref(),
            "description" => self.description.as_deref(),
            "application-name" => Some(&self.app),
            "form-name" => Some(&self.form),
            "form-version" => self.version.as_deref(),
            _ => None,
        }
    }
}
