//! Error types for the form index.

use std::path::PathBuf;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error, wrapping one enum per concern.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Form(#[from] FormError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Startup configuration failures. Fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("source folder must be an absolute path: {0}")]
    NotAbsolute(PathBuf),

    #[error("source folder is not a readable directory: {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("failed to load config {path}: {reason}")]
    Load { path: PathBuf, reason: String },
}

/// Failures while building or mutating a single form entry.
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    /// The file vanished or cannot be read and written.
    #[error("cannot access {path}: {source}")]
    Access {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("document is not well-formed: {0}")]
    Parse(String),

    #[error("document has no metadata block")]
    MetadataMissing,

    /// The document's declared identity disagrees with where it is stored.
    #[error(
        "metadata names {claimed_app}/{claimed_form} but file is stored as {app}/{form}"
    )]
    Consistency {
        app: String,
        form: String,
        claimed_app: String,
        claimed_form: String,
    },

    #[error("no free form identifier after {attempts} attempts")]
    IdentifierExhausted { attempts: usize },
}

/// Failures registering the live directory watch.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("failed to watch {path}: {source}")]
    Register {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}
