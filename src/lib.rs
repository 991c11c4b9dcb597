//! Formkeeper: a live, queryable index of form documents on disk.
//!
//! Forms are stored one file each under an application/form directory
//! hierarchy. The index assigns every form a stable identifier independent of
//! its filename and keeps itself consistent with the filesystem as change
//! notifications arrive.

pub mod error;
pub mod index;

pub use error::{Error, Result};
pub use index::{FormId, FormIndex, FormMetadata, FormRecord, IndexConfig, IndexHandle, initialize};
