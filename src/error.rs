//! Error taxonomy for an upload run.

use std::path::PathBuf;
use thiserror::Error;

use crate::contract::SinkError;

/// Errors that abort an upload run. Both kinds are fatal; the first one wins.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The source root could not be enumerated (missing, unreadable, broken entry).
    #[error("source unreadable: {}: {source}", path.display())]
    SourceUnreadable {
        /// The source root that was being walked.
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// Writing an object, or updating its content type, failed.
    #[error("upload of {key} failed: {source}")]
    Sink {
        /// Destination key of the object being written.
        key: String,
        #[source]
        source: SinkError,
    },
}

impl UploadError {
    pub fn is_source_unreadable(&self) -> bool {
        matches!(self, UploadError::SourceUnreadable { .. })
    }

    pub fn is_sink(&self) -> bool {
        matches!(self, UploadError::Sink { .. })
    }
}
