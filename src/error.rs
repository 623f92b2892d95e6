use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("conversation not found: {0}")]
    NotFound(String),
    #[error("conversation document not found: {}", .0.display())]
    DocumentNotFound(PathBuf),
    #[error("message {id} not found in {}", .path.display())]
    MessageNotFound { id: i64, path: PathBuf },
    #[error("template has no `{anchor}` container: {template}")]
    InsertionPointMissing {
        anchor: &'static str,
        template: String,
    },
    #[error("conversation folder unavailable at {}: {source}", .path.display())]
    DirectoryUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("index entry `{name}` has an unusable folder link: {href}")]
    MalformedEntry { name: String, href: String },
    #[error("archive is locked by another writer: {}", .0.display())]
    Locked(PathBuf),
    #[error("failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ArchiveError {
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// Stable code carried by structured warnings.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::DocumentNotFound(_) => "DOCUMENT_NOT_FOUND",
            Self::MessageNotFound { .. } => "MESSAGE_NOT_FOUND",
            Self::InsertionPointMissing { .. } => "INSERTION_POINT_MISSING",
            Self::DirectoryUnavailable { .. } => "DIRECTORY_UNAVAILABLE",
            Self::MalformedEntry { .. } => "MALFORMED_ENTRY",
            Self::Locked(_) => "ARCHIVE_LOCKED",
            Self::Io { .. } => "IO_FAILED",
            Self::Corrupt { .. } => "STORE_CORRUPT",
        }
    }
}

pub type ArchiveResult<T> = std::result::Result<T, ArchiveError>;
