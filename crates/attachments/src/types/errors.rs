//! Error types for the attachments domain.

use thiserror::Error;

/// Result type alias for collaborator store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Failure reported by one of the host collaborators
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Create a backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Create a corrupt-record error
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt(message.into())
    }
}

/// Why a download request was refused.
///
/// Every variant produces the same external behaviour; the distinction only
/// exists for tests and debug logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DownloadDenied {
    #[error("viewer is not a participant of the thread")]
    Unauthorized,

    #[error("attachment is not linked to a message in the thread")]
    NotLinked,

    #[error("record is not an attachment")]
    NotAttachment,

    #[error("attachment file is missing")]
    NotFound,
}

/// Why an upload would be refused by the configured policy
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadRejection {
    #[error("File name cannot be empty")]
    EmptyName,

    #[error("File has no extension")]
    MissingExtension,

    #[error("File type .{extension} is not allowed")]
    ExtensionNotAllowed { extension: String },

    #[error("File is too large ({size_bytes} bytes, max {max_size_mb} MB)")]
    TooLarge { size_bytes: u64, max_size_mb: u64 },
}
