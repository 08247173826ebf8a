use thiserror::Error;

/// Errors raised by session persistence
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Write rejected: {0}")]
    WriteRejected(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Store version {found} is newer than requested version {requested}")]
    VersionMismatch { found: u32, requested: u32 },

    #[error("Cannot save a session without samples")]
    EmptySession,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
