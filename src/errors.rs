use std::fmt;

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Object missing from backend")]
    ObjectMissing,

    /// For downloads this means "temporarily unreachable", not "lost": the
    /// object may still exist at its recorded provider.
    #[error("No storage provider could complete the {0}")]
    AllProvidersUnavailable(StorageOp),

    #[error("Quota exceeded")]
    QuotaExceeded,

    #[error("Not found")]
    NotFound,

    #[error("Unknown user {0}")]
    UserNotFound(Uuid),

    #[error("Unknown storage provider: {0}")]
    UnknownProvider(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOp {
    Upload,
    Download,
    Delete,
}

impl fmt::Display for StorageOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageOp::Upload => "upload",
            StorageOp::Download => "download",
            StorageOp::Delete => "delete",
        };
        f.write_str(name)
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
