//! Storage failures.

use thiserror::Error;

/// The single error kind the Storage engine can surface. The data model never distinguishes
/// *why* an I/O failed (disk full, permission denied, corruption…) — callers roll back and
/// log, they don't branch on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("storage I/O error: {0}")]
pub struct StorageError(pub String);

impl StorageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
