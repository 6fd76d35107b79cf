//! Error taxonomy for allocation and persistence

use std::path::PathBuf;

/// Errors raised by the allocation engine.
///
/// Every variant is reported before any mutation takes place, so a caller
/// holding a `Dojo` can keep using it after any error.
#[derive(Debug, thiserror::Error)]
pub enum DojoError {
    /// Malformed request: unknown kind, blank name, staff asking for
    /// accommodation.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The target room has no free slot.
    #[error("{room} is already at full capacity")]
    Capacity { room: String },

    /// Unknown person id, unknown room, or a room the person may not use.
    #[error("not found: {0}")]
    NotFound(String),

    /// Reallocation into the room the person already occupies.
    #[error("{person} is already in {room}")]
    AlreadyAssigned { person: String, room: String },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Failures of the relational store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// File exists but does not start with the SQLite header.
    #[error("{0} is not a dojo database")]
    InvalidSignature(PathBuf),

    #[error("cannot write to {0}")]
    NotWritable(PathBuf),

    /// Rows that cannot be mapped back onto a consistent domain.
    #[error("corrupt store: {0}")]
    Corrupt(String),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = DojoError> = std::result::Result<T, E>;
