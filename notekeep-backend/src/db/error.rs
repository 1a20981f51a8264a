//! Error kinds surfaced by the note store.

use thiserror::Error;

/// Failure inside the backing SQLite engine or its connection pool
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("connection pool: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("malformed timestamp {value:?}: {source}")]
    Timestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("database schema version {found} is newer than supported version {supported}")]
    UnsupportedSchema { found: i32, supported: i32 },

    #[error("search index out of sync: {0}")]
    SearchIndex(String),

    #[error("schema object {0} is missing or has the wrong type")]
    MissingSchemaObject(String),
}

#[derive(Debug, Error)]
pub enum NoteError {
    #[error("note {0} not found")]
    NotFound(i64),

    /// Carries the message shown to the caller
    #[error("{0}")]
    InvalidInput(String),

    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),
}

/// Coarse classification callers branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    Storage,
}

impl NoteError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NoteError::NotFound(_) => ErrorKind::NotFound,
            NoteError::InvalidInput(_) => ErrorKind::InvalidInput,
            NoteError::Storage(_) => ErrorKind::Storage,
        }
    }

    #[cfg(test)]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

impl From<rusqlite::Error> for NoteError {
    fn from(e: rusqlite::Error) -> Self {
        NoteError::Storage(StorageError::Sqlite(e))
    }
}

impl From<r2d2::Error> for NoteError {
    fn from(e: r2d2::Error) -> Self {
        NoteError::Storage(StorageError::Pool(e))
    }
}

pub type NoteResult<T> = Result<T, NoteError>;
