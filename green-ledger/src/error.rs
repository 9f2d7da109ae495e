//! Error types for the credit ledger

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed, missing, or out-of-range input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced credit does not exist
    #[error("Credit not found: {0}")]
    CreditNotFound(String),

    /// Referenced identity does not exist
    #[error("Identity not found: {0}")]
    IdentityNotFound(String),

    /// Operation violates current-state invariants (e.g. retired credit)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Actor's role does not permit the requested mutation
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse error classification for transport shells
///
/// A transport maps each kind to a distinct response code instead of
/// collapsing every failure into a server error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Client supplied bad input
    Validation,
    /// Referenced record does not exist
    NotFound,
    /// Current state forbids the operation
    Conflict,
    /// Role does not permit the operation
    Authorization,
    /// Storage or internal failure
    Internal,
}

impl Error {
    /// Classify into the coarse taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::CreditNotFound(_) | Error::IdentityNotFound(_) => ErrorKind::NotFound,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::Authorization(_) => ErrorKind::Authorization,
            Error::Storage(_)
            | Error::Serialization(_)
            | Error::Concurrency(_)
            | Error::Config(_)
            | Error::Io(_) => ErrorKind::Internal,
        }
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}
