//! Storage Errors
//!
//! Every failure the store reports carries the engine's own diagnostic text,
//! so the shell can show the operator the original cause unmodified.

use thiserror::Error;

/// Errors reported by the [`Store`](super::Store) and its cursors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The directory, open mode or GC setting was rejected
    #[error("{0}")]
    ConfigurationFailed(String),

    /// The store could not be opened (corruption, permissions, lock held)
    #[error("{0}")]
    OpenFailed(String),

    /// A point lookup failed for a reason other than "not found"
    #[error("{0}")]
    LookupFailed(String),

    /// A cursor could not be created
    #[error("{0}")]
    CursorFailed(String),

    /// A write was attempted on a store opened read-only
    #[error("store is opened read-only")]
    ReadOnly,

    /// The store handle has already been closed
    #[error("store is closed")]
    Closed,

    /// Keys must not be empty
    #[error("invalid key: {0}")]
    InvalidKey(&'static str),

    /// I/O error while reading or writing the record log
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the storage module.
pub type StoreResult<T> = Result<T, StoreError>;
