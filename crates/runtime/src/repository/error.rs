//! Error types raised by blob store implementations.

use thiserror::Error;

/// Errors surfaced by blob store implementations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("blob store lock was poisoned")]
    LockPoisoned,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid blob key: {0}")]
    InvalidKey(String),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
