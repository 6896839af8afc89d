//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from blob stores, the codec, the recipe store and rule
//! rejections so hosts can bubble them up with consistent context.
use beacon_core::Rejection;
use thiserror::Error;

pub use crate::codec::CodecError;
pub use crate::recipes::RecipeStoreError;
pub use crate::repository::RepositoryError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Recipes(#[from] RecipeStoreError),

    /// An expected rule violation; the message is meant for the player.
    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error("item does not carry a portable beacon")]
    NotABundle,

    #[error("engine configuration lock was poisoned")]
    ConfigLockPoisoned,
}
