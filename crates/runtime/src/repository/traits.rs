//! The attached-metadata capability handed to the codec.

use crate::repository::Result;

/// Untyped key-value storage attached to one item instance.
///
/// The host runtime owns the real storage; the engine only ever sees this
/// trait, so persistence can be exercised without a live host.
pub trait BlobStore: Send + Sync {
    /// Read the blob stored under `key`.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `bytes` under `key`, replacing any previous blob.
    fn set(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Remove the blob under `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Check if a blob exists.
    fn contains(&self, key: &str) -> bool {
        matches!(self.get(key), Ok(Some(_)))
    }
}
