//! In-memory BlobStore implementation for tests and embedding hosts.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::repository::{BlobStore, RepositoryError, Result};

/// In-memory implementation of BlobStore.
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with a single blob already present.
    pub fn with_blob(key: &str, bytes: Vec<u8>) -> Self {
        let mut blobs = HashMap::new();
        blobs.insert(key.to_string(), bytes);
        Self {
            blobs: RwLock::new(blobs),
        }
    }

    /// Number of stored blobs.
    pub fn len(&self) -> Result<usize> {
        let blobs = self
            .blobs
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(blobs.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl BlobStore for InMemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let blobs = self
            .blobs
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(blobs.get(key).cloned())
    }

    fn set(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        blobs.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        blobs.remove(key);
        Ok(())
    }
}
