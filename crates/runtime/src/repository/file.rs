//! File-backed BlobStore implementation.

use std::fs;
use std::path::{Path, PathBuf};

use crate::repository::{BlobStore, RepositoryError, Result};

/// File-backed implementation of BlobStore.
///
/// Each key is stored as `{key}.bin` under the base directory. Writes go to
/// a temporary file first and are renamed into place.
pub struct FileBlobStore {
    base_dir: PathBuf,
}

impl FileBlobStore {
    /// Create a new store rooted at `base_dir`, creating the directory.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir).map_err(RepositoryError::Io)?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn blob_path(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(RepositoryError::InvalidKey(key.to_string()));
        }
        Ok(self.base_dir.join(format!("{}.bin", key)))
    }
}

impl BlobStore for FileBlobStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.blob_path(key)?;

        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&path).map_err(RepositoryError::Io)?;
        tracing::debug!("Loaded blob[{}] from {}", key, path.display());
        Ok(Some(bytes))
    }

    fn set(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.blob_path(key)?;
        let temp_path = path.with_extension("bin.tmp");

        fs::write(&temp_path, bytes).map_err(RepositoryError::Io)?;

        // Atomic rename
        fs::rename(&temp_path, &path).map_err(RepositoryError::Io)?;

        tracing::debug!("Saved blob[{}] to {}", key, path.display());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.blob_path(key)?;
        if path.exists() {
            fs::remove_file(&path).map_err(RepositoryError::Io)?;
            tracing::debug!("Removed blob[{}]", key);
        }
        Ok(())
    }
}
