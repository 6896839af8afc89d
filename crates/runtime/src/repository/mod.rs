//! Storage layer for bundle blobs.
//!
//! The host attaches an opaque blob to each portable item. The runtime
//! reaches it through [`BlobStore`]:
//! - [`InMemoryBlobStore`] for tests and hosts that keep metadata in memory
//! - [`FileBlobStore`] for one-file-per-key storage on disk

mod error;
mod file;
mod memory;
mod traits;

pub use error::{RepositoryError, Result};
pub use file::FileBlobStore;
pub use memory::InMemoryBlobStore;
pub use traits::BlobStore;
