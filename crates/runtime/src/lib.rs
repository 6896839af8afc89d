//! Runtime glue for portable beacon bundles.
//!
//! This crate connects the pure rules in `beacon-core` and the loaders in
//! `beacon-content` to the storage a host provides. Hosts embed
//! [`BeaconEngine`] and hand it the [`BlobStore`] attached to each item.
//!
//! Modules are organized by responsibility:
//! - [`api`] exposes the error types downstream hosts interact with
//! - [`repository`] abstracts the attached-metadata storage
//! - [`codec`] encodes bundles into versioned blobs and migrates old ones
//! - [`recipes`] keeps the reloadable recipe table
//! - [`station`] and [`refresh`] implement the item flows behind [`engine`]
pub mod api;
pub mod codec;
pub mod engine;
pub mod recipes;
pub mod refresh;
pub mod repository;
pub mod station;

pub use api::{Result, RuntimeError};
pub use codec::{CodecError, PersistenceCodec};
pub use engine::BeaconEngine;
pub use recipes::{RecipeStore, RecipeStoreError, RecipeTable};
pub use refresh::refresh_bundle;
pub use repository::{BlobStore, FileBlobStore, InMemoryBlobStore, RepositoryError};
pub use station::{Station, StationOutcome};
