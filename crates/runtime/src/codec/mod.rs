//! Versioned blob encoding for bundles.
//!
//! # Blob Format
//!
//! ```text
//! b"PB" | version: u8 | bincode payload | (v3+) sha256(header + payload)[..8]
//! ```
//!
//! Decoding reads the version tag first and migrates older payloads up to
//! the current shape. Encoding always writes the current version.

mod error;
mod payload;

pub use error::CodecError;

use beacon_core::{CURRENT_SCHEMA_VERSION, EffectSet};
use sha2::{Digest, Sha256};

use crate::api::Result;
use crate::repository::BlobStore;
use payload::{PayloadV1, PayloadV2, PayloadV3};

const HEADER_LEN: usize = 3;
const CHECKSUM_LEN: usize = 8;

/// Reads and writes the bundle blob attached to an item.
pub struct PersistenceCodec;

impl PersistenceCodec {
    /// Metadata key the bundle blob is stored under.
    pub const STORAGE_KEY: &'static str = "portable_beacon";
    pub const MAGIC: [u8; 2] = *b"PB";

    /// Encodes `set` at the current version.
    pub fn encode(set: &EffectSet) -> std::result::Result<Vec<u8>, CodecError> {
        let payload = PayloadV3::from_effect_set(set);

        let mut bytes = Vec::with_capacity(64);
        bytes.extend_from_slice(&Self::MAGIC);
        bytes.push(CURRENT_SCHEMA_VERSION);
        bincode::serialize_into(&mut bytes, &payload)?;

        let digest = checksum(&bytes);
        bytes.extend_from_slice(&digest);
        Ok(bytes)
    }

    /// Decodes a blob of any supported version.
    ///
    /// The returned set carries the version it was read from in
    /// `schema_version`, so callers can tell migrated bundles apart.
    pub fn decode(bytes: &[u8]) -> std::result::Result<EffectSet, CodecError> {
        if bytes.len() < HEADER_LEN {
            return Err(CodecError::TooShort);
        }
        if bytes[..2] != Self::MAGIC {
            return Err(CodecError::BadMagic);
        }

        let version = bytes[2];
        let body = &bytes[HEADER_LEN..];

        let payload = match version {
            1 => PayloadV3::from(PayloadV2::from(bincode::deserialize::<PayloadV1>(body)?)),
            2 => PayloadV3::from(bincode::deserialize::<PayloadV2>(body)?),
            CURRENT_SCHEMA_VERSION => {
                let body = Self::verified_body(bytes)?;
                bincode::deserialize::<PayloadV3>(body)?
            }
            other => return Err(CodecError::UnsupportedVersion(other)),
        };

        Ok(payload.into_effect_set(version))
    }

    /// Reads the bundle attached to `store`.
    ///
    /// An absent blob and a blob that does not decode both yield `None`: an
    /// unreadable bundle is treated as no bundle at all.
    pub fn read(store: &dyn BlobStore) -> Result<Option<EffectSet>> {
        let Some(bytes) = store.get(Self::STORAGE_KEY)? else {
            return Ok(None);
        };

        match Self::decode(&bytes) {
            Ok(set) => {
                tracing::debug!(
                    "Decoded bundle v{} with {} effects",
                    set.schema_version,
                    set.len()
                );
                Ok(Some(set))
            }
            Err(err) => {
                tracing::warn!("Ignoring invalid bundle blob: {}", err);
                Ok(None)
            }
        }
    }

    /// Writes `set` to `store` at the current version.
    pub fn write(store: &dyn BlobStore, set: &EffectSet) -> Result<()> {
        let bytes = Self::encode(set)?;
        store.set(Self::STORAGE_KEY, &bytes)?;
        tracing::debug!("Saved bundle ({} bytes)", bytes.len());
        Ok(())
    }

    /// Detaches the bundle from `store`.
    pub fn clear(store: &dyn BlobStore) -> Result<()> {
        store.remove(Self::STORAGE_KEY)?;
        Ok(())
    }

    /// True when `store` carries a readable bundle.
    pub fn is_bundle(store: &dyn BlobStore) -> bool {
        matches!(Self::read(store), Ok(Some(_)))
    }

    fn verified_body(bytes: &[u8]) -> std::result::Result<&[u8], CodecError> {
        if bytes.len() < HEADER_LEN + CHECKSUM_LEN {
            return Err(CodecError::TooShort);
        }
        let (signed, trailer) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
        if checksum(signed) != trailer {
            return Err(CodecError::ChecksumMismatch);
        }
        Ok(&signed[HEADER_LEN..])
    }
}

fn checksum(bytes: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = Sha256::digest(bytes);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[..CHECKSUM_LEN]);
    out
}
