use thiserror::Error;

/// Reasons a blob could not be decoded as a bundle.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("blob is too short to hold a bundle")]
    TooShort,

    #[error("blob does not start with the bundle magic")]
    BadMagic,

    #[error("unsupported bundle version {0}")]
    UnsupportedVersion(u8),

    #[error("bundle checksum mismatch")]
    ChecksumMismatch,

    #[error("bundle serialization error: {0}")]
    Serialization(String),
}

impl From<bincode::Error> for CodecError {
    fn from(err: bincode::Error) -> Self {
        CodecError::Serialization(err.to_string())
    }
}
