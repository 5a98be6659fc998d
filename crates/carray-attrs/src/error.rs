use std::path::PathBuf;

/// Errors from attribute store and metadata persistence operations.
#[derive(Debug, thiserror::Error)]
pub enum AttrError {
    /// The requested attribute does not exist.
    #[error("attribute not found: {key}")]
    KeyNotFound { key: String },

    /// Attribute names must be non-empty.
    #[error("attribute name must not be empty")]
    InvalidKey,

    /// The value cannot be represented in the metadata file.
    #[error("attribute {key} is not representable: {reason}")]
    NotRepresentable { key: String, reason: String },

    /// The metadata file exists but cannot be parsed.
    #[error("corrupt attribute metadata at {}: {reason}", path.display())]
    CorruptMetadata { path: PathBuf, reason: String },

    /// The metadata file was written by a newer schema.
    #[error("unsupported attribute metadata version {version} at {}", path.display())]
    UnsupportedVersion { path: PathBuf, version: u32 },

    /// I/O error from the underlying storage.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store was opened read-only.
    #[error("attribute store is read-only")]
    ReadOnly,
}

impl AttrError {
    pub(crate) fn key_not_found(key: &str) -> Self {
        Self::KeyNotFound {
            key: key.to_string(),
        }
    }
}

/// Result alias for attribute operations.
pub type AttrResult<T> = Result<T, AttrError>;
