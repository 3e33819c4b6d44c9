use thiserror::Error;

/// The common error type used by this crate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppDataStorageError {
    /// An error that occurs while encoding an entity or key
    #[error("Failed to encode: {0}")]
    EncodeFailed(String),

    /// An error that occurs while decoding an entity or key
    #[error("Failed to decode: {0}")]
    DecodeFailed(String),

    /// An error that occurs when working with a storage backend
    #[error("Storage backend error: {0}")]
    StorageBackend(String),

    /// A compare-and-swap was attempted against a stale edition
    #[error("Edition mismatch: expected {expected:?}, got {actual:?}")]
    EditionMismatch {
        /// The edition the writer expected to replace
        expected: Option<String>,
        /// The edition actually found in the backend
        actual: Option<String>,
    },

    /// A point operation was attempted with a key that names a collection
    #[error("Key {0} is partial and does not address a single entity")]
    PartialKey(String),

    /// A key could not be constructed or interpreted
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

impl AppDataStorageError {
    /// Whether retrying the operation against a fresh read may succeed
    pub fn is_conflict(&self) -> bool {
        matches!(self, AppDataStorageError::EditionMismatch { .. })
    }
}

impl From<serde_json::Error> for AppDataStorageError {
    fn from(error: serde_json::Error) -> Self {
        if error.is_data() || error.is_syntax() || error.is_eof() {
            AppDataStorageError::DecodeFailed(format!("{error}"))
        } else {
            AppDataStorageError::EncodeFailed(format!("{error}"))
        }
    }
}

impl From<std::io::Error> for AppDataStorageError {
    fn from(error: std::io::Error) -> Self {
        AppDataStorageError::StorageBackend(format!("{error}"))
    }
}
