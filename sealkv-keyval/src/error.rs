//! Error types for the key-value layer.

use thiserror::Error;

/// Result type for key-value operations.
pub type KeyvalResult<T> = Result<T, KeyvalError>;

/// Errors that can occur in key-value operations.
///
/// A missing key is not an error: reads report it as `Ok(None)`.
#[derive(Debug, Error)]
pub enum KeyvalError {
    /// Failure reported by the backing store.
    #[error("store error: {0}")]
    Store(String),

    /// Serialization/deserialization of a structured value.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A value was read but could not be decrypted.
    #[error("decryption error: {0}")]
    Decryption(String),
}
