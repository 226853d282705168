//! Error types for the decryption layer.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key derivation failed.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Encryption failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Decryption failed (wrong key, tampered or plaintext data).
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Payload is not in the expected encoding (base64, JSON, UTF-8).
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    /// The client has no keys to decrypt with.
    #[error("no decryption keys configured")]
    NoKeys,

    /// Invalid client configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Reading key or configuration files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
