//! Payload decrypters.
//!
//! A decrypter knows the shape of a payload and which parts of it are
//! encrypted; the actual cipher operation is supplied separately as a
//! [`DecryptFn`]. The same decrypter type can serve several payload shapes
//! by implementing [`ArbitraryDecrypter`] once per shape.

use crate::error::{CryptoError, CryptoResult};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::Value;
use std::sync::Arc;

/// Raw cipher operation: ciphertext in, plaintext out.
pub type DecryptFn = Arc<dyn Fn(&[u8]) -> CryptoResult<Vec<u8>> + Send + Sync>;

/// Prefix marking an encrypted string inside a JSON document.
pub const DEFAULT_PREFIX: &str = "$crypto$";

/// Decrypts payloads of shape `T`.
pub trait ArbitraryDecrypter<T>: Send + Sync {
    /// Whether `payload` carries anything this decrypter would decrypt.
    fn is_encrypted(&self, payload: &T) -> bool;

    /// Returns `payload` with its encrypted parts replaced by plaintext.
    fn decrypt(&self, payload: T, decrypt_fn: &DecryptFn) -> CryptoResult<T>;
}

/// Formats `ciphertext` as an encrypted JSON string value.
pub fn encode_encrypted_field(prefix: &str, ciphertext: &[u8]) -> String {
    format!("{prefix}{}", STANDARD.encode(ciphertext))
}

/// Decrypts individual string values of a JSON document.
///
/// Every string, at any depth, that starts with the prefix is treated as
/// base64 ciphertext following the prefix and is replaced by its UTF-8
/// plaintext. Other values are left as they are, so running the decrypter
/// over an already decrypted document changes nothing.
///
/// Byte payloads are re-serialized after decryption; object keys come out
/// in sorted order.
#[derive(Debug, Clone)]
pub struct JsonDecrypter {
    prefix: String,
}

impl Default for JsonDecrypter {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl JsonDecrypter {
    /// Creates a decrypter for strings marked with `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The marker prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn contains_encrypted(&self, value: &Value) -> bool {
        match value {
            Value::String(s) => s.starts_with(self.prefix.as_str()),
            Value::Array(items) => items.iter().any(|v| self.contains_encrypted(v)),
            Value::Object(map) => map.values().any(|v| self.contains_encrypted(v)),
            _ => false,
        }
    }

    fn decrypt_tree(&self, value: &mut Value, decrypt_fn: &DecryptFn) -> CryptoResult<()> {
        match value {
            Value::String(s) => {
                let Some(encoded) = s.strip_prefix(self.prefix.as_str()) else {
                    return Ok(());
                };
                let ciphertext = STANDARD.decode(encoded).map_err(|e| {
                    CryptoError::InvalidEncoding(format!("encrypted field is not base64: {e}"))
                })?;
                let plaintext = decrypt_fn(&ciphertext)?;
                *s = String::from_utf8(plaintext).map_err(|e| {
                    CryptoError::InvalidEncoding(format!("decrypted field is not UTF-8: {e}"))
                })?;
            }
            Value::Array(items) => {
                for item in items {
                    self.decrypt_tree(item, decrypt_fn)?;
                }
            }
            Value::Object(map) => {
                for item in map.values_mut() {
                    self.decrypt_tree(item, decrypt_fn)?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

impl ArbitraryDecrypter<Value> for JsonDecrypter {
    fn is_encrypted(&self, payload: &Value) -> bool {
        self.contains_encrypted(payload)
    }

    fn decrypt(&self, mut payload: Value, decrypt_fn: &DecryptFn) -> CryptoResult<Value> {
        self.decrypt_tree(&mut payload, decrypt_fn)?;
        Ok(payload)
    }
}

impl ArbitraryDecrypter<Vec<u8>> for JsonDecrypter {
    fn is_encrypted(&self, payload: &Vec<u8>) -> bool {
        serde_json::from_slice::<Value>(payload)
            .map(|v| self.contains_encrypted(&v))
            .unwrap_or(false)
    }

    fn decrypt(&self, payload: Vec<u8>, decrypt_fn: &DecryptFn) -> CryptoResult<Vec<u8>> {
        let mut value: Value = serde_json::from_slice(&payload)?;
        self.decrypt_tree(&mut value, decrypt_fn)?;
        Ok(serde_json::to_vec(&value)?)
    }
}

/// Treats a whole byte payload as one ciphertext.
///
/// Plaintext fed through it fails authentication, so wrapping a store twice
/// with an opaque decrypter makes reads fail rather than silently pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpaqueDecrypter;

impl ArbitraryDecrypter<Vec<u8>> for OpaqueDecrypter {
    fn is_encrypted(&self, payload: &Vec<u8>) -> bool {
        !payload.is_empty()
    }

    fn decrypt(&self, payload: Vec<u8>, decrypt_fn: &DecryptFn) -> CryptoResult<Vec<u8>> {
        decrypt_fn(&payload)
    }
}

/// No-op decrypter for tests and unencrypted stores.
/// Payloads pass through unchanged and `decrypt_fn` is never called.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughDecrypter;

impl<T> ArbitraryDecrypter<T> for PassthroughDecrypter {
    fn is_encrypted(&self, _payload: &T) -> bool {
        false
    }

    fn decrypt(&self, payload: T, _decrypt_fn: &DecryptFn) -> CryptoResult<T> {
        Ok(payload)
    }
}
