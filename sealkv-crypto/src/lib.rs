//! Decryption layer for SealKV.
//!
//! Provides the pieces the decrypting store decorators are built from:
//!
//! - [`DataKey`] and the ChaCha20-Poly1305 [`cipher`] functions
//! - [`CryptoClient`], a keyring that produces the [`DecryptFn`] used by
//!   the decorators and can encrypt values for writers
//! - [`ArbitraryDecrypter`] implementations that know which parts of a
//!   payload are encrypted: [`JsonDecrypter`] for prefix-marked JSON
//!   strings, [`OpaqueDecrypter`] for whole byte payloads
//!
//! # Example
//!
//! ```
//! use sealkv_crypto::{ArbitraryDecrypter, CryptoClient, DataKey, JsonDecrypter};
//! use sealkv_crypto::{encode_encrypted_field, DEFAULT_PREFIX};
//! use std::sync::Arc;
//!
//! let client = Arc::new(CryptoClient::new(vec![DataKey::generate()]).unwrap());
//! let secret = encode_encrypted_field(DEFAULT_PREFIX, &client.encrypt_data(b"s3cret").unwrap());
//! let stored = serde_json::to_vec(&serde_json::json!({ "password": secret })).unwrap();
//!
//! let plain = JsonDecrypter::default()
//!     .decrypt(stored, &client.decrypt_fn())
//!     .unwrap();
//! assert_eq!(plain, br#"{"password":"s3cret"}"#);
//! ```

pub mod cipher;
mod client;
mod decrypter;
mod error;
mod key;

pub use cipher::{EncryptedData, NONCE_SIZE, TAG_SIZE};
pub use client::{ClientConfig, CryptoClient, PassphraseKey};
pub use decrypter::{
    ArbitraryDecrypter, DEFAULT_PREFIX, DecryptFn, JsonDecrypter, OpaqueDecrypter,
    PassthroughDecrypter, encode_encrypted_field,
};
pub use error::{CryptoError, CryptoResult};
pub use key::{DataKey, KEY_SIZE, KdfParams, SALT_SIZE, Salt};
