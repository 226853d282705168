//! Keyring-backed crypto client.
//!
//! The client owns the key material; decorators only ever see the
//! [`DecryptFn`] it hands out.

use crate::cipher;
use crate::decrypter::DecryptFn;
use crate::error::{CryptoError, CryptoResult};
use crate::key::{DataKey, KdfParams, Salt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use zeroize::Zeroizing;

/// Configuration for [`CryptoClient`].
///
/// ```toml
/// key-files = ["/etc/sealkv/current.key", "/etc/sealkv/previous.key"]
///
/// [[passphrase-keys]]
/// passphrase-file = "/etc/sealkv/legacy.pass"
/// salt = "c2VhbGt2LXNhbHQtMDAwMQ=="
/// kdf = { memory-cost = 19456, time-cost = 2, parallelism = 1 }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ClientConfig {
    /// Files holding one base64 key each. The first is the primary key.
    pub key_files: Vec<PathBuf>,
    /// Keys derived from passphrases, appended to the keyring after the
    /// key files.
    pub passphrase_keys: Vec<PassphraseKey>,
}

/// A key derived with Argon2id from the first non-empty line of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PassphraseKey {
    pub passphrase_file: PathBuf,
    /// Base64-encoded salt.
    pub salt: String,
    #[serde(default)]
    pub kdf: KdfParams,
}

impl PassphraseKey {
    /// Reads the passphrase and derives the key.
    pub fn derive(&self) -> CryptoResult<DataKey> {
        let salt = Salt::from_base64(&self.salt)?;
        let passphrase = Zeroizing::new(first_line(&self.passphrase_file, "passphrase")?);
        DataKey::derive(&passphrase, &salt, &self.kdf)
    }
}

impl ClientConfig {
    /// Parses a TOML configuration.
    pub fn from_toml_str(text: &str) -> CryptoResult<Self> {
        toml::from_str(text).map_err(|e| CryptoError::Config(e.to_string()))
    }

    /// Reads and parses a TOML configuration file.
    pub fn load(path: &Path) -> CryptoResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

/// Encrypts with a primary key and decrypts with any key of its keyring.
pub struct CryptoClient {
    keys: Vec<DataKey>,
}

impl CryptoClient {
    /// Creates a client from a keyring. The first key is the primary key.
    pub fn new(keys: Vec<DataKey>) -> CryptoResult<Self> {
        if keys.is_empty() {
            return Err(CryptoError::NoKeys);
        }
        Ok(Self { keys })
    }

    /// Loads every configured key file, then derives every passphrase key.
    pub fn from_config(config: &ClientConfig) -> CryptoResult<Self> {
        let mut keys = config
            .key_files
            .iter()
            .map(|path| read_key_file(path))
            .collect::<CryptoResult<Vec<_>>>()?;
        for source in &config.passphrase_keys {
            keys.push(source.derive()?);
        }
        let client = Self::new(keys)?;
        info!(
            keys = client.key_count(),
            derived = config.passphrase_keys.len(),
            "Crypto client initialized"
        );
        Ok(client)
    }

    /// Number of keys in the keyring.
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Encrypts `plaintext` with the primary key.
    pub fn encrypt_data(&self, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        let primary = self.keys.first().ok_or(CryptoError::NoKeys)?;
        cipher::seal(primary, plaintext)
    }

    /// Decrypts `data` with the first key that opens it.
    pub fn decrypt_data(&self, data: &[u8]) -> CryptoResult<Vec<u8>> {
        let mut last_err = None;
        for (index, key) in self.keys.iter().enumerate() {
            match cipher::open(key, data) {
                Ok(plaintext) => {
                    if index > 0 {
                        debug!(key_index = index, "Decrypted with non-primary key");
                    }
                    return Ok(plaintext);
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or(CryptoError::NoKeys))
    }

    /// Returns a [`DecryptFn`] backed by this client.
    pub fn decrypt_fn(self: &Arc<Self>) -> DecryptFn {
        let client = Arc::clone(self);
        Arc::new(move |data: &[u8]| client.decrypt_data(data))
    }
}

impl std::fmt::Debug for CryptoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoClient")
            .field("keys", &self.keys.len())
            .finish()
    }
}

/// Reads the first non-empty line of `path` as a base64 key.
fn read_key_file(path: &Path) -> CryptoResult<DataKey> {
    let line = Zeroizing::new(first_line(path, "key")?);
    DataKey::from_base64(&line)
}

/// First non-empty trimmed line of `path`. `what` names the file in errors.
fn first_line(path: &Path, what: &str) -> CryptoResult<String> {
    let text = Zeroizing::new(std::fs::read_to_string(path).map_err(|e| {
        CryptoError::Config(format!("cannot read {what} file {}: {e}", path.display()))
    })?);
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| CryptoError::Config(format!("{what} file {} is empty", path.display())))
}
