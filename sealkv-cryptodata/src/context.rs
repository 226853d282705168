//! Decryption context shared by every wrapper spawned from one facade.

use sealkv_crypto::{ArbitraryDecrypter, CryptoError, CryptoResult, DecryptFn};
use sealkv_keyval::KeyvalError;
use std::sync::Arc;

/// Decrypter plus the cipher operation it feeds encrypted parts through.
///
/// Immutable after construction. Cloning copies two `Arc`s, so every broker,
/// watcher, iterator and record derived from one facade shares the same
/// context without locking.
pub struct DecryptContext<D: ?Sized> {
    decrypter: Arc<D>,
    decrypt_fn: DecryptFn,
}

impl<D: ?Sized> DecryptContext<D> {
    pub fn new(decrypter: Arc<D>, decrypt_fn: DecryptFn) -> Self {
        Self {
            decrypter,
            decrypt_fn,
        }
    }

    pub fn decrypter(&self) -> &D {
        &self.decrypter
    }

    pub fn decrypt_fn(&self) -> &DecryptFn {
        &self.decrypt_fn
    }

    /// Runs `payload` through the decrypter.
    pub fn decrypt<T>(&self, payload: T) -> CryptoResult<T>
    where
        D: ArbitraryDecrypter<T>,
    {
        self.decrypter.decrypt(payload, &self.decrypt_fn)
    }
}

impl<D: ?Sized> Clone for DecryptContext<D> {
    fn clone(&self) -> Self {
        Self {
            decrypter: Arc::clone(&self.decrypter),
            decrypt_fn: Arc::clone(&self.decrypt_fn),
        }
    }
}

impl<D: ?Sized> std::fmt::Debug for DecryptContext<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecryptContext")
            .field("decrypter", &std::any::type_name::<D>())
            .finish_non_exhaustive()
    }
}

pub(crate) fn decryption_error(e: CryptoError) -> KeyvalError {
    KeyvalError::Decryption(e.to_string())
}
