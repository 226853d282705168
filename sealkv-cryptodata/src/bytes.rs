//! Decrypting wrappers for byte-valued stores.
//!
//! Values are decrypted lazily: nothing is decrypted until a caller reads
//! `value()` or `prev_value()`, and every read decrypts afresh.
//!
//! Error visibility differs between call sites. [`BytesBrokerWrapper::get_value`]
//! returns decryption failures as
//! [`KeyvalError::Decryption`](sealkv_keyval::KeyvalError::Decryption). Record
//! accessors (listed pairs, watch responses) have no error channel, so a
//! failure there yields an empty value. Callers that must tell the two
//! apart should read through the broker.

use crate::context::{DecryptContext, decryption_error};
use sealkv_crypto::{ArbitraryDecrypter, DecryptFn};
use sealkv_keyval::{
    BytesBroker, BytesKeyVal, BytesKeyValIterator, BytesWatchCallback, BytesWatchResp,
    BytesWatcher, CloseReceiver, KeyVal, KeyvalResult, KvBytesPlugin, PutDel,
};
use std::sync::Arc;
use tracing::debug;

/// Wraps a [`KvBytesPlugin`] so that every broker and watcher it creates
/// decrypts values on read.
pub struct KvBytesPluginWrapper<P, D: ?Sized> {
    inner: P,
    ctx: DecryptContext<D>,
}

impl<P, D: ?Sized> KvBytesPluginWrapper<P, D> {
    pub fn new(inner: P, decrypter: Arc<D>, decrypt_fn: DecryptFn) -> Self {
        Self::from_context(inner, DecryptContext::new(decrypter, decrypt_fn))
    }

    pub fn from_context(inner: P, ctx: DecryptContext<D>) -> Self {
        Self { inner, ctx }
    }

    /// The wrapped plugin.
    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn context(&self) -> &DecryptContext<D> {
        &self.ctx
    }
}

impl<P, D> KvBytesPlugin for KvBytesPluginWrapper<P, D>
where
    P: KvBytesPlugin,
    D: ArbitraryDecrypter<Vec<u8>> + ?Sized + 'static,
{
    fn new_broker(&self, prefix: &str) -> Box<dyn BytesBroker> {
        debug!(prefix, "Creating decrypting broker");
        Box::new(BytesBrokerWrapper::new(
            self.inner.new_broker(prefix),
            self.ctx.clone(),
        ))
    }

    fn new_watcher(&self, prefix: &str) -> Box<dyn BytesWatcher> {
        debug!(prefix, "Creating decrypting watcher");
        Box::new(BytesWatcherWrapper::new(
            self.inner.new_watcher(prefix),
            self.ctx.clone(),
        ))
    }
}

/// Wraps a [`BytesBroker`], decrypting single values and listed records.
///
/// `get_value` reports decryption failures as errors, unlike the records
/// handed out by `list_values`.
pub struct BytesBrokerWrapper<D: ?Sized> {
    inner: Box<dyn BytesBroker>,
    ctx: DecryptContext<D>,
}

impl<D: ?Sized> BytesBrokerWrapper<D> {
    pub fn new(inner: Box<dyn BytesBroker>, ctx: DecryptContext<D>) -> Self {
        Self { inner, ctx }
    }
}

impl<D> BytesBroker for BytesBrokerWrapper<D>
where
    D: ArbitraryDecrypter<Vec<u8>> + ?Sized + 'static,
{
    fn put(&self, key: &str, data: &[u8]) -> KeyvalResult<()> {
        self.inner.put(key, data)
    }

    /// Misses and store errors are returned as they are; the decrypter only
    /// sees values that were found.
    fn get_value(&self, key: &str) -> KeyvalResult<Option<(Vec<u8>, i64)>> {
        let Some((data, revision)) = self.inner.get_value(key)? else {
            return Ok(None);
        };
        let plaintext = self.ctx.decrypt(data).map_err(decryption_error)?;
        Ok(Some((plaintext, revision)))
    }

    fn list_values(&self, prefix: &str) -> KeyvalResult<BytesKeyValIterator> {
        let records = self.inner.list_values(prefix)?;
        Ok(Box::new(BytesKeyValIteratorWrapper::new(
            records,
            self.ctx.clone(),
        )))
    }

    fn list_keys(&self, prefix: &str) -> KeyvalResult<Vec<String>> {
        self.inner.list_keys(prefix)
    }

    fn delete(&self, key: &str) -> KeyvalResult<bool> {
        self.inner.delete(key)
    }
}

/// Wraps a listing cursor; each yielded record is wrapped, not decrypted.
pub struct BytesKeyValIteratorWrapper<D: ?Sized> {
    inner: BytesKeyValIterator,
    ctx: DecryptContext<D>,
}

impl<D: ?Sized> BytesKeyValIteratorWrapper<D> {
    pub fn new(inner: BytesKeyValIterator, ctx: DecryptContext<D>) -> Self {
        Self { inner, ctx }
    }
}

impl<D> Iterator for BytesKeyValIteratorWrapper<D>
where
    D: ArbitraryDecrypter<Vec<u8>> + ?Sized + 'static,
{
    type Item = Box<dyn BytesKeyVal>;

    fn next(&mut self) -> Option<Self::Item> {
        let raw = self.inner.next()?;
        Some(Box::new(BytesKeyValWrapper::new(raw, self.ctx.clone())))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Wraps one record; `value()` and `prev_value()` decrypt on every call.
///
/// A value that fails to decrypt reads as empty and is logged at `debug`.
pub struct BytesKeyValWrapper<K: ?Sized, D: ?Sized> {
    inner: Box<K>,
    ctx: DecryptContext<D>,
}

impl<K: ?Sized, D: ?Sized> BytesKeyValWrapper<K, D> {
    pub fn new(inner: Box<K>, ctx: DecryptContext<D>) -> Self {
        Self { inner, ctx }
    }

    /// The raw record.
    pub fn inner(&self) -> &K {
        &self.inner
    }
}

impl<K, D> BytesKeyValWrapper<K, D>
where
    K: BytesKeyVal + ?Sized,
    D: ArbitraryDecrypter<Vec<u8>> + ?Sized,
{
    fn decrypt_or_empty(&self, raw: Vec<u8>, field: &'static str) -> Vec<u8> {
        match self.ctx.decrypt(raw) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                debug!(key = %self.inner.key(), field, error = %e, "Dropping value that failed to decrypt");
                Vec::new()
            }
        }
    }
}

impl<K, D> KeyVal for BytesKeyValWrapper<K, D>
where
    K: BytesKeyVal + ?Sized,
    D: ?Sized,
{
    fn key(&self) -> &str {
        self.inner.key()
    }

    fn revision(&self) -> i64 {
        self.inner.revision()
    }
}

impl<K, D> BytesKeyVal for BytesKeyValWrapper<K, D>
where
    K: BytesKeyVal + ?Sized,
    D: ArbitraryDecrypter<Vec<u8>> + ?Sized,
{
    fn value(&self) -> Vec<u8> {
        self.decrypt_or_empty(self.inner.value(), "value")
    }

    fn prev_value(&self) -> Vec<u8> {
        self.decrypt_or_empty(self.inner.prev_value(), "prev_value")
    }
}

/// Wraps a [`BytesWatcher`] so subscribers receive decrypting responses.
pub struct BytesWatcherWrapper<D: ?Sized> {
    inner: Box<dyn BytesWatcher>,
    ctx: DecryptContext<D>,
}

impl<D: ?Sized> BytesWatcherWrapper<D> {
    pub fn new(inner: Box<dyn BytesWatcher>, ctx: DecryptContext<D>) -> Self {
        Self { inner, ctx }
    }
}

impl<D> BytesWatcher for BytesWatcherWrapper<D>
where
    D: ArbitraryDecrypter<Vec<u8>> + ?Sized + 'static,
{
    /// The close channel goes to the wrapped watcher untouched.
    fn watch(
        &self,
        callback: BytesWatchCallback,
        close_rx: CloseReceiver,
        keys: &[&str],
    ) -> KeyvalResult<()> {
        let ctx = self.ctx.clone();
        self.inner.watch(
            Box::new(move |resp: Box<dyn BytesWatchResp>| {
                callback(Box::new(BytesWatchRespWrapper::new(resp, ctx.clone())));
            }),
            close_rx,
            keys,
        )
    }
}

/// Wraps one watch response. Values come from a composed
/// [`BytesKeyValWrapper`]; key, revision and change type pass through.
pub struct BytesWatchRespWrapper<D: ?Sized> {
    kv: BytesKeyValWrapper<dyn BytesWatchResp, D>,
}

impl<D: ?Sized> BytesWatchRespWrapper<D> {
    pub fn new(inner: Box<dyn BytesWatchResp>, ctx: DecryptContext<D>) -> Self {
        Self {
            kv: BytesKeyValWrapper::new(inner, ctx),
        }
    }
}

impl<D: ?Sized> KeyVal for BytesWatchRespWrapper<D> {
    fn key(&self) -> &str {
        self.kv.key()
    }

    fn revision(&self) -> i64 {
        self.kv.revision()
    }
}

impl<D> BytesKeyVal for BytesWatchRespWrapper<D>
where
    D: ArbitraryDecrypter<Vec<u8>> + ?Sized,
{
    fn value(&self) -> Vec<u8> {
        self.kv.value()
    }

    fn prev_value(&self) -> Vec<u8> {
        self.kv.prev_value()
    }
}

impl<D> BytesWatchResp for BytesWatchRespWrapper<D>
where
    D: ArbitraryDecrypter<Vec<u8>> + ?Sized,
{
    fn change_type(&self) -> PutDel {
        self.kv.inner().change_type()
    }
}
