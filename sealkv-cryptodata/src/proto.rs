//! Decrypting wrappers for structured-message stores.
//!
//! The wrapped broker deserializes the stored value into the caller's
//! message as usual. The wrapper then projects that message into a JSON
//! tree, lets the decrypter replace encrypted fields, and deserializes the
//! result back over the caller's message.

use crate::context::{DecryptContext, decryption_error};
use sealkv_crypto::{ArbitraryDecrypter, DecryptFn};
use sealkv_keyval::{KeyvalResult, KvProtoPlugin, Message, ProtoBroker};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Wraps a [`KvProtoPlugin`] so that every broker it creates decrypts
/// messages on read.
pub struct KvProtoPluginWrapper<P, D: ?Sized> {
    inner: P,
    ctx: DecryptContext<D>,
}

impl<P, D: ?Sized> KvProtoPluginWrapper<P, D> {
    pub fn new(inner: P, decrypter: Arc<D>, decrypt_fn: DecryptFn) -> Self {
        Self::from_context(inner, DecryptContext::new(decrypter, decrypt_fn))
    }

    pub fn from_context(inner: P, ctx: DecryptContext<D>) -> Self {
        Self { inner, ctx }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn context(&self) -> &DecryptContext<D> {
        &self.ctx
    }
}

impl<P, D> KvProtoPlugin for KvProtoPluginWrapper<P, D>
where
    P: KvProtoPlugin,
    D: ArbitraryDecrypter<Value> + ?Sized,
{
    type Broker = ProtoBrokerWrapper<P::Broker, D>;

    fn new_broker(&self, prefix: &str) -> Self::Broker {
        debug!(prefix, "Creating decrypting message broker");
        ProtoBrokerWrapper::new(self.inner.new_broker(prefix), self.ctx.clone())
    }
}

/// Wraps a [`ProtoBroker`], decrypting messages returned by `get_value`.
pub struct ProtoBrokerWrapper<B, D: ?Sized> {
    inner: B,
    ctx: DecryptContext<D>,
}

impl<B, D: ?Sized> ProtoBrokerWrapper<B, D> {
    pub fn new(inner: B, ctx: DecryptContext<D>) -> Self {
        Self { inner, ctx }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }
}

impl<B, D> ProtoBroker for ProtoBrokerWrapper<B, D>
where
    B: ProtoBroker,
    D: ArbitraryDecrypter<Value> + ?Sized,
{
    fn put<M: Message>(&self, key: &str, msg: &M) -> KeyvalResult<()> {
        self.inner.put(key, msg)
    }

    /// On a miss `msg` is left as the wrapped broker left it and nothing is
    /// decrypted. On a decryption failure `msg` keeps the still-encrypted
    /// content the wrapped broker wrote into it.
    fn get_value<M: Message>(&self, key: &str, msg: &mut M) -> KeyvalResult<Option<i64>> {
        let Some(revision) = self.inner.get_value(key, msg)? else {
            return Ok(None);
        };
        let tree = serde_json::to_value(&*msg)?;
        let plain = self.ctx.decrypt(tree).map_err(decryption_error)?;
        *msg = serde_json::from_value(plain)?;
        Ok(Some(revision))
    }

    fn list_keys(&self, prefix: &str) -> KeyvalResult<Vec<String>> {
        self.inner.list_keys(prefix)
    }

    fn delete(&self, key: &str) -> KeyvalResult<bool> {
        self.inner.delete(key)
    }
}
