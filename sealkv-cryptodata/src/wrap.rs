//! Facades backed by a [`CryptoClient`].

use crate::bytes::KvBytesPluginWrapper;
use crate::proto::KvProtoPluginWrapper;
use sealkv_crypto::{ArbitraryDecrypter, CryptoClient};
use serde_json::Value;
use std::sync::Arc;

/// Wraps a byte-valued plugin so its values are decrypted with `client`.
pub fn wrap_kv_bytes_plugin<P, D>(
    client: &Arc<CryptoClient>,
    plugin: P,
    decrypter: D,
) -> KvBytesPluginWrapper<P, D>
where
    D: ArbitraryDecrypter<Vec<u8>>,
{
    KvBytesPluginWrapper::new(plugin, Arc::new(decrypter), client.decrypt_fn())
}

/// Wraps a structured plugin so its messages are decrypted with `client`.
pub fn wrap_kv_proto_plugin<P, D>(
    client: &Arc<CryptoClient>,
    plugin: P,
    decrypter: D,
) -> KvProtoPluginWrapper<P, D>
where
    D: ArbitraryDecrypter<Value>,
{
    KvProtoPluginWrapper::new(plugin, Arc::new(decrypter), client.decrypt_fn())
}
