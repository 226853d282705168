//! Transparent decryption for SealKV store clients.
//!
//! Every wrapper here implements the same `sealkv-keyval` trait as the value
//! it wraps, so code written against a plain store works unchanged against a
//! decrypting one. Writes, deletes and key listings are forwarded as they
//! are; only values read back are decrypted.
//!
//! ```
//! use sealkv_crypto::{CryptoClient, DataKey, OpaqueDecrypter};
//! use sealkv_cryptodata::wrap_kv_bytes_plugin;
//! use sealkv_keyval::{KvBytesPlugin, MemoryStore};
//! use std::sync::Arc;
//!
//! let client = Arc::new(CryptoClient::new(vec![DataKey::generate()]).unwrap());
//! let store = MemoryStore::new();
//! store
//!     .new_broker("/config/")
//!     .put("db", &client.encrypt_data(b"postgres://").unwrap())
//!     .unwrap();
//!
//! let plugin = wrap_kv_bytes_plugin(&client, store, OpaqueDecrypter);
//! let (value, _) = plugin.new_broker("/config/").get_value("db").unwrap().unwrap();
//! assert_eq!(value, b"postgres://");
//! ```

mod bytes;
mod context;
mod proto;
mod wrap;

pub use bytes::{
    BytesBrokerWrapper, BytesKeyValIteratorWrapper, BytesKeyValWrapper, BytesWatchRespWrapper,
    BytesWatcherWrapper, KvBytesPluginWrapper,
};
pub use context::DecryptContext;
pub use proto::{KvProtoPluginWrapper, ProtoBrokerWrapper};
pub use wrap::{wrap_kv_bytes_plugin, wrap_kv_proto_plugin};
