//! Key-value store capabilities for SealKV.
//!
//! Defines the client-side view of a key-value store that the decrypting
//! decorators wrap, plus an in-memory implementation.
//!
//! # Architecture
//!
//! - Byte-valued stores: [`BytesBroker`] for point reads, listings and
//!   writes, [`BytesWatcher`] for change subscriptions, both produced per key
//!   prefix by a [`KvBytesPlugin`]
//! - Structured stores: [`ProtoBroker`] deserializes stored values into a
//!   caller-supplied [`Message`], produced by a [`KvProtoPlugin`]
//! - [`mem::MemoryStore`] implements both with prefix scoping, revisions and
//!   synchronous watch delivery

mod bytes;
mod error;
pub mod mem;
mod proto;

pub use bytes::{
    BytesBroker, BytesKeyVal, BytesKeyValIterator, BytesWatchCallback, BytesWatchResp,
    BytesWatcher, CloseReceiver, KeyVal, KvBytesPlugin, KvRecord, PutDel, WatchEvent,
};
pub use error::{KeyvalError, KeyvalResult};
pub use mem::{MemoryProtoStore, MemoryStore};
pub use proto::{KvProtoPlugin, Message, ProtoBroker};

/// Prefix that leaves keys unchanged.
pub const ROOT: &str = "";
