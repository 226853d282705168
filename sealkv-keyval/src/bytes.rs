//! Byte-payload store capabilities.
//!
//! Values are opaque byte vectors. An empty vector stands for an absent
//! value (for example the previous value of a freshly created key).

use crate::error::KeyvalResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

/// Common accessors of every record handed out by a store.
pub trait KeyVal {
    /// The record key, relative to the prefix of the broker/watcher that
    /// produced it.
    fn key(&self) -> &str;

    /// Store revision at which the record was last modified.
    fn revision(&self) -> i64;
}

/// A key-value record with byte payloads.
pub trait BytesKeyVal: KeyVal + Send {
    /// Current value.
    fn value(&self) -> Vec<u8>;

    /// Value before the most recent modification.
    fn prev_value(&self) -> Vec<u8>;
}

/// Kind of change delivered to a watch subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PutDel {
    /// The key was created or updated.
    Put,
    /// The key was removed.
    Delete,
}

/// A change notification for a byte-valued key.
pub trait BytesWatchResp: BytesKeyVal {
    /// Whether the change was a put or a delete.
    fn change_type(&self) -> PutDel;
}

/// Cursor over the records matching a listing.
pub type BytesKeyValIterator = Box<dyn Iterator<Item = Box<dyn BytesKeyVal>> + Send>;

/// Callback receiving watch notifications.
pub type BytesWatchCallback = Box<dyn Fn(Box<dyn BytesWatchResp>) + Send + Sync>;

/// Close channel of a watch subscription.
///
/// Sending a key stops watching that key; dropping the sender ends the
/// whole subscription.
pub type CloseReceiver = UnboundedReceiver<String>;

/// Read/write client view of a byte-valued store.
pub trait BytesBroker: Send + Sync {
    /// Stores `data` under `key`.
    fn put(&self, key: &str, data: &[u8]) -> KeyvalResult<()>;

    /// Retrieves the value under `key` and its modification revision.
    /// Returns `Ok(None)` when the key does not exist.
    fn get_value(&self, key: &str) -> KeyvalResult<Option<(Vec<u8>, i64)>>;

    /// Returns a cursor over every record whose key starts with `prefix`.
    fn list_values(&self, prefix: &str) -> KeyvalResult<BytesKeyValIterator>;

    /// Returns every key starting with `prefix`.
    fn list_keys(&self, prefix: &str) -> KeyvalResult<Vec<String>>;

    /// Removes `key`. Returns whether something was removed.
    fn delete(&self, key: &str) -> KeyvalResult<bool>;
}

/// Subscription view of a byte-valued store.
pub trait BytesWatcher: Send + Sync {
    /// Subscribes `callback` to changes of every key starting with one of
    /// `keys`. Events are delivered until `close_rx` says otherwise.
    fn watch(
        &self,
        callback: BytesWatchCallback,
        close_rx: CloseReceiver,
        keys: &[&str],
    ) -> KeyvalResult<()>;
}

/// Factory for prefix-scoped brokers and watchers.
pub trait KvBytesPlugin: Send + Sync {
    /// Returns a broker that prepends `prefix` to every key it is given.
    fn new_broker(&self, prefix: &str) -> Box<dyn BytesBroker>;

    /// Returns a watcher that prepends `prefix` to watched keys and strips it
    /// from the keys of delivered responses.
    fn new_watcher(&self, prefix: &str) -> Box<dyn BytesWatcher>;
}

impl<P: KvBytesPlugin + ?Sized> KvBytesPlugin for Box<P> {
    fn new_broker(&self, prefix: &str) -> Box<dyn BytesBroker> {
        (**self).new_broker(prefix)
    }

    fn new_watcher(&self, prefix: &str) -> Box<dyn BytesWatcher> {
        (**self).new_watcher(prefix)
    }
}

impl<P: KvBytesPlugin + ?Sized> KvBytesPlugin for Arc<P> {
    fn new_broker(&self, prefix: &str) -> Box<dyn BytesBroker> {
        (**self).new_broker(prefix)
    }

    fn new_watcher(&self, prefix: &str) -> Box<dyn BytesWatcher> {
        (**self).new_watcher(prefix)
    }
}

/// Plain record snapshot, the form stores hand out from listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KvRecord {
    pub key: String,
    pub value: Vec<u8>,
    pub prev_value: Vec<u8>,
    pub revision: i64,
}

impl KeyVal for KvRecord {
    fn key(&self) -> &str {
        &self.key
    }

    fn revision(&self) -> i64 {
        self.revision
    }
}

impl BytesKeyVal for KvRecord {
    fn value(&self) -> Vec<u8> {
        self.value.clone()
    }

    fn prev_value(&self) -> Vec<u8> {
        self.prev_value.clone()
    }
}

/// Plain change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub record: KvRecord,
    pub change_type: PutDel,
}

impl KeyVal for WatchEvent {
    fn key(&self) -> &str {
        &self.record.key
    }

    fn revision(&self) -> i64 {
        self.record.revision
    }
}

impl BytesKeyVal for WatchEvent {
    fn value(&self) -> Vec<u8> {
        self.record.value.clone()
    }

    fn prev_value(&self) -> Vec<u8> {
        self.record.prev_value.clone()
    }
}

impl BytesWatchResp for WatchEvent {
    fn change_type(&self) -> PutDel {
        self.change_type
    }
}
