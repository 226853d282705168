//! Structured-message store capabilities.
//!
//! Brokers deserialize stored values directly into a caller-supplied
//! message, so reads are generic over the message type.

use crate::error::KeyvalResult;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// A value that can be stored by a structured broker.
pub trait Message: Serialize + DeserializeOwned + Send {}

impl<T: Serialize + DeserializeOwned + Send> Message for T {}

/// Read/write client view of a store holding structured messages.
pub trait ProtoBroker: Send + Sync {
    /// Serializes `msg` and stores it under `key`.
    fn put<M: Message>(&self, key: &str, msg: &M) -> KeyvalResult<()>;

    /// Deserializes the value under `key` into `msg` and returns its
    /// modification revision. Returns `Ok(None)` and leaves `msg` untouched
    /// when the key does not exist.
    fn get_value<M: Message>(&self, key: &str, msg: &mut M) -> KeyvalResult<Option<i64>>;

    /// Returns every key starting with `prefix`.
    fn list_keys(&self, prefix: &str) -> KeyvalResult<Vec<String>>;

    /// Removes `key`. Returns whether something was removed.
    fn delete(&self, key: &str) -> KeyvalResult<bool>;
}

/// Factory for prefix-scoped structured brokers.
pub trait KvProtoPlugin: Send + Sync {
    type Broker: ProtoBroker;

    /// Returns a broker that prepends `prefix` to every key it is given.
    fn new_broker(&self, prefix: &str) -> Self::Broker;
}
