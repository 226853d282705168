//! In-memory store.
//!
//! Keeps every key in a sorted map together with its previous value and
//! modification revision.
//!
//! Watch events are queued in revision order while the write holds the state
//! lock, then delivered by the writing thread. Only one thread drains the
//! queue at a time. A write made while events are being delivered, whether
//! from inside a callback or from another thread, returns right away and its
//! events are delivered by the thread already draining.

use crate::bytes::{
    BytesBroker, BytesKeyVal, BytesKeyValIterator, BytesWatchCallback, BytesWatchResp,
    BytesWatcher, CloseReceiver, KvBytesPlugin, KvRecord, PutDel, WatchEvent,
};
use crate::error::{KeyvalError, KeyvalResult};
use crate::proto::{KvProtoPlugin, Message, ProtoBroker};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, warn};

type SharedCallback = Arc<dyn Fn(Box<dyn BytesWatchResp>) + Send + Sync>;

type Delivery = (SharedCallback, WatchEvent);

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    prev_value: Vec<u8>,
    mod_revision: i64,
}

#[derive(Default)]
struct State {
    revision: i64,
    entries: BTreeMap<String, Entry>,
}

struct Subscription {
    id: u64,
    prefix: String,
    keys: Vec<String>,
    callback: SharedCallback,
    close_rx: CloseReceiver,
}

impl Subscription {
    /// Applies pending close requests. Returns false once nothing is left
    /// to watch.
    fn drain_close(&mut self) -> bool {
        loop {
            match self.close_rx.try_recv() {
                Ok(key) => {
                    let full = format!("{}{}", self.prefix, key);
                    self.keys.retain(|k| *k != full);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
        !self.keys.is_empty()
    }

    fn matches(&self, key: &str) -> bool {
        self.keys.iter().any(|k| key.starts_with(k.as_str()))
    }
}

#[derive(Default)]
struct DeliveryQueue {
    pending: VecDeque<Delivery>,
    draining: bool,
}

/// Clears the draining flag if a callback panics mid-delivery.
struct DrainGuard<'a> {
    queue: &'a Mutex<DeliveryQueue>,
    armed: bool,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            if let Ok(mut queue) = self.queue.lock() {
                queue.draining = false;
            }
        }
    }
}

// Lock order: state, then subscriptions, then deliveries.
#[derive(Default)]
struct Inner {
    state: RwLock<State>,
    subscriptions: Mutex<Vec<Subscription>>,
    deliveries: Mutex<DeliveryQueue>,
    next_subscription: AtomicU64,
}

/// Handle to an in-memory store. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    /// Creates an empty store at revision 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Structured-message view sharing this store's data.
    pub fn proto(&self) -> MemoryProtoStore {
        MemoryProtoStore {
            store: self.clone(),
        }
    }

    /// Latest revision handed out by a write.
    pub fn revision(&self) -> KeyvalResult<i64> {
        Ok(self.read_state()?.revision)
    }

    fn read_state(&self) -> KeyvalResult<std::sync::RwLockReadGuard<'_, State>> {
        self.inner
            .state
            .read()
            .map_err(|_| KeyvalError::Store("state lock poisoned".into()))
    }

    fn write_state(&self) -> KeyvalResult<std::sync::RwLockWriteGuard<'_, State>> {
        self.inner
            .state
            .write()
            .map_err(|_| KeyvalError::Store("state lock poisoned".into()))
    }

    fn put_raw(&self, key: String, data: &[u8]) -> KeyvalResult<()> {
        {
            let mut state = self.write_state()?;
            state.revision += 1;
            let revision = state.revision;
            let prev_value = state
                .entries
                .get(&key)
                .map(|e| e.value.clone())
                .unwrap_or_default();
            state.entries.insert(
                key.clone(),
                Entry {
                    value: data.to_vec(),
                    prev_value: prev_value.clone(),
                    mod_revision: revision,
                },
            );
            let record = KvRecord {
                key,
                value: data.to_vec(),
                prev_value,
                revision,
            };
            self.enqueue(record, PutDel::Put);
        }
        self.dispatch();
        Ok(())
    }

    fn get_raw(&self, key: &str) -> KeyvalResult<Option<(Vec<u8>, i64)>> {
        let state = self.read_state()?;
        Ok(state
            .entries
            .get(key)
            .map(|e| (e.value.clone(), e.mod_revision)))
    }

    fn delete_raw(&self, key: &str) -> KeyvalResult<bool> {
        {
            let mut state = self.write_state()?;
            let Some(old) = state.entries.remove(key) else {
                return Ok(false);
            };
            state.revision += 1;
            let record = KvRecord {
                key: key.to_string(),
                value: Vec::new(),
                prev_value: old.value,
                revision: state.revision,
            };
            self.enqueue(record, PutDel::Delete);
        }
        self.dispatch();
        Ok(true)
    }

    /// Snapshot of `(full key, entry)` pairs under `prefix`, in key order.
    fn scan(&self, prefix: &str) -> KeyvalResult<Vec<(String, Entry)>> {
        let state = self.read_state()?;
        Ok(state
            .entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, e)| (k.clone(), e.clone()))
            .collect())
    }

    fn subscribe(
        &self,
        prefix: &str,
        callback: BytesWatchCallback,
        close_rx: CloseReceiver,
        keys: &[&str],
    ) -> KeyvalResult<()> {
        let id = self.inner.next_subscription.fetch_add(1, Ordering::Relaxed);
        let keys: Vec<String> = keys.iter().map(|k| format!("{prefix}{k}")).collect();
        debug!(subscription = id, keys = ?keys, "Watch subscription registered");
        let mut subs = self
            .inner
            .subscriptions
            .lock()
            .map_err(|_| KeyvalError::Store("subscription lock poisoned".into()))?;
        subs.push(Subscription {
            id,
            prefix: prefix.to_string(),
            keys,
            callback: Arc::from(callback),
            close_rx,
        });
        Ok(())
    }

    /// Queues one event per matching subscription. Must be called with the
    /// state write lock held so the queue follows revision order.
    ///
    /// The write is already committed at this point, so a poisoned lock
    /// drops the events with a warning instead of failing the write.
    fn enqueue(&self, record: KvRecord, change_type: PutDel) {
        let Ok(mut subs) = self.inner.subscriptions.lock() else {
            warn!(
                key = %record.key,
                revision = record.revision,
                "Subscription lock poisoned, watch event dropped"
            );
            return;
        };
        subs.retain_mut(|sub| {
            let open = sub.drain_close();
            if !open {
                debug!(subscription = sub.id, "Watch subscription closed");
            }
            open
        });
        let deliveries = subs
            .iter()
            .filter(|sub| sub.matches(&record.key))
            .map(|sub| {
                let key = record
                    .key
                    .strip_prefix(sub.prefix.as_str())
                    .unwrap_or(&record.key)
                    .to_string();
                let event = WatchEvent {
                    record: KvRecord {
                        key,
                        ..record.clone()
                    },
                    change_type,
                };
                (Arc::clone(&sub.callback), event)
            });

        let Ok(mut queue) = self.inner.deliveries.lock() else {
            warn!(
                key = %record.key,
                revision = record.revision,
                "Delivery queue poisoned, watch event dropped"
            );
            return;
        };
        queue.pending.extend(deliveries);
    }

    /// Delivers queued events in order unless another caller is already
    /// draining. Callbacks run without any store lock held.
    fn dispatch(&self) {
        match self.inner.deliveries.lock() {
            Ok(mut queue) if !queue.draining => queue.draining = true,
            Ok(_) => return,
            Err(_) => {
                warn!("Delivery queue poisoned, watch events not delivered");
                return;
            }
        }

        let mut guard = DrainGuard {
            queue: &self.inner.deliveries,
            armed: true,
        };
        loop {
            let next = match self.inner.deliveries.lock() {
                Ok(mut queue) => {
                    let next = queue.pending.pop_front();
                    // Cleared under the same lock as the empty pop, so a
                    // concurrent enqueue either lands before it or drains itself.
                    if next.is_none() {
                        queue.draining = false;
                        guard.armed = false;
                    }
                    next
                }
                Err(_) => {
                    warn!("Delivery queue poisoned, watch events not delivered");
                    guard.armed = false;
                    return;
                }
            };
            let Some((callback, event)) = next else {
                return;
            };
            callback(Box::new(event));
        }
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

fn strip(prefix: &str, key: String) -> String {
    match key.strip_prefix(prefix) {
        Some(rest) => rest.to_string(),
        None => key,
    }
}

/// Byte broker over a [`MemoryStore`], scoped to a key prefix.
#[derive(Debug, Clone)]
pub struct MemoryBroker {
    store: MemoryStore,
    prefix: String,
}

impl BytesBroker for MemoryBroker {
    fn put(&self, key: &str, data: &[u8]) -> KeyvalResult<()> {
        self.store.put_raw(format!("{}{}", self.prefix, key), data)
    }

    fn get_value(&self, key: &str) -> KeyvalResult<Option<(Vec<u8>, i64)>> {
        self.store.get_raw(&format!("{}{}", self.prefix, key))
    }

    fn list_values(&self, prefix: &str) -> KeyvalResult<BytesKeyValIterator> {
        let scope = self.prefix.clone();
        let records = self
            .store
            .scan(&format!("{}{}", self.prefix, prefix))?
            .into_iter()
            .map(move |(key, entry)| -> Box<dyn BytesKeyVal> {
                Box::new(KvRecord {
                    key: strip(&scope, key),
                    value: entry.value,
                    prev_value: entry.prev_value,
                    revision: entry.mod_revision,
                })
            });
        Ok(Box::new(records))
    }

    fn list_keys(&self, prefix: &str) -> KeyvalResult<Vec<String>> {
        Ok(self
            .store
            .scan(&format!("{}{}", self.prefix, prefix))?
            .into_iter()
            .map(|(key, _)| strip(&self.prefix, key))
            .collect())
    }

    fn delete(&self, key: &str) -> KeyvalResult<bool> {
        self.store.delete_raw(&format!("{}{}", self.prefix, key))
    }
}

/// Watcher over a [`MemoryStore`], scoped to a key prefix.
#[derive(Debug, Clone)]
pub struct MemoryWatcher {
    store: MemoryStore,
    prefix: String,
}

impl BytesWatcher for MemoryWatcher {
    fn watch(
        &self,
        callback: BytesWatchCallback,
        close_rx: CloseReceiver,
        keys: &[&str],
    ) -> KeyvalResult<()> {
        self.store.subscribe(&self.prefix, callback, close_rx, keys)
    }
}

/// Structured broker over a [`MemoryStore`]; messages are stored as JSON.
#[derive(Debug, Clone)]
pub struct MemoryProtoBroker {
    store: MemoryStore,
    prefix: String,
}

impl ProtoBroker for MemoryProtoBroker {
    fn put<M: Message>(&self, key: &str, msg: &M) -> KeyvalResult<()> {
        let data = serde_json::to_vec(msg)?;
        self.store.put_raw(format!("{}{}", self.prefix, key), &data)
    }

    fn get_value<M: Message>(&self, key: &str, msg: &mut M) -> KeyvalResult<Option<i64>> {
        let Some((data, revision)) = self.store.get_raw(&format!("{}{}", self.prefix, key))?
        else {
            return Ok(None);
        };
        *msg = serde_json::from_slice(&data)?;
        Ok(Some(revision))
    }

    fn list_keys(&self, prefix: &str) -> KeyvalResult<Vec<String>> {
        Ok(self
            .store
            .scan(&format!("{}{}", self.prefix, prefix))?
            .into_iter()
            .map(|(key, _)| strip(&self.prefix, key))
            .collect())
    }

    fn delete(&self, key: &str) -> KeyvalResult<bool> {
        self.store.delete_raw(&format!("{}{}", self.prefix, key))
    }
}

impl KvBytesPlugin for MemoryStore {
    fn new_broker(&self, prefix: &str) -> Box<dyn BytesBroker> {
        Box::new(MemoryBroker {
            store: self.clone(),
            prefix: prefix.to_string(),
        })
    }

    fn new_watcher(&self, prefix: &str) -> Box<dyn BytesWatcher> {
        Box::new(MemoryWatcher {
            store: self.clone(),
            prefix: prefix.to_string(),
        })
    }
}

/// Structured-message plugin over a [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct MemoryProtoStore {
    store: MemoryStore,
}

impl KvProtoPlugin for MemoryProtoStore {
    type Broker = MemoryProtoBroker;

    fn new_broker(&self, prefix: &str) -> MemoryProtoBroker {
        MemoryProtoBroker {
            store: self.store.clone(),
            prefix: prefix.to_string(),
        }
    }
}
