//! Shared fakes for decorator tests.
//!
//! The fake cipher marks ciphertext with an `enc:` prefix so tests can build
//! "encrypted" payloads by hand and count every decrypt call.

#![allow(dead_code)]

use sealkv_crypto::{ArbitraryDecrypter, CryptoError, CryptoResult, DecryptFn};
use sealkv_keyval::{
    BytesBroker, BytesKeyValIterator, BytesWatchCallback, BytesWatcher, CloseReceiver,
    KeyvalError, KeyvalResult, KvBytesPlugin, KvProtoPlugin, KvRecord, Message, ProtoBroker,
    PutDel, WatchEvent,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const MARKER: &[u8] = b"enc:";

/// Fake ciphertext for `plaintext`.
pub fn enc(plaintext: &[u8]) -> Vec<u8> {
    [MARKER, plaintext].concat()
}

/// Opens [`enc`] output; anything else fails like a real cipher would.
pub fn fake_decrypt(data: &[u8]) -> CryptoResult<Vec<u8>> {
    data.strip_prefix(MARKER)
        .map(<[u8]>::to_vec)
        .ok_or_else(|| CryptoError::Decryption("missing marker".into()))
}

pub fn fake_decrypt_fn() -> DecryptFn {
    Arc::new(fake_decrypt)
}

/// Decrypter that counts calls before delegating.
pub struct Counting<D> {
    inner: D,
    calls: AtomicUsize,
}

impl<D> Counting<D> {
    pub fn new(inner: D) -> Arc<Self> {
        Arc::new(Self {
            inner,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<T, D: ArbitraryDecrypter<T>> ArbitraryDecrypter<T> for Counting<D> {
    fn is_encrypted(&self, payload: &T) -> bool {
        self.inner.is_encrypted(payload)
    }

    fn decrypt(&self, payload: T, decrypt_fn: &DecryptFn) -> CryptoResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.decrypt(payload, decrypt_fn)
    }
}

pub fn record(key: &str, value: Vec<u8>, prev_value: Vec<u8>, revision: i64) -> KvRecord {
    KvRecord {
        key: key.to_string(),
        value,
        prev_value,
        revision,
    }
}

pub fn backend_down() -> KeyvalError {
    KeyvalError::Store("backend down".into())
}

/// Operations seen by fakes, as `"op key"` strings.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Byte broker with canned records.
#[derive(Clone, Default)]
pub struct FakeBroker {
    pub records: Vec<KvRecord>,
    pub fail: bool,
    pub log: CallLog,
}

impl FakeBroker {
    pub fn with_records(records: Vec<KvRecord>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn note(&self, op: &str, key: &str) -> KeyvalResult<()> {
        self.log.lock().unwrap().push(format!("{op} {key}"));
        if self.fail {
            return Err(backend_down());
        }
        Ok(())
    }
}

impl BytesBroker for FakeBroker {
    fn put(&self, key: &str, data: &[u8]) -> KeyvalResult<()> {
        self.note("put", key)?;
        self.log
            .lock()
            .unwrap()
            .push(format!("data {}", String::from_utf8_lossy(data)));
        Ok(())
    }

    fn get_value(&self, key: &str) -> KeyvalResult<Option<(Vec<u8>, i64)>> {
        self.note("get", key)?;
        Ok(self
            .records
            .iter()
            .find(|r| r.key == key)
            .map(|r| (r.value.clone(), r.revision)))
    }

    fn list_values(&self, prefix: &str) -> KeyvalResult<BytesKeyValIterator> {
        self.note("list_values", prefix)?;
        let records: Vec<_> = self
            .records
            .iter()
            .filter(|r| r.key.starts_with(prefix))
            .cloned()
            .collect();
        Ok(Box::new(
            records
                .into_iter()
                .map(|r| -> Box<dyn sealkv_keyval::BytesKeyVal> { Box::new(r) }),
        ))
    }

    fn list_keys(&self, prefix: &str) -> KeyvalResult<Vec<String>> {
        self.note("list_keys", prefix)?;
        Ok(self
            .records
            .iter()
            .filter(|r| r.key.starts_with(prefix))
            .map(|r| r.key.clone())
            .collect())
    }

    fn delete(&self, key: &str) -> KeyvalResult<bool> {
        self.note("delete", key)?;
        Ok(self.records.iter().any(|r| r.key == key))
    }
}

/// Watcher that replays canned events as soon as a subscription arrives.
/// The close receiver is kept so tests can check it arrived untouched.
#[derive(Clone, Default)]
pub struct FakeWatcher {
    pub events: Vec<WatchEvent>,
    pub fail: bool,
    pub watched: Arc<Mutex<Vec<String>>>,
    pub close_rx: Arc<Mutex<Option<CloseReceiver>>>,
}

impl FakeWatcher {
    pub fn with_events(events: Vec<WatchEvent>) -> Self {
        Self {
            events,
            ..Self::default()
        }
    }
}

impl BytesWatcher for FakeWatcher {
    fn watch(
        &self,
        callback: BytesWatchCallback,
        close_rx: CloseReceiver,
        keys: &[&str],
    ) -> KeyvalResult<()> {
        if self.fail {
            return Err(backend_down());
        }
        self.watched
            .lock()
            .unwrap()
            .extend(keys.iter().map(|k| k.to_string()));
        *self.close_rx.lock().unwrap() = Some(close_rx);
        for event in &self.events {
            callback(Box::new(event.clone()));
        }
        Ok(())
    }
}

pub fn put_event(key: &str, value: Vec<u8>, prev_value: Vec<u8>, revision: i64) -> WatchEvent {
    WatchEvent {
        record: record(key, value, prev_value, revision),
        change_type: PutDel::Put,
    }
}

/// Plugin handing out clones of one fake broker and watcher, recording the
/// prefixes it was asked for.
#[derive(Clone, Default)]
pub struct FakePlugin {
    pub broker: FakeBroker,
    pub watcher: FakeWatcher,
    pub prefixes: Arc<Mutex<Vec<String>>>,
}

impl KvBytesPlugin for FakePlugin {
    fn new_broker(&self, prefix: &str) -> Box<dyn BytesBroker> {
        self.prefixes.lock().unwrap().push(format!("broker {prefix}"));
        Box::new(self.broker.clone())
    }

    fn new_watcher(&self, prefix: &str) -> Box<dyn BytesWatcher> {
        self.prefixes.lock().unwrap().push(format!("watcher {prefix}"));
        Box::new(self.watcher.clone())
    }
}

/// Structured broker over canned JSON documents.
#[derive(Clone, Default)]
pub struct FakeProtoBroker {
    pub docs: BTreeMap<String, (Value, i64)>,
    pub fail: bool,
    pub log: CallLog,
}

impl FakeProtoBroker {
    pub fn with_doc(key: &str, doc: Value, revision: i64) -> Self {
        let mut broker = Self::default();
        broker.docs.insert(key.to_string(), (doc, revision));
        broker
    }

    fn note(&self, op: &str, key: &str) -> KeyvalResult<()> {
        self.log.lock().unwrap().push(format!("{op} {key}"));
        if self.fail {
            return Err(backend_down());
        }
        Ok(())
    }
}

impl ProtoBroker for FakeProtoBroker {
    fn put<M: Message>(&self, key: &str, msg: &M) -> KeyvalResult<()> {
        self.note("put", key)?;
        let doc = serde_json::to_value(msg)?;
        self.log.lock().unwrap().push(format!("doc {doc}"));
        Ok(())
    }

    fn get_value<M: Message>(&self, key: &str, msg: &mut M) -> KeyvalResult<Option<i64>> {
        self.note("get", key)?;
        let Some((doc, revision)) = self.docs.get(key) else {
            return Ok(None);
        };
        *msg = serde_json::from_value(doc.clone())?;
        Ok(Some(*revision))
    }

    fn list_keys(&self, prefix: &str) -> KeyvalResult<Vec<String>> {
        self.note("list_keys", prefix)?;
        Ok(self
            .docs
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn delete(&self, key: &str) -> KeyvalResult<bool> {
        self.note("delete", key)?;
        Ok(self.docs.contains_key(key))
    }
}

#[derive(Clone, Default)]
pub struct FakeProtoPlugin {
    pub broker: FakeProtoBroker,
    pub prefixes: Arc<Mutex<Vec<String>>>,
}

impl KvProtoPlugin for FakeProtoPlugin {
    type Broker = FakeProtoBroker;

    fn new_broker(&self, prefix: &str) -> FakeProtoBroker {
        self.prefixes.lock().unwrap().push(prefix.to_string());
        self.broker.clone()
    }
}
