use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{ClientError, ClientResult};
use crate::options::ClientOptions;
use crate::traits::{Connector, KeyType, StoreClient};

#[derive(Clone, Debug)]
enum Entry {
    Str(String),
    Set(HashSet<String>),
}

/// In-memory keyspace with the reply semantics of a remote store.
///
/// Intended for tests and embedding. Values are either strings or sets, held
/// behind a `RwLock`. Every command is counted so callers can assert that an
/// operation did or did not reach the store.
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
    commands: AtomicU64,
    offline: AtomicBool,
}

impl InMemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            commands: AtomicU64::new(0),
            offline: AtomicBool::new(false),
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    /// Returns `true` if no key is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().expect("lock poisoned").is_empty()
    }

    /// Remove every key.
    pub fn clear(&self) {
        self.entries.write().expect("lock poisoned").clear();
    }

    /// Sorted list of all keys.
    pub fn keys(&self) -> Vec<String> {
        let map = self.entries.read().expect("lock poisoned");
        let mut keys: Vec<String> = map.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of commands served since creation.
    pub fn commands_served(&self) -> u64 {
        self.commands.load(Ordering::SeqCst)
    }

    /// While offline every command fails with `ConnectionLost`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn begin(&self) -> ClientResult<()> {
        self.commands.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(ClientError::ConnectionLost("store is offline".into()));
        }
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("key_count", &self.len())
            .field("commands_served", &self.commands_served())
            .finish()
    }
}

#[async_trait]
impl StoreClient for InMemoryStore {
    async fn get(&self, key: &str) -> ClientResult<Option<String>> {
        self.begin()?;
        let map = self.entries.read().expect("lock poisoned");
        match map.get(key) {
            None => Ok(None),
            Some(Entry::Str(value)) => Ok(Some(value.clone())),
            Some(Entry::Set(_)) => Err(ClientError::wrong_type()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        self.begin()?;
        let mut map = self.entries.write().expect("lock poisoned");
        map.insert(key.to_string(), Entry::Str(value.to_string()));
        Ok(())
    }

    async fn del(&self, key: &str) -> ClientResult<u64> {
        self.begin()?;
        let mut map = self.entries.write().expect("lock poisoned");
        Ok(u64::from(map.remove(key).is_some()))
    }

    async fn exists(&self, key: &str) -> ClientResult<bool> {
        self.begin()?;
        let map = self.entries.read().expect("lock poisoned");
        Ok(map.contains_key(key))
    }

    async fn key_type(&self, key: &str) -> ClientResult<KeyType> {
        self.begin()?;
        let map = self.entries.read().expect("lock poisoned");
        Ok(match map.get(key) {
            None => KeyType::None,
            Some(Entry::Str(_)) => KeyType::String,
            Some(Entry::Set(_)) => KeyType::Set,
        })
    }

    async fn sadd(&self, key: &str, member: &str) -> ClientResult<u64> {
        self.begin()?;
        let mut map = self.entries.write().expect("lock poisoned");
        let entry = map
            .entry(key.to_string())
            .or_insert_with(|| Entry::Set(HashSet::new()));
        match entry {
            Entry::Set(members) => Ok(u64::from(members.insert(member.to_string()))),
            Entry::Str(_) => Err(ClientError::wrong_type()),
        }
    }

    async fn srem(&self, key: &str, member: &str) -> ClientResult<u64> {
        self.begin()?;
        let mut map = self.entries.write().expect("lock poisoned");
        let (removed, now_empty) = match map.get_mut(key) {
            None => return Ok(0),
            Some(Entry::Str(_)) => return Err(ClientError::wrong_type()),
            Some(Entry::Set(members)) => (members.remove(member), members.is_empty()),
        };
        // A set with no members does not exist.
        if now_empty {
            map.remove(key);
        }
        Ok(u64::from(removed))
    }

    async fn sismember(&self, key: &str, member: &str) -> ClientResult<bool> {
        self.begin()?;
        let map = self.entries.read().expect("lock poisoned");
        match map.get(key) {
            None => Ok(false),
            Some(Entry::Set(members)) => Ok(members.contains(member)),
            Some(Entry::Str(_)) => Err(ClientError::wrong_type()),
        }
    }

    async fn smembers(&self, key: &str) -> ClientResult<Vec<String>> {
        self.begin()?;
        let map = self.entries.read().expect("lock poisoned");
        match map.get(key) {
            None => Ok(Vec::new()),
            Some(Entry::Set(members)) => Ok(members.iter().cloned().collect()),
            Some(Entry::Str(_)) => Err(ClientError::wrong_type()),
        }
    }

    async fn scard(&self, key: &str) -> ClientResult<u64> {
        self.begin()?;
        let map = self.entries.read().expect("lock poisoned");
        match map.get(key) {
            None => Ok(0),
            Some(Entry::Set(members)) => Ok(members.len() as u64),
            Some(Entry::Str(_)) => Err(ClientError::wrong_type()),
        }
    }

    async fn ping(&self) -> ClientResult<()> {
        self.begin()
    }

    async fn quit(&self) -> ClientResult<()> {
        self.begin()
    }
}

/// A closable handle onto a shared [`InMemoryStore`].
pub struct InMemoryClient {
    store: Arc<InMemoryStore>,
    closed: AtomicBool,
}

impl InMemoryClient {
    pub fn new(store: Arc<InMemoryStore>) -> Self {
        Self {
            store,
            closed: AtomicBool::new(false),
        }
    }

    /// Returns `true` once `quit` has completed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn open(&self) -> ClientResult<&InMemoryStore> {
        if self.is_closed() {
            return Err(ClientError::Closed);
        }
        Ok(&self.store)
    }
}

#[async_trait]
impl StoreClient for InMemoryClient {
    async fn get(&self, key: &str) -> ClientResult<Option<String>> {
        self.open()?.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        self.open()?.set(key, value).await
    }

    async fn del(&self, key: &str) -> ClientResult<u64> {
        self.open()?.del(key).await
    }

    async fn exists(&self, key: &str) -> ClientResult<bool> {
        self.open()?.exists(key).await
    }

    async fn key_type(&self, key: &str) -> ClientResult<KeyType> {
        self.open()?.key_type(key).await
    }

    async fn sadd(&self, key: &str, member: &str) -> ClientResult<u64> {
        self.open()?.sadd(key, member).await
    }

    async fn srem(&self, key: &str, member: &str) -> ClientResult<u64> {
        self.open()?.srem(key, member).await
    }

    async fn sismember(&self, key: &str, member: &str) -> ClientResult<bool> {
        self.open()?.sismember(key, member).await
    }

    async fn smembers(&self, key: &str) -> ClientResult<Vec<String>> {
        self.open()?.smembers(key).await
    }

    async fn scard(&self, key: &str) -> ClientResult<u64> {
        self.open()?.scard(key).await
    }

    async fn ping(&self) -> ClientResult<()> {
        self.open()?.ping().await
    }

    async fn quit(&self) -> ClientResult<()> {
        self.open()?.quit().await?;
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Connector handing out [`InMemoryClient`]s over one shared keyspace.
pub struct InMemoryConnector {
    store: Arc<InMemoryStore>,
    opened: AtomicU64,
    refuse: AtomicBool,
}

impl InMemoryConnector {
    /// Create a connector over a fresh, empty store.
    pub fn new() -> Self {
        Self::with_store(Arc::new(InMemoryStore::new()))
    }

    /// Create a connector over an existing store.
    pub fn with_store(store: Arc<InMemoryStore>) -> Self {
        Self {
            store,
            opened: AtomicU64::new(0),
            refuse: AtomicBool::new(false),
        }
    }

    /// The shared keyspace every client of this connector talks to.
    pub fn store(&self) -> &Arc<InMemoryStore> {
        &self.store
    }

    /// Number of clients opened so far.
    pub fn connections_opened(&self) -> u64 {
        self.opened.load(Ordering::SeqCst)
    }

    /// While refusing, `connect` fails as if the store were unreachable.
    pub fn set_refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }
}

impl Default for InMemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for InMemoryConnector {
    async fn connect(
        &self,
        address: &str,
        _options: &ClientOptions,
    ) -> ClientResult<Arc<dyn StoreClient>> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(ClientError::ConnectFailed {
                address: address.to_string(),
                reason: "connection refused".into(),
            });
        }
        let n = self.opened.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(address, opened = n, "opened in-memory client");
        Ok(Arc::new(InMemoryClient::new(Arc::clone(&self.store))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Strings and keys
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn set_and_get() {
        let store = InMemoryStore::new();
        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_overwrites_a_set() {
        let store = InMemoryStore::new();
        store.sadd("k", "a").await.unwrap();
        store.set("k", "v").await.unwrap();
        assert_eq!(store.key_type("k").await.unwrap(), KeyType::String);
    }

    #[tokio::test]
    async fn del_counts_removed_keys() {
        let store = InMemoryStore::new();
        store.set("k", "v").await.unwrap();
        assert_eq!(store.del("k").await.unwrap(), 1);
        assert_eq!(store.del("k").await.unwrap(), 0);
        assert!(!store.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn key_type_reports_each_kind() {
        let store = InMemoryStore::new();
        store.set("s", "v").await.unwrap();
        store.sadd("t", "m").await.unwrap();
        assert_eq!(store.key_type("s").await.unwrap(), KeyType::String);
        assert_eq!(store.key_type("t").await.unwrap(), KeyType::Set);
        assert_eq!(store.key_type("u").await.unwrap(), KeyType::None);
    }

    // -----------------------------------------------------------------------
    // Sets
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn sadd_counts_new_members_only() {
        let store = InMemoryStore::new();
        assert_eq!(store.sadd("k", "a").await.unwrap(), 1);
        assert_eq!(store.sadd("k", "a").await.unwrap(), 0);
        assert_eq!(store.sadd("k", "b").await.unwrap(), 1);
        assert_eq!(store.scard("k").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn srem_last_member_removes_key() {
        let store = InMemoryStore::new();
        store.sadd("k", "a").await.unwrap();
        assert_eq!(store.srem("k", "a").await.unwrap(), 1);
        assert!(!store.exists("k").await.unwrap());
        assert_eq!(store.srem("k", "a").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn smembers_of_missing_key_is_empty() {
        let store = InMemoryStore::new();
        assert!(store.smembers("k").await.unwrap().is_empty());
        assert_eq!(store.scard("k").await.unwrap(), 0);
        assert!(!store.sismember("k", "a").await.unwrap());
    }

    #[tokio::test]
    async fn set_commands_on_string_are_wrong_type() {
        let store = InMemoryStore::new();
        store.set("k", "v").await.unwrap();
        assert!(matches!(
            store.sadd("k", "a").await,
            Err(ClientError::Server { ref kind, .. }) if kind == "WRONGTYPE"
        ));
        assert!(store.smembers("k").await.is_err());
        assert!(store.scard("k").await.is_err());
    }

    #[tokio::test]
    async fn get_on_set_is_wrong_type() {
        let store = InMemoryStore::new();
        store.sadd("k", "a").await.unwrap();
        assert!(store.get("k").await.is_err());
    }

    // -----------------------------------------------------------------------
    // Accounting and faults
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn commands_are_counted() {
        let store = InMemoryStore::new();
        assert_eq!(store.commands_served(), 0);
        store.exists("k").await.unwrap();
        store.ping().await.unwrap();
        assert_eq!(store.commands_served(), 2);
    }

    #[tokio::test]
    async fn offline_store_loses_connection() {
        let store = InMemoryStore::new();
        store.set_offline(true);
        assert!(matches!(
            store.get("k").await,
            Err(ClientError::ConnectionLost(_))
        ));
        store.set_offline(false);
        assert!(store.get("k").await.is_ok());
    }

    #[tokio::test]
    async fn closed_client_rejects_commands() {
        let client = InMemoryClient::new(Arc::new(InMemoryStore::new()));
        client.quit().await.unwrap();
        assert!(client.is_closed());
        assert!(matches!(client.get("k").await, Err(ClientError::Closed)));
        assert!(matches!(client.quit().await, Err(ClientError::Closed)));
    }

    #[tokio::test]
    async fn connector_shares_keyspace() {
        let connector = InMemoryConnector::new();
        let opts = ClientOptions::default();
        let a = connector.connect("mem", &opts).await.unwrap();
        let b = connector.connect("mem", &opts).await.unwrap();
        a.set("k", "v").await.unwrap();
        assert_eq!(b.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(connector.connections_opened(), 2);
        assert_eq!(connector.store().len(), 1);
    }

    #[tokio::test]
    async fn refusing_connector_fails_to_connect() {
        let connector = InMemoryConnector::new();
        connector.set_refuse(true);
        let result = connector.connect("mem", &ClientOptions::default()).await;
        assert!(matches!(result, Err(ClientError::ConnectFailed { .. })));
        assert_eq!(connector.connections_opened(), 0);
    }
}
