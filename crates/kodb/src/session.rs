use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use kodb_client::{
    ClientError, ClientOptions, ClientResult, Connector, KeyType, RespConnector, StoreClient,
};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::ConnectOptions;
use crate::error::{KodbError, KodbResult};

/// Lifecycle of the session's store connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Outcome of [`Kodb::connect`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectStatus {
    Connected,
    AlreadyConnected,
}

/// Outcome of [`Kodb::disconnect`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisconnectStatus {
    Disconnected,
    AlreadyDisconnected,
}

struct Session {
    state: ConnectionState,
    address: Option<String>,
    client: Option<Arc<dyn StoreClient>>,
}

/// The client handed to operations.
///
/// A fatal error (connection lost or closed) detaches the session from the
/// dead client: the state drops to `Disconnected`, the next operation gets
/// `NotConnected` and `connect` opens a fresh client. Nothing reconnects on
/// its own.
struct LiveClient {
    inner: Arc<dyn StoreClient>,
    session: Arc<RwLock<Session>>,
}

impl LiveClient {
    fn check<T>(&self, result: ClientResult<T>) -> ClientResult<T> {
        if let Err(e) = &result {
            if e.is_fatal() {
                self.detach(e);
            }
        }
        result
    }

    fn detach(&self, err: &ClientError) {
        let mut session = self.session.write().expect("lock poisoned");
        // A newer connection may already have replaced this client.
        let current = session
            .client
            .as_ref()
            .is_some_and(|client| Arc::ptr_eq(client, &self.inner));
        if current {
            session.state = ConnectionState::Disconnected;
            session.client = None;
            let address = session.address.take();
            error!(
                address = address.as_deref().unwrap_or(""),
                "session disconnected after fatal store error: {}", err
            );
        }
    }
}

#[async_trait]
impl StoreClient for LiveClient {
    async fn get(&self, key: &str) -> ClientResult<Option<String>> {
        self.check(self.inner.get(key).await)
    }

    async fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        self.check(self.inner.set(key, value).await)
    }

    async fn del(&self, key: &str) -> ClientResult<u64> {
        self.check(self.inner.del(key).await)
    }

    async fn exists(&self, key: &str) -> ClientResult<bool> {
        self.check(self.inner.exists(key).await)
    }

    async fn key_type(&self, key: &str) -> ClientResult<KeyType> {
        self.check(self.inner.key_type(key).await)
    }

    async fn sadd(&self, key: &str, member: &str) -> ClientResult<u64> {
        self.check(self.inner.sadd(key, member).await)
    }

    async fn srem(&self, key: &str, member: &str) -> ClientResult<u64> {
        self.check(self.inner.srem(key, member).await)
    }

    async fn sismember(&self, key: &str, member: &str) -> ClientResult<bool> {
        self.check(self.inner.sismember(key, member).await)
    }

    async fn smembers(&self, key: &str) -> ClientResult<Vec<String>> {
        self.check(self.inner.smembers(key).await)
    }

    async fn scard(&self, key: &str) -> ClientResult<u64> {
        self.check(self.inner.scard(key).await)
    }

    async fn ping(&self) -> ClientResult<()> {
        self.check(self.inner.ping().await)
    }

    async fn quit(&self) -> ClientResult<()> {
        self.check(self.inner.quit().await)
    }
}

/// A kodb session: one logical store connection plus every typed operation.
///
/// `connect` and `disconnect` are idempotent and serialized against each
/// other. Every other operation checks the connection synchronously before
/// touching the store and fails with [`KodbError::NotConnected`] otherwise.
/// There is no in-process locking per key; concurrent writers race at the
/// store.
pub struct Kodb {
    connector: Arc<dyn Connector>,
    session: Arc<RwLock<Session>>,
    lifecycle: Mutex<()>,
}

impl Kodb {
    /// Create a disconnected session that opens clients through `connector`.
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            session: Arc::new(RwLock::new(Session {
                state: ConnectionState::Disconnected,
                address: None,
                client: None,
            })),
            lifecycle: Mutex::new(()),
        }
    }

    pub fn with_connector(connector: impl Connector + 'static) -> Self {
        Self::new(Arc::new(connector))
    }

    /// Create a disconnected session that talks RESP over TCP.
    pub fn remote() -> Self {
        Self::with_connector(RespConnector::new())
    }

    pub fn state(&self) -> ConnectionState {
        self.session.read().expect("lock poisoned").state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Address of the current connection, if any.
    pub fn address(&self) -> Option<String> {
        self.session.read().expect("lock poisoned").address.clone()
    }

    /// Open the store connection.
    ///
    /// Resolves once the client is ready. Returns `AlreadyConnected` without
    /// opening anything if a connection is already up.
    pub async fn connect(
        &self,
        address: &str,
        options: &ClientOptions,
    ) -> KodbResult<ConnectStatus> {
        let _guard = self.lifecycle.lock().await;
        if self.is_connected() {
            debug!(address, "connect skipped: already connected");
            return Ok(ConnectStatus::AlreadyConnected);
        }
        self.set_state(ConnectionState::Connecting);

        match self.connector.connect(address, options).await {
            Ok(client) => {
                let mut session = self.session.write().expect("lock poisoned");
                session.state = ConnectionState::Connected;
                session.address = Some(address.to_string());
                session.client = Some(client);
                info!(address, "connected to store");
                Ok(ConnectStatus::Connected)
            }
            Err(e) => {
                self.set_state(ConnectionState::Disconnected);
                warn!(address, "connect failed: {}", e);
                Err(KodbError::ConnectionFailed(e.to_string()))
            }
        }
    }

    /// [`connect`](Self::connect) using a loaded configuration.
    pub async fn connect_with(&self, options: &ConnectOptions) -> KodbResult<ConnectStatus> {
        self.connect(&options.address, &options.client_options())
            .await
    }

    /// Close the store connection gracefully.
    ///
    /// The session stops accepting operations immediately; the call resolves
    /// once the client has confirmed the close. Returns `AlreadyDisconnected`
    /// if there is nothing to close.
    pub async fn disconnect(&self) -> KodbResult<DisconnectStatus> {
        let _guard = self.lifecycle.lock().await;
        let (client, address) = {
            let mut session = self.session.write().expect("lock poisoned");
            if session.state != ConnectionState::Connected {
                debug!("disconnect skipped: already disconnected");
                return Ok(DisconnectStatus::AlreadyDisconnected);
            }
            session.state = ConnectionState::Disconnected;
            (session.client.take(), session.address.take())
        };

        if let Some(client) = client {
            client.quit().await?;
        }
        info!(address = address.as_deref().unwrap_or(""), "disconnected from store");
        Ok(DisconnectStatus::Disconnected)
    }

    /// The connected client, or `NotConnected`.
    pub(crate) fn client(&self) -> KodbResult<Arc<dyn StoreClient>> {
        let session = self.session.read().expect("lock poisoned");
        match (session.state, &session.client) {
            (ConnectionState::Connected, Some(client)) => Ok(Arc::new(LiveClient {
                inner: Arc::clone(client),
                session: Arc::clone(&self.session),
            })),
            _ => Err(KodbError::NotConnected),
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.session.write().expect("lock poisoned").state = state;
    }
}

impl std::fmt::Debug for Kodb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.session.read().expect("lock poisoned");
        f.debug_struct("Kodb")
            .field("state", &session.state)
            .field("address", &session.address)
            .finish()
    }
}
