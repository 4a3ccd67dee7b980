use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ClientResult;
use crate::options::ClientOptions;

/// Store-native type of the value held at a key, as reported by `TYPE`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum KeyType {
    None,
    String,
    List,
    Set,
    ZSet,
    Hash,
    Stream,
    Other(String),
}

impl KeyType {
    /// Parse a `TYPE` reply.
    pub fn from_reply(reply: &str) -> Self {
        match reply {
            "none" => Self::None,
            "string" => Self::String,
            "list" => Self::List,
            "set" => Self::Set,
            "zset" => Self::ZSet,
            "hash" => Self::Hash,
            "stream" => Self::Stream,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::None => "none",
            Self::String => "string",
            Self::List => "list",
            Self::Set => "set",
            Self::ZSet => "zset",
            Self::Hash => "hash",
            Self::Stream => "stream",
            Self::Other(name) => name.as_str(),
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimal interface to a remote key/value store.
///
/// Every method maps to exactly one store command and returns the store's
/// reply unchanged in meaning:
/// - Counts (`del`, `sadd`, `srem`, `scard`) are the store's counts.
/// - `get` returns `None` when the key is absent.
/// - Commands against a key of the wrong type fail with a `WRONGTYPE`
///   server error, they never coerce.
///
/// Implementations multiplex all calls onto a single logical connection.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// `GET key`
    async fn get(&self, key: &str) -> ClientResult<Option<String>>;

    /// `SET key value`
    async fn set(&self, key: &str, value: &str) -> ClientResult<()>;

    /// `DEL key`, returning the number of keys removed.
    async fn del(&self, key: &str) -> ClientResult<u64>;

    /// `EXISTS key`
    async fn exists(&self, key: &str) -> ClientResult<bool>;

    /// `TYPE key`
    async fn key_type(&self, key: &str) -> ClientResult<KeyType>;

    /// `SADD key member`, returning the number of members added.
    async fn sadd(&self, key: &str, member: &str) -> ClientResult<u64>;

    /// `SREM key member`, returning the number of members removed.
    async fn srem(&self, key: &str, member: &str) -> ClientResult<u64>;

    /// `SISMEMBER key member`
    async fn sismember(&self, key: &str, member: &str) -> ClientResult<bool>;

    /// `SMEMBERS key`. Order is unspecified.
    async fn smembers(&self, key: &str) -> ClientResult<Vec<String>>;

    /// `SCARD key`
    async fn scard(&self, key: &str) -> ClientResult<u64>;

    /// `PING`
    async fn ping(&self) -> ClientResult<()>;

    /// `QUIT`. Resolves once the store has acknowledged the close.
    async fn quit(&self) -> ClientResult<()>;
}

/// Opens new store clients.
///
/// `connect` resolves only once the client is ready to serve commands. Any
/// failure before that point is reported as `ClientError::ConnectFailed`.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        address: &str,
        options: &ClientOptions,
    ) -> ClientResult<Arc<dyn StoreClient>>;
}
