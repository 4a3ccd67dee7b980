use std::sync::Arc;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};
use crate::options::ClientOptions;
use crate::resp::{self, RespValue};
use crate::traits::{Connector, KeyType, StoreClient};

struct Connection {
    stream: TcpStream,
    buffer: BytesMut,
    closed: bool,
}

/// Store client speaking RESP2 over a single TCP connection.
///
/// Requests are serialized through an async mutex so concurrent callers
/// share the one connection. Once established, any socket failure is a
/// `ConnectionLost`; the client never reconnects.
pub struct RespClient {
    address: String,
    conn: Mutex<Connection>,
}

impl RespClient {
    fn new(address: String, stream: TcpStream) -> Self {
        Self {
            address,
            conn: Mutex::new(Connection {
                stream,
                buffer: BytesMut::with_capacity(4096),
                closed: false,
            }),
        }
    }

    /// The address this client is connected to.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Send one command and wait for its reply. Error replies become
    /// `ClientError::Server`.
    pub async fn call(&self, args: &[&[u8]]) -> ClientResult<RespValue> {
        let mut conn = self.conn.lock().await;
        if conn.closed {
            return Err(ClientError::Closed);
        }
        let reply = round_trip(&mut conn, args).await?;
        match reply {
            RespValue::Error(line) => {
                let (kind, message) = resp::split_error(&line);
                Err(ClientError::Server { kind, message })
            }
            other => Ok(other),
        }
    }

    async fn call_integer(&self, command: &'static str, args: &[&[u8]]) -> ClientResult<i64> {
        match self.call(args).await? {
            RespValue::Integer(n) => Ok(n),
            other => Err(unexpected(command, &other)),
        }
    }

    async fn call_count(&self, command: &'static str, args: &[&[u8]]) -> ClientResult<u64> {
        let n = self.call_integer(command, args).await?;
        u64::try_from(n).map_err(|_| unexpected(command, &RespValue::Integer(n)))
    }

    async fn call_status(&self, command: &'static str, args: &[&[u8]]) -> ClientResult<String> {
        match self.call(args).await? {
            RespValue::Simple(s) => Ok(s),
            other => Err(unexpected(command, &other)),
        }
    }
}

/// One request/reply exchange.
///
/// The connection stays marked closed until the reply has been decoded: a
/// call dropped mid-flight or a malformed reply leaves it unusable.
async fn round_trip(conn: &mut Connection, args: &[&[u8]]) -> ClientResult<RespValue> {
    conn.closed = true;
    let request = resp::encode_command(args);
    conn.stream
        .write_all(&request)
        .await
        .map_err(|e| ClientError::ConnectionLost(e.to_string()))?;
    loop {
        if let Some((value, consumed)) = resp::decode(&conn.buffer)? {
            let _ = conn.buffer.split_to(consumed);
            conn.closed = false;
            return Ok(value);
        }
        match conn.stream.read_buf(&mut conn.buffer).await {
            Ok(0) => {
                return Err(ClientError::ConnectionLost(
                    "connection closed by peer".into(),
                ))
            }
            Ok(_) => {}
            Err(e) => return Err(ClientError::ConnectionLost(e.to_string())),
        }
    }
}

fn unexpected(command: &'static str, reply: &RespValue) -> ClientError {
    ClientError::UnexpectedReply {
        command,
        reply: format!("{reply:?}"),
    }
}

fn bulk_to_string(command: &'static str, value: RespValue) -> ClientResult<String> {
    match value {
        RespValue::Bulk(bytes) => String::from_utf8(bytes.to_vec())
            .map_err(|e| ClientError::Protocol(format!("{command}: non-UTF-8 reply: {e}"))),
        other => Err(unexpected(command, &other)),
    }
}

#[async_trait]
impl StoreClient for RespClient {
    async fn get(&self, key: &str) -> ClientResult<Option<String>> {
        match self.call(&[b"GET", key.as_bytes()]).await? {
            RespValue::Null => Ok(None),
            other => bulk_to_string("GET", other).map(Some),
        }
    }

    async fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        self.call_status("SET", &[b"SET", key.as_bytes(), value.as_bytes()])
            .await
            .map(|_| ())
    }

    async fn del(&self, key: &str) -> ClientResult<u64> {
        self.call_count("DEL", &[b"DEL", key.as_bytes()]).await
    }

    async fn exists(&self, key: &str) -> ClientResult<bool> {
        Ok(self.call_count("EXISTS", &[b"EXISTS", key.as_bytes()]).await? > 0)
    }

    async fn key_type(&self, key: &str) -> ClientResult<KeyType> {
        let name = self.call_status("TYPE", &[b"TYPE", key.as_bytes()]).await?;
        Ok(KeyType::from_reply(&name))
    }

    async fn sadd(&self, key: &str, member: &str) -> ClientResult<u64> {
        self.call_count("SADD", &[b"SADD", key.as_bytes(), member.as_bytes()])
            .await
    }

    async fn srem(&self, key: &str, member: &str) -> ClientResult<u64> {
        self.call_count("SREM", &[b"SREM", key.as_bytes(), member.as_bytes()])
            .await
    }

    async fn sismember(&self, key: &str, member: &str) -> ClientResult<bool> {
        let n = self
            .call_count(
                "SISMEMBER",
                &[b"SISMEMBER", key.as_bytes(), member.as_bytes()],
            )
            .await?;
        Ok(n == 1)
    }

    async fn smembers(&self, key: &str) -> ClientResult<Vec<String>> {
        match self.call(&[b"SMEMBERS", key.as_bytes()]).await? {
            RespValue::Array(items) => items
                .into_iter()
                .map(|item| bulk_to_string("SMEMBERS", item))
                .collect(),
            other => Err(unexpected("SMEMBERS", &other)),
        }
    }

    async fn scard(&self, key: &str) -> ClientResult<u64> {
        self.call_count("SCARD", &[b"SCARD", key.as_bytes()]).await
    }

    async fn ping(&self) -> ClientResult<()> {
        self.call_status("PING", &[b"PING"]).await.map(|_| ())
    }

    async fn quit(&self) -> ClientResult<()> {
        let mut conn = self.conn.lock().await;
        if conn.closed {
            return Err(ClientError::Closed);
        }
        let reply = round_trip(&mut conn, &[b"QUIT"]).await;
        conn.closed = true;
        if let Err(e) = conn.stream.shutdown().await {
            debug!(address = %self.address, "shutdown after QUIT failed: {}", e);
        }
        match reply? {
            RespValue::Simple(_) => Ok(()),
            other => Err(unexpected("QUIT", &other)),
        }
    }
}

/// Opens [`RespClient`]s over TCP.
///
/// The handshake runs `AUTH`, `SELECT` and `CLIENT SETNAME` as configured,
/// then `PING`. The client is handed out only after the `PING` reply.
#[derive(Clone, Debug, Default)]
pub struct RespConnector;

impl RespConnector {
    pub fn new() -> Self {
        Self
    }

    async fn handshake(client: &RespClient, options: &ClientOptions) -> ClientResult<()> {
        if let Some(password) = &options.password {
            client
                .call_status("AUTH", &[b"AUTH", password.as_bytes()])
                .await?;
        }
        if options.database != 0 {
            let db = options.database.to_string();
            client
                .call_status("SELECT", &[b"SELECT", db.as_bytes()])
                .await?;
        }
        if let Some(name) = &options.client_name {
            client
                .call_status("CLIENT SETNAME", &[b"CLIENT", b"SETNAME", name.as_bytes()])
                .await?;
        }
        client.ping().await
    }
}

#[async_trait]
impl Connector for RespConnector {
    async fn connect(
        &self,
        address: &str,
        options: &ClientOptions,
    ) -> ClientResult<Arc<dyn StoreClient>> {
        let failed = |reason: String| ClientError::ConnectFailed {
            address: address.to_string(),
            reason,
        };
        let stream = TcpStream::connect(address)
            .await
            .map_err(|e| failed(e.to_string()))?;
        if let Err(e) = stream.set_nodelay(true) {
            warn!(address, "could not set TCP_NODELAY: {}", e);
        }
        let client = RespClient::new(address.to_string(), stream);
        Self::handshake(&client, options)
            .await
            .map_err(|e| failed(e.to_string()))?;
        debug!(address, database = options.database, "store connection ready");
        Ok(Arc::new(client))
    }
}
