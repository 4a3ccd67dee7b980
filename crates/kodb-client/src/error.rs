/// Errors from store client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The connection could not be established or never became ready.
    #[error("could not connect to {address}: {reason}")]
    ConnectFailed { address: String, reason: String },

    /// An established connection faulted. Clients never reconnect on their own.
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// The client was closed with `quit` and can no longer be used.
    #[error("client is closed")]
    Closed,

    /// The store answered with an error reply (e.g. `WRONGTYPE`).
    #[error("{kind} {message}")]
    Server { kind: String, message: String },

    /// The reply stream is malformed.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The reply was well-formed but not the shape the command expects.
    #[error("unexpected reply to {command}: {reply}")]
    UnexpectedReply { command: &'static str, reply: String },

    /// I/O error outside an established connection.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// The error a store returns when a command hits a key of the wrong type.
    pub fn wrong_type() -> Self {
        Self::Server {
            kind: "WRONGTYPE".into(),
            message: "Operation against a key holding the wrong kind of value".into(),
        }
    }

    /// Returns `true` if the error means the connection is gone for good.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ConnectionLost(_) | Self::Closed)
    }
}

/// Result alias for store client operations.
pub type ClientResult<T> = Result<T, ClientError>;
