use std::fmt;

use kodb_client::ClientError;
use thiserror::Error;

/// Which argument of an operation failed validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgPosition {
    First,
    Second,
}

impl fmt::Display for ArgPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => f.write_str("first argument"),
            Self::Second => f.write_str("second argument"),
        }
    }
}

#[derive(Debug, Error)]
pub enum KodbError {
    #[error("not connected: connect to the database first")]
    NotConnected,

    #[error("invalid {position}: {reason}")]
    InvalidArgument { position: ArgPosition, reason: String },

    #[error("not an object: {0}")]
    NotAnObject(String),

    #[error("not a set: {0}")]
    NotASet(String),

    #[error("could not connect to the database: {0}")]
    ConnectionFailed(String),

    #[error("lost connection to the database: {0}")]
    ConnectionLost(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(ClientError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl KodbError {
    pub(crate) fn invalid(position: ArgPosition, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            position,
            reason: reason.into(),
        }
    }
}

impl From<ClientError> for KodbError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::ConnectFailed { .. } => Self::ConnectionFailed(err.to_string()),
            ClientError::ConnectionLost(reason) => {
                tracing::error!(%reason, "store connection lost");
                Self::ConnectionLost(reason)
            }
            ClientError::Closed => Self::ConnectionLost(err.to_string()),
            other => Self::Store(other),
        }
    }
}

pub type KodbResult<T> = Result<T, KodbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_argument_names_position() {
        let err = KodbError::invalid(ArgPosition::Second, "must be a plain object");
        assert_eq!(
            err.to_string(),
            "invalid second argument: must be a plain object"
        );
    }

    #[test]
    fn client_faults_map_to_lifecycle_errors() {
        let lost: KodbError = ClientError::ConnectionLost("eof".into()).into();
        assert!(matches!(lost, KodbError::ConnectionLost(ref r) if r == "eof"));

        let failed: KodbError = ClientError::ConnectFailed {
            address: "127.0.0.1:6379".into(),
            reason: "refused".into(),
        }
        .into();
        assert!(matches!(failed, KodbError::ConnectionFailed(_)));

        let closed: KodbError = ClientError::Closed.into();
        assert!(matches!(closed, KodbError::ConnectionLost(_)));
    }

    #[test]
    fn other_client_errors_pass_through() {
        let err: KodbError = ClientError::wrong_type().into();
        assert!(matches!(err, KodbError::Store(_)));
    }
}
