use serde::{Deserialize, Serialize};

/// Per-connection settings applied during the connect handshake.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Sent with `AUTH` before anything else when set.
    pub password: Option<String>,
    /// Logical database index, selected with `SELECT` when non-zero.
    pub database: u32,
    /// Registered with `CLIENT SETNAME` when set.
    pub client_name: Option<String>,
}

impl ClientOptions {
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_database(mut self, database: u32) -> Self {
        self.database = database;
        self
    }

    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = Some(name.into());
        self
    }
}
