use std::path::Path;

use kodb_client::ClientOptions;
use serde::{Deserialize, Serialize};

use crate::error::{KodbError, KodbResult};

/// Address used when none is configured.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:6379";

/// Where and how to connect, as read from a TOML file.
///
/// ```toml
/// address = "10.0.0.5:6379"
/// password = "hunter2"
/// database = 2
/// client_name = "billing"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectOptions {
    pub address: String,
    pub password: Option<String>,
    pub database: u32,
    pub client_name: Option<String>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.into(),
            password: None,
            database: 0,
            client_name: None,
        }
    }
}

impl ConnectOptions {
    pub fn from_toml_str(s: &str) -> KodbResult<Self> {
        toml::from_str(s).map_err(|e| KodbError::Config(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> KodbResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// The handshake settings for the store client.
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            password: self.password.clone(),
            database: self.database,
            client_name: self.client_name.clone(),
        }
    }
}
