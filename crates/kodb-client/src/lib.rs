//! Store client facade for kodb.
//!
//! This crate is the only place kodb talks to a key/value store. It exposes
//! the handful of primitives the typed layer needs (string get/set, key
//! deletion and inspection, and native set commands) behind one async trait.
//!
//! # Backends
//!
//! All backends implement the [`StoreClient`] trait and are opened through a
//! [`Connector`]:
//!
//! - [`RespClient`] / [`RespConnector`] -- RESP2 over TCP to a live store
//! - [`InMemoryClient`] / [`InMemoryConnector`] -- shared in-memory keyspace
//!   for tests and embedding
//!
//! # Rules
//!
//! 1. One logical connection per client; calls are multiplexed onto it.
//! 2. Replies keep the store's meaning: counts are counts, absent is `None`.
//! 3. A fault after the connection is ready is `ConnectionLost` and is final.
//! 4. Clients never retry or reconnect.

pub mod error;
pub mod memory;
pub mod options;
pub mod remote;
pub mod resp;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{ClientError, ClientResult};
pub use memory::{InMemoryClient, InMemoryConnector, InMemoryStore};
pub use options::ClientOptions;
pub use remote::{RespClient, RespConnector};
pub use resp::RespValue;
pub use traits::{Connector, KeyType, StoreClient};
