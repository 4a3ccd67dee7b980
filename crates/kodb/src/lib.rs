//! Typed access layer over a remote key/value store.
//!
//! A [`Kodb`] session owns one store connection and adds three things on top
//! of the raw primitives:
//!
//! - **Objects** -- JSON objects stored as text, with a strict API that
//!   reports `NotAnObject` and a lenient one that reads mismatches as absent.
//! - **Sets** -- native sets marked with a hidden existence token, so an
//!   empty set is distinguishable from no set at all.
//! - **Unique keys** -- random hex keys checked against the store until one
//!   is free.
//!
//! Every operation other than `connect`/`disconnect` fails fast with
//! [`KodbError::NotConnected`] while the session is down, and validates its
//! arguments before touching the store.
//!
//! ```no_run
//! # async fn demo() -> kodb::KodbResult<()> {
//! use kodb::{ClientOptions, Kodb};
//!
//! let db = Kodb::remote();
//! db.connect("127.0.0.1:6379", &ClientOptions::default()).await?;
//! db.create_set("tags").await?;
//! db.add_to_set("tags", "rust").await?;
//! assert_eq!(db.get_set_cardinality("tags").await?, 1);
//! db.disconnect().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod keys;
pub mod object;
pub mod session;
pub mod set;
pub mod validate;

pub use config::{ConnectOptions, DEFAULT_ADDRESS};
pub use error::{ArgPosition, KodbError, KodbResult};
pub use keys::{random_hex, MAX_KEY_LENGTH};
pub use object::Object;
pub use session::{ConnectStatus, ConnectionState, DisconnectStatus, Kodb};
pub use validate::is_stringified_object;

// Re-export the client types callers need to open sessions.
pub use kodb_client::{
    ClientError, ClientOptions, Connector, InMemoryConnector, InMemoryStore, RespConnector,
    StoreClient,
};
