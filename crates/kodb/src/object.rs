//! JSON object records.
//!
//! Two tiers share one representation (the compact JSON text of an object
//! stored as a plain string value):
//!
//! - Strict: `load_object`, `save_object`, `delete_object`, `is_object`.
//!   A key that holds anything other than an object is `NotAnObject`.
//! - Lenient: `get`, `set`, `del`, `exists`. Type mismatches read as absent.

use kodb_client::{ClientError, StoreClient};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{KodbError, KodbResult};
use crate::session::Kodb;
use crate::validate::{ensure_key, ensure_object, parse_object};

/// A stored object: a string-keyed JSON map.
pub type Object = Map<String, Value>;

/// Read the raw value at `key` and parse it as an object.
///
/// Absent keys, non-JSON strings, JSON non-objects and non-string store
/// types all come back as `None`.
async fn read_object(client: &dyn StoreClient, key: &str) -> KodbResult<Option<Object>> {
    match client.get(key).await {
        Ok(raw) => Ok(raw.as_deref().and_then(parse_object)),
        Err(ClientError::Server { kind, .. }) if kind == "WRONGTYPE" => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl Kodb {
    /// Load the object stored at `key`.
    pub async fn load_object(&self, key: &str) -> KodbResult<Object> {
        let client = self.client()?;
        ensure_key(key)?;
        read_object(client.as_ref(), key)
            .await?
            .ok_or_else(|| KodbError::NotAnObject(key.to_string()))
    }

    /// Store `object` at `key`, replacing whatever was there.
    ///
    /// `object` must be a JSON object; arrays and scalars are rejected
    /// before anything is written.
    pub async fn save_object(&self, key: &str, object: &Value) -> KodbResult<()> {
        let client = self.client()?;
        ensure_key(key)?;
        let object = ensure_object(object)?;
        let raw = serde_json::to_string(object)
            .map_err(|e| KodbError::Serialization(e.to_string()))?;
        client.set(key, &raw).await?;
        debug!(key, bytes = raw.len(), "saved object");
        Ok(())
    }

    /// Delete the object at `key`. Fails with `NotAnObject` (and deletes
    /// nothing) unless the key currently holds an object.
    pub async fn delete_object(&self, key: &str) -> KodbResult<()> {
        let client = self.client()?;
        ensure_key(key)?;
        if read_object(client.as_ref(), key).await?.is_none() {
            return Err(KodbError::NotAnObject(key.to_string()));
        }
        client.del(key).await?;
        debug!(key, "deleted object");
        Ok(())
    }

    /// Returns `true` if `key` holds an object.
    pub async fn is_object(&self, key: &str) -> KodbResult<bool> {
        let client = self.client()?;
        ensure_key(key)?;
        Ok(read_object(client.as_ref(), key).await?.is_some())
    }

    /// Load the object at `key` and decode it into `T`.
    pub async fn load_as<T: DeserializeOwned>(&self, key: &str) -> KodbResult<T> {
        let object = self.load_object(key).await?;
        serde_json::from_value(Value::Object(object))
            .map_err(|e| KodbError::Serialization(format!("{key}: {e}")))
    }

    /// Encode `value` and store it at `key`. `value` must encode to a JSON
    /// object.
    pub async fn save_as<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> KodbResult<()> {
        self.client()?;
        let value =
            serde_json::to_value(value).map_err(|e| KodbError::Serialization(e.to_string()))?;
        self.save_object(key, &value).await
    }

    // ---- Lenient tier ----

    /// The object at `key`, or `None` if the key is absent or holds
    /// anything else.
    pub async fn get(&self, key: &str) -> KodbResult<Option<Object>> {
        let client = self.client()?;
        ensure_key(key)?;
        read_object(client.as_ref(), key).await
    }

    /// Same as [`save_object`](Self::save_object).
    pub async fn set(&self, key: &str, object: &Value) -> KodbResult<()> {
        self.save_object(key, object).await
    }

    /// Delete the object at `key`. Returns `false` (and deletes nothing)
    /// if the key does not hold an object.
    pub async fn del(&self, key: &str) -> KodbResult<bool> {
        let client = self.client()?;
        ensure_key(key)?;
        if read_object(client.as_ref(), key).await?.is_none() {
            return Ok(false);
        }
        Ok(client.del(key).await? > 0)
    }

    /// Same as [`is_object`](Self::is_object).
    pub async fn exists(&self, key: &str) -> KodbResult<bool> {
        self.is_object(key).await
    }
}
