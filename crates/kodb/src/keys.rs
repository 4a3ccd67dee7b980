use rand::rngs::OsRng;
use rand::RngCore;
use tracing::debug;

use crate::error::KodbResult;
use crate::session::Kodb;
use crate::validate::ensure_key;

/// Longest key [`random_hex`] produces.
pub const MAX_KEY_LENGTH: usize = 1024;

const RANDOM_BYTES: usize = MAX_KEY_LENGTH / 2;

/// Hex string drawn from the OS CSPRNG, `length` characters long.
///
/// `length` is clamped to [`MAX_KEY_LENGTH`]; `0` means the full
/// `MAX_KEY_LENGTH` characters.
pub fn random_hex(length: usize) -> String {
    let mut bytes = [0u8; RANDOM_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let mut s = hex::encode(bytes);
    if length > 0 {
        s.truncate(length.min(MAX_KEY_LENGTH));
    }
    s
}

impl Kodb {
    /// Delete `key` whatever it holds. Returns the number of keys removed.
    pub async fn delete_key(&self, key: &str) -> KodbResult<u64> {
        let client = self.client()?;
        ensure_key(key)?;
        Ok(client.del(key).await?)
    }

    /// Returns `true` if `key` holds anything.
    pub async fn exists_key(&self, key: &str) -> KodbResult<bool> {
        let client = self.client()?;
        ensure_key(key)?;
        Ok(client.exists(key).await?)
    }

    /// A random hex key that does not exist in the store.
    ///
    /// Candidates are drawn with [`random_hex`] and checked with `EXISTS`
    /// until one is free. There is no attempt cap and no backoff, so a
    /// short `length` over a nearly full keyspace can spin indefinitely.
    /// Nothing reserves the returned key: two sessions may be handed the
    /// same key if neither writes it before the other checks.
    pub async fn get_unique_key(&self, length: usize) -> KodbResult<String> {
        let client = self.client()?;
        let mut attempts: u64 = 0;
        loop {
            attempts += 1;
            let candidate = random_hex(length);
            if !client.exists(&candidate).await? {
                debug!(length = candidate.len(), attempts, "generated unique key");
                return Ok(candidate);
            }
            debug!(key = %candidate, attempts, "unique key candidate taken, retrying");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KodbError;
    use crate::session::tests::connected;
    use kodb_client::{InMemoryConnector, StoreClient};
    use proptest::prelude::*;

    #[test]
    fn random_hex_lengths() {
        assert_eq!(random_hex(0).len(), 1024);
        assert_eq!(random_hex(1).len(), 1);
        assert_eq!(random_hex(16).len(), 16);
        assert_eq!(random_hex(1024).len(), 1024);
        assert_eq!(random_hex(5000).len(), 1024);
    }

    #[test]
    fn random_hex_is_lowercase_hex() {
        let s = random_hex(0);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn random_hex_varies() {
        assert_ne!(random_hex(32), random_hex(32));
    }

    #[tokio::test]
    async fn unique_key_does_not_exist() {
        let (db, _) = connected().await;
        let key = db.get_unique_key(12).await.unwrap();
        assert_eq!(key.len(), 12);
        assert!(!db.exists_key(&key).await.unwrap());
    }

    #[tokio::test]
    async fn unique_key_default_length() {
        let (db, _) = connected().await;
        assert_eq!(db.get_unique_key(0).await.unwrap().len(), 1024);
    }

    #[tokio::test]
    async fn unique_key_skips_taken_keys() {
        let (db, store) = connected().await;
        // Occupy 15 of the 16 one-character keys.
        for c in "0123456789abcde".chars() {
            store.set(&c.to_string(), "taken").await.unwrap();
        }
        for _ in 0..8 {
            assert_eq!(db.get_unique_key(1).await.unwrap(), "f");
        }
    }

    #[tokio::test]
    async fn raw_key_operations() {
        let (db, store) = connected().await;
        store.set("a", "1").await.unwrap();
        store.sadd("b", "m").await.unwrap();
        assert!(db.exists_key("a").await.unwrap());
        assert!(db.exists_key("b").await.unwrap());
        assert_eq!(db.delete_key("a").await.unwrap(), 1);
        assert_eq!(db.delete_key("b").await.unwrap(), 1);
        assert_eq!(db.delete_key("b").await.unwrap(), 0);
        assert!(!db.exists_key("a").await.unwrap());
    }

    #[tokio::test]
    async fn disconnected_operations_touch_nothing() {
        let connector = InMemoryConnector::new();
        let store = std::sync::Arc::clone(connector.store());
        let db = Kodb::with_connector(connector);

        assert!(matches!(db.get_unique_key(8).await, Err(KodbError::NotConnected)));
        assert!(matches!(db.delete_key("k").await, Err(KodbError::NotConnected)));
        assert!(matches!(db.exists_key("k").await, Err(KodbError::NotConnected)));
        assert_eq!(store.commands_served(), 0);
    }

    proptest! {
        #[test]
        fn random_hex_respects_length(length in 1usize..=1024) {
            let s = random_hex(length);
            prop_assert_eq!(s.len(), length);
            prop_assert!(s.bytes().all(|b| b.is_ascii_hexdigit()));
        }
    }
}
