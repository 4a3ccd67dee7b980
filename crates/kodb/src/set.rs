//! Existence-safe sets.
//!
//! A native set cannot tell "empty on purpose" from "absent", because the
//! store drops a set when its last member goes. A kodb set is a native set
//! that always contains [`SET_EXISTENCE_TOKEN`]. The token is filtered from
//! every member-level result and subtracted from the cardinality, and
//! callers may not pass it as a member.
//!
//! A key is a kodb set if and only if its native type is `set` and the token
//! is a member. Native sets without the token, strings, and absent keys are
//! all "not a set".

use kodb_client::{KeyType, StoreClient};
use tracing::debug;

use crate::error::{KodbError, KodbResult};
use crate::session::Kodb;
use crate::validate::{ensure_key, ensure_member, SET_EXISTENCE_TOKEN};

async fn probe_set(client: &dyn StoreClient, key: &str) -> KodbResult<bool> {
    if client.key_type(key).await? != KeyType::Set {
        return Ok(false);
    }
    Ok(client.sismember(key, SET_EXISTENCE_TOKEN).await?)
}

async fn require_set(client: &dyn StoreClient, key: &str) -> KodbResult<()> {
    if !probe_set(client, key).await? {
        return Err(KodbError::NotASet(key.to_string()));
    }
    Ok(())
}

impl Kodb {
    /// Create an empty set at `key`, destroying whatever the key held.
    pub async fn create_set(&self, key: &str) -> KodbResult<()> {
        let client = self.client()?;
        ensure_key(key)?;
        client.del(key).await?;
        client.sadd(key, SET_EXISTENCE_TOKEN).await?;
        debug!(key, "created set");
        Ok(())
    }

    /// Returns `true` if `key` holds a kodb set.
    pub async fn is_set(&self, key: &str) -> KodbResult<bool> {
        let client = self.client()?;
        ensure_key(key)?;
        probe_set(client.as_ref(), key).await
    }

    /// Delete the set at `key`. Fails with `NotASet` (and deletes nothing)
    /// unless the key holds a kodb set.
    pub async fn delete_set(&self, key: &str) -> KodbResult<()> {
        let client = self.client()?;
        ensure_key(key)?;
        require_set(client.as_ref(), key).await?;
        client.del(key).await?;
        debug!(key, "deleted set");
        Ok(())
    }

    /// Remove every member from the set at `key`.
    pub async fn clear_set(&self, key: &str) -> KodbResult<()> {
        self.delete_set(key).await?;
        self.create_set(key).await
    }

    /// Add `member` to the set at `key`. Returns `false` if it was
    /// already present.
    pub async fn add_to_set(&self, key: &str, member: &str) -> KodbResult<bool> {
        let client = self.client()?;
        ensure_key(key)?;
        ensure_member(member)?;
        require_set(client.as_ref(), key).await?;
        Ok(client.sadd(key, member).await? > 0)
    }

    /// Remove `member` from the set at `key`. Returns `false` if it was
    /// not present.
    pub async fn remove_from_set(&self, key: &str, member: &str) -> KodbResult<bool> {
        let client = self.client()?;
        ensure_key(key)?;
        ensure_member(member)?;
        require_set(client.as_ref(), key).await?;
        Ok(client.srem(key, member).await? > 0)
    }

    /// Returns `true` if `member` is in the set at `key`.
    pub async fn exists_in_set(&self, key: &str, member: &str) -> KodbResult<bool> {
        let client = self.client()?;
        ensure_key(key)?;
        ensure_member(member)?;
        require_set(client.as_ref(), key).await?;
        Ok(client.sismember(key, member).await?)
    }

    /// Members of the set at `key`, in no particular order.
    pub async fn get_set_members(&self, key: &str) -> KodbResult<Vec<String>> {
        let client = self.client()?;
        ensure_key(key)?;
        require_set(client.as_ref(), key).await?;
        let mut members = client.smembers(key).await?;
        members.retain(|m| m != SET_EXISTENCE_TOKEN);
        Ok(members)
    }

    /// Number of members in the set at `key`.
    pub async fn get_set_cardinality(&self, key: &str) -> KodbResult<u64> {
        let client = self.client()?;
        ensure_key(key)?;
        require_set(client.as_ref(), key).await?;
        Ok(client.scard(key).await?.saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ArgPosition;
    use crate::session::tests::connected;
    use kodb_client::InMemoryConnector;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn create_then_delete() {
        let (db, _) = connected().await;
        assert!(!db.is_set("s").await.unwrap());
        db.create_set("s").await.unwrap();
        assert!(db.is_set("s").await.unwrap());
        db.delete_set("s").await.unwrap();
        assert!(!db.is_set("s").await.unwrap());
    }

    #[tokio::test]
    async fn created_set_is_empty_but_present() {
        let (db, store) = connected().await;
        db.create_set("s").await.unwrap();
        assert_eq!(db.get_set_cardinality("s").await.unwrap(), 0);
        assert!(db.get_set_members("s").await.unwrap().is_empty());
        assert_eq!(store.scard("s").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn create_overwrites_other_values() {
        let (db, store) = connected().await;
        store.set("s", "text").await.unwrap();
        db.create_set("s").await.unwrap();
        assert!(db.is_set("s").await.unwrap());

        db.add_to_set("s", "a").await.unwrap();
        db.create_set("s").await.unwrap();
        assert_eq!(db.get_set_cardinality("s").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn clear_empties_set() {
        let (db, _) = connected().await;
        db.create_set("s").await.unwrap();
        db.add_to_set("s", "a").await.unwrap();
        db.add_to_set("s", "b").await.unwrap();
        db.clear_set("s").await.unwrap();
        assert!(db.is_set("s").await.unwrap());
        assert_eq!(db.get_set_cardinality("s").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn clear_requires_set() {
        let (db, store) = connected().await;
        assert!(matches!(db.clear_set("s").await, Err(KodbError::NotASet(_))));
        assert!(!store.exists("s").await.unwrap());
    }

    // -----------------------------------------------------------------------
    // Classification
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn native_set_without_token_is_not_a_set() {
        let (db, store) = connected().await;
        store.sadd("native", "a").await.unwrap();
        assert!(!db.is_set("native").await.unwrap());
        assert!(matches!(
            db.delete_set("native").await,
            Err(KodbError::NotASet(_))
        ));
        assert!(store.exists("native").await.unwrap());
    }

    #[tokio::test]
    async fn string_is_not_a_set() {
        let (db, store) = connected().await;
        store.set("str", "v").await.unwrap();
        assert!(!db.is_set("str").await.unwrap());
        assert!(matches!(
            db.add_to_set("str", "a").await,
            Err(KodbError::NotASet(_))
        ));
        assert_eq!(store.get("str").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn member_operations_require_set() {
        let (db, _) = connected().await;
        assert!(matches!(db.add_to_set("s", "a").await, Err(KodbError::NotASet(_))));
        assert!(matches!(db.remove_from_set("s", "a").await, Err(KodbError::NotASet(_))));
        assert!(matches!(db.exists_in_set("s", "a").await, Err(KodbError::NotASet(_))));
        assert!(matches!(db.get_set_members("s").await, Err(KodbError::NotASet(_))));
        assert!(matches!(db.get_set_cardinality("s").await, Err(KodbError::NotASet(_))));
    }

    // -----------------------------------------------------------------------
    // Members
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn add_and_remove_report_changes() {
        let (db, _) = connected().await;
        db.create_set("s").await.unwrap();
        assert!(db.add_to_set("s", "a").await.unwrap());
        assert!(!db.add_to_set("s", "a").await.unwrap());
        assert!(db.exists_in_set("s", "a").await.unwrap());
        assert!(db.remove_from_set("s", "a").await.unwrap());
        assert!(!db.remove_from_set("s", "a").await.unwrap());
        assert!(!db.exists_in_set("s", "a").await.unwrap());
    }

    #[tokio::test]
    async fn removing_last_member_keeps_set() {
        let (db, _) = connected().await;
        db.create_set("s").await.unwrap();
        db.add_to_set("s", "only").await.unwrap();
        db.remove_from_set("s", "only").await.unwrap();
        assert!(db.is_set("s").await.unwrap());
        assert_eq!(db.get_set_cardinality("s").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn token_is_rejected_as_member() {
        let (db, store) = connected().await;
        db.create_set("s").await.unwrap();
        let served = store.commands_served();
        for result in [
            db.add_to_set("s", SET_EXISTENCE_TOKEN).await,
            db.remove_from_set("s", SET_EXISTENCE_TOKEN).await,
            db.exists_in_set("s", SET_EXISTENCE_TOKEN).await,
        ] {
            assert!(matches!(
                result,
                Err(KodbError::InvalidArgument { position: ArgPosition::Second, .. })
            ));
        }
        assert_eq!(store.commands_served(), served);
        assert!(db.is_set("s").await.unwrap());
    }

    #[tokio::test]
    async fn disconnected_operations_touch_nothing() {
        let connector = InMemoryConnector::new();
        let store = std::sync::Arc::clone(connector.store());
        let db = Kodb::with_connector(connector);

        assert!(matches!(db.create_set("s").await, Err(KodbError::NotConnected)));
        assert!(matches!(db.is_set("s").await, Err(KodbError::NotConnected)));
        assert!(matches!(db.delete_set("s").await, Err(KodbError::NotConnected)));
        assert!(matches!(db.clear_set("s").await, Err(KodbError::NotConnected)));
        assert!(matches!(db.add_to_set("s", "a").await, Err(KodbError::NotConnected)));
        assert!(matches!(db.remove_from_set("s", "a").await, Err(KodbError::NotConnected)));
        assert!(matches!(db.exists_in_set("s", "a").await, Err(KodbError::NotConnected)));
        assert!(matches!(db.get_set_members("s").await, Err(KodbError::NotConnected)));
        assert!(matches!(db.get_set_cardinality("s").await, Err(KodbError::NotConnected)));
        assert_eq!(store.commands_served(), 0);
    }

    proptest! {
        #[test]
        fn cardinality_and_members_hide_token(
            adds in prop::collection::vec("[a-z]{0,4}", 0..24),
            removes in prop::collection::vec("[a-z]{0,4}", 0..12),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let (card, native, members) = rt.block_on(async {
                let (db, store) = connected().await;
                db.create_set("s").await.unwrap();
                for m in &adds {
                    db.add_to_set("s", m).await.unwrap();
                }
                for m in &removes {
                    db.remove_from_set("s", m).await.unwrap();
                }
                (
                    db.get_set_cardinality("s").await.unwrap(),
                    store.scard("s").await.unwrap(),
                    db.get_set_members("s").await.unwrap(),
                )
            });

            let mut expected: BTreeSet<String> = adds.iter().cloned().collect();
            for m in &removes {
                expected.remove(m);
            }
            prop_assert_eq!(card, expected.len() as u64);
            prop_assert_eq!(native, card + 1);
            prop_assert!(!members.iter().any(|m| m == SET_EXISTENCE_TOKEN));
            prop_assert_eq!(members.into_iter().collect::<BTreeSet<_>>(), expected);
        }
    }
}
