//! Reverse index from target key to the alert instances watching it.
//!
//! `address:{network}:{subnet}:{address}` holds the IDs of every enabled
//! instance listing that target. Next to it, `alert:addresses:{alert_id}`
//! records which address sets an instance was added to, so stale entries can
//! be removed from the instance ID alone, even after the row is gone.

use super::{SyncError, SyncOutcome};
use crate::entities::alert_instance::AlertInstance;
use crate::index::SharedIndexStore;
use alertsync_sdk::KeySpace;
use alertsync_sdk::objects::TargetKey;
use std::collections::BTreeSet;
use tracing::{debug, warn};
use uuid::Uuid;

pub struct AddressIndexSynchronizer {
    store: SharedIndexStore,
    keys: KeySpace,
}

impl AddressIndexSynchronizer {
    pub fn new(store: SharedIndexStore, keys: KeySpace) -> Self {
        Self { store, keys }
    }

    /// React to an inserted or updated instance.
    ///
    /// Disabled instances are removed from every address set they might be
    /// in. Enabled instances first get the removal pass (skipped on creation)
    /// and are then added to the set of each current target key.
    pub async fn on_saved(
        &self,
        instance: &AlertInstance,
        was_created: bool,
    ) -> Result<SyncOutcome, SyncError> {
        if !instance.enabled {
            // Removal works from the bookkeeping set, so a malformed current
            // key only narrows the extra keys swept, never the removal.
            let (targets, rejected) = instance.partition_target_keys();
            for (raw, e) in &rejected {
                warn!(
                    instance_id = %instance.id,
                    target_key = %raw,
                    error = %e,
                    "Skipping malformed target key while disabling"
                );
            }
            self.remove_everywhere(instance.id, &targets).await?;
            return Ok(SyncOutcome::Removed);
        }

        // Parse before touching the store: a malformed key writes nothing.
        let targets = instance.parsed_target_keys()?;

        if !was_created {
            self.remove_everywhere(instance.id, &[]).await?;
        }

        let member = instance.id.to_string();
        let bookkeeping = self.keys.alert_addresses(instance.id);
        for target in &targets {
            // Bookkeeping goes first so every address entry is findable later.
            self.store
                .add_to_set(&bookkeeping, &target.to_string())
                .await?;
            self.store
                .add_to_set(&self.keys.address(target), &member)
                .await?;
        }

        debug!(
            instance_id = %instance.id,
            targets = targets.len(),
            "Indexed instance under its target keys"
        );
        Ok(SyncOutcome::Written)
    }

    /// React to a deleted instance. Needs nothing but the ID.
    pub async fn on_deleted(&self, instance_id: Uuid) -> Result<SyncOutcome, SyncError> {
        self.remove_everywhere(instance_id, &[]).await?;
        Ok(SyncOutcome::Removed)
    }

    /// Remove the instance from every address set recorded for it plus
    /// `extra`, then drop the bookkeeping set.
    async fn remove_everywhere(
        &self,
        instance_id: Uuid,
        extra: &[TargetKey],
    ) -> Result<(), SyncError> {
        let bookkeeping = self.keys.alert_addresses(instance_id);
        let recorded = self.store.members(&bookkeeping).await?;

        let mut targets: BTreeSet<TargetKey> = extra.iter().cloned().collect();
        for raw in recorded {
            match raw.parse::<TargetKey>() {
                Ok(target) => {
                    targets.insert(target);
                }
                Err(e) => warn!(
                    %instance_id,
                    member = %raw,
                    error = %e,
                    "Ignoring unparseable bookkeeping entry"
                ),
            }
        }

        let member = instance_id.to_string();
        for target in &targets {
            self.store
                .remove_from_set(&self.keys.address(target), &member)
                .await?;
        }
        self.store.delete(&bookkeeping).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MemoryIndexStore;
    use crate::test_support::instance;
    use std::sync::Arc;

    const A: &str = "evm:1:0xaaa";
    const B: &str = "evm:1:0xbbb";
    const C: &str = "evm:1:0xccc";

    fn setup() -> (Arc<MemoryIndexStore>, AddressIndexSynchronizer) {
        let store = Arc::new(MemoryIndexStore::new());
        let sync = AddressIndexSynchronizer::new(store.clone(), KeySpace::default());
        (store, sync)
    }

    fn watchers(store: &MemoryIndexStore, target: &str) -> BTreeSet<String> {
        store.set_members(&format!("address:{target}"))
    }

    #[tokio::test]
    async fn test_enabled_instance_is_indexed_under_each_target() {
        let (store, sync) = setup();
        let i = instance(&[A, B]);

        let outcome = sync.on_saved(&i, true).await.unwrap();

        assert_eq!(outcome, SyncOutcome::Written);
        assert!(watchers(&store, A).contains(&i.id.to_string()));
        assert!(watchers(&store, B).contains(&i.id.to_string()));
        assert_eq!(
            store.set_members(&format!("alert:addresses:{}", i.id)),
            BTreeSet::from([A.to_string(), B.to_string()])
        );
    }

    #[tokio::test]
    async fn test_disabling_removes_from_every_target() {
        let (store, sync) = setup();
        let mut i = instance(&[A, B]);
        sync.on_saved(&i, true).await.unwrap();

        i.enabled = false;
        let outcome = sync.on_saved(&i, false).await.unwrap();

        assert_eq!(outcome, SyncOutcome::Removed);
        assert!(watchers(&store, A).is_empty());
        assert!(watchers(&store, B).is_empty());
        assert!(!store.contains_key(&format!("alert:addresses:{}", i.id)));
    }

    #[tokio::test]
    async fn test_changing_targets_drops_stale_entries() {
        let (store, sync) = setup();
        let mut i = instance(&[A, B]);
        sync.on_saved(&i, true).await.unwrap();

        i.target_keys = vec![B.to_string(), C.to_string()];
        sync.on_saved(&i, false).await.unwrap();

        let id = i.id.to_string();
        assert!(!watchers(&store, A).contains(&id));
        assert!(watchers(&store, B).contains(&id));
        assert!(watchers(&store, C).contains(&id));
    }

    #[tokio::test]
    async fn test_delete_without_prior_disable_cleans_up() {
        let (store, sync) = setup();
        let i = instance(&[A, B]);
        sync.on_saved(&i, true).await.unwrap();

        sync.on_deleted(i.id).await.unwrap();

        assert!(watchers(&store, A).is_empty());
        assert!(watchers(&store, B).is_empty());
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_delete_is_harmless() {
        let (store, sync) = setup();
        let i = instance(&[A]);
        sync.on_saved(&i, true).await.unwrap();

        assert_eq!(sync.on_deleted(i.id).await.unwrap(), SyncOutcome::Removed);
        assert_eq!(sync.on_deleted(i.id).await.unwrap(), SyncOutcome::Removed);
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn test_other_watchers_are_untouched() {
        let (store, sync) = setup();
        let first = instance(&[A]);
        let second = instance(&[A]);
        sync.on_saved(&first, true).await.unwrap();
        sync.on_saved(&second, true).await.unwrap();

        sync.on_deleted(first.id).await.unwrap();

        assert_eq!(
            watchers(&store, A),
            BTreeSet::from([second.id.to_string()])
        );
    }

    #[tokio::test]
    async fn test_target_keys_are_normalized() {
        let (store, sync) = setup();
        let i = instance(&["EVM:1:0xAAA"]);
        sync.on_saved(&i, true).await.unwrap();

        assert!(watchers(&store, A).contains(&i.id.to_string()));
    }

    #[tokio::test]
    async fn test_malformed_target_key_writes_nothing() {
        let (store, sync) = setup();
        let i = instance(&[A, "no-separators"]);

        let err = sync.on_saved(&i, true).await.unwrap_err();

        assert!(matches!(err, SyncError::InvalidTargetKey(_)));
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_disabling_with_malformed_key_still_removes() {
        let (store, sync) = setup();
        let mut i = instance(&[A]);
        sync.on_saved(&i, true).await.unwrap();

        i.enabled = false;
        i.target_keys = vec![A.to_string(), "garbage".to_string()];
        let outcome = sync.on_saved(&i, false).await.unwrap();

        assert_eq!(outcome, SyncOutcome::Removed);
        assert!(watchers(&store, A).is_empty());
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_is_reported() {
        let (store, sync) = setup();
        store.set_unavailable(true);

        let err = sync.on_saved(&instance(&[A]), true).await.unwrap_err();

        assert!(matches!(err, SyncError::Index(_)));
    }
}
