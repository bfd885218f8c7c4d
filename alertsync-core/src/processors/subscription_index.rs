//! Template subscriber index: `template:subscribers:{template_id}` holds the
//! IDs of users with at least one enabled instance of that template.
//!
//! Membership is per user, not per instance. Disabling or deleting one of
//! several instances of the same template removes the user anyway; the next
//! save of a remaining instance adds them back.

use super::{SyncError, SyncOutcome};
use crate::entities::alert_instance::AlertInstance;
use crate::index::SharedIndexStore;
use alertsync_sdk::KeySpace;
use uuid::Uuid;

pub struct SubscriptionIndexSynchronizer {
    store: SharedIndexStore,
    keys: KeySpace,
}

impl SubscriptionIndexSynchronizer {
    pub fn new(store: SharedIndexStore, keys: KeySpace) -> Self {
        Self { store, keys }
    }

    pub async fn on_saved(&self, instance: &AlertInstance) -> Result<SyncOutcome, SyncError> {
        let key = self.keys.template_subscribers(instance.template_id);
        let member = instance.user_id.to_string();
        if instance.enabled {
            self.store.add_to_set(&key, &member).await?;
            Ok(SyncOutcome::Written)
        } else {
            self.store.remove_from_set(&key, &member).await?;
            Ok(SyncOutcome::Removed)
        }
    }

    /// Deletions that do not carry the template ID cannot be attributed.
    pub async fn on_deleted(
        &self,
        user_id: i64,
        template_id: Option<Uuid>,
    ) -> Result<SyncOutcome, SyncError> {
        let Some(template_id) = template_id else {
            return Ok(SyncOutcome::Skipped);
        };
        self.store
            .remove_from_set(
                &self.keys.template_subscribers(template_id),
                &user_id.to_string(),
            )
            .await?;
        Ok(SyncOutcome::Removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MemoryIndexStore;
    use crate::test_support::{USER, instance};
    use std::collections::BTreeSet;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_enable_then_disable() {
        let store = Arc::new(MemoryIndexStore::new());
        let sync = SubscriptionIndexSynchronizer::new(store.clone(), KeySpace::default());
        let mut i = instance(&["evm:1:0xaaa"]);
        let key = format!("template:subscribers:{}", i.template_id);

        sync.on_saved(&i).await.unwrap();
        assert_eq!(store.set_members(&key), BTreeSet::from([USER.to_string()]));

        i.enabled = false;
        assert_eq!(sync.on_saved(&i).await.unwrap(), SyncOutcome::Removed);
        assert!(!store.contains_key(&key));
    }

    #[tokio::test]
    async fn test_delete_with_and_without_template() {
        let store = Arc::new(MemoryIndexStore::new());
        let sync = SubscriptionIndexSynchronizer::new(store.clone(), KeySpace::default());
        let i = instance(&["evm:1:0xaaa"]);
        sync.on_saved(&i).await.unwrap();

        assert_eq!(
            sync.on_deleted(i.user_id, None).await.unwrap(),
            SyncOutcome::Skipped
        );
        assert!(!store.keys().is_empty());

        sync.on_deleted(i.user_id, Some(i.template_id))
            .await
            .unwrap();
        assert!(store.keys().is_empty());
    }
}
