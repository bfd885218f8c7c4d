//! Resolved target sets of instances created from group subscriptions.
//!
//! `alert:targets:{alert_id}` (or `alert:targets:{user_id}:{alert_id}` when
//! scoped by user) holds the current member targets of the subscribed group.
//! Writes are recompute-then-converge: the resolved set is diffed against the
//! stored one and only the difference is applied.

use super::{SyncError, SyncOutcome};
use crate::entities::alert_instance::{AlertInstance, ListAlertInstancesForGroup};
use crate::entities::group::{
    GetGroupSubscription, GroupMember, GroupSubscription, ListGroupMembers,
};
use crate::index::{IndexStore, SharedIndexStore};
use alertsync_sdk::KeySpace;
use alertsync_sdk::objects::TargetKey;
use kanau::processor::Processor;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

pub struct GroupTargetSynchronizer<D> {
    store: SharedIndexStore,
    keys: KeySpace,
    source: Arc<D>,
    scope_by_user: bool,
}

impl<D> GroupTargetSynchronizer<D>
where
    D: Processor<GetGroupSubscription, Output = Option<GroupSubscription>, Error = sqlx::Error>
        + Processor<ListGroupMembers, Output = Vec<GroupMember>, Error = sqlx::Error>
        + Processor<ListAlertInstancesForGroup, Output = Vec<AlertInstance>, Error = sqlx::Error>
        + Send
        + Sync,
{
    pub fn new(store: SharedIndexStore, keys: KeySpace, source: Arc<D>, scope_by_user: bool) -> Self {
        Self {
            store,
            keys,
            source,
            scope_by_user,
        }
    }

    fn targets_key(&self, user_id: i64, alert_id: Uuid) -> String {
        if self.scope_by_user {
            self.keys.alert_targets_scoped(user_id, alert_id)
        } else {
            self.keys.alert_targets(alert_id)
        }
    }

    /// React to an inserted or updated instance.
    ///
    /// Instances without a source subscription are skipped on creation. On
    /// update their target set is removed, since the subscription may have
    /// just been detached.
    pub async fn on_saved(
        &self,
        instance: &AlertInstance,
        was_created: bool,
    ) -> Result<SyncOutcome, SyncError> {
        match instance.source_subscription {
            Some(subscription_id) => self.resolve(instance, subscription_id).await,
            None if was_created => Ok(SyncOutcome::Skipped),
            None => Self::remove_targets(&*self.store, &self.keys, instance.id, instance.user_id).await,
        }
    }

    pub async fn on_deleted(&self, alert_id: Uuid, user_id: i64) -> Result<SyncOutcome, SyncError> {
        Self::remove_targets(&*self.store, &self.keys, alert_id, user_id).await
    }

    /// Remove the target set of an instance that no longer exists.
    ///
    /// Both the plain and the user scoped key are deleted, so this works
    /// without knowing how the set was written.
    pub async fn remove_targets(
        store: &dyn IndexStore,
        keys: &KeySpace,
        alert_id: Uuid,
        user_id: i64,
    ) -> Result<SyncOutcome, SyncError> {
        store.delete(&keys.alert_targets(alert_id)).await?;
        store
            .delete(&keys.alert_targets_scoped(user_id, alert_id))
            .await?;
        Ok(SyncOutcome::Removed)
    }

    /// Re-resolve every instance created from a subscription to `group_id`.
    ///
    /// One failing instance does not stop the others; failures are counted
    /// and reported together.
    pub async fn on_group_changed(&self, group_id: Uuid) -> Result<SyncOutcome, SyncError> {
        let instances = self
            .source
            .process(ListAlertInstancesForGroup { group_id })
            .await?;
        if instances.is_empty() {
            return Ok(SyncOutcome::Skipped);
        }

        // Only instances still tied to a subscription count towards `total`.
        let subscribed: Vec<(&AlertInstance, Uuid)> = instances
            .iter()
            .filter_map(|i| i.source_subscription.map(|id| (i, id)))
            .collect();
        let total = subscribed.len();
        let mut failed = 0;
        for (instance, subscription_id) in subscribed {
            if let Err(e) = self.resolve(instance, subscription_id).await {
                failed += 1;
                warn!(
                    %group_id,
                    instance_id = %instance.id,
                    error = %e,
                    "Failed to re-resolve group targets"
                );
            }
        }

        if failed > 0 {
            return Err(SyncError::PartialFailure { failed, total });
        }
        debug!(%group_id, instances = total, "Re-resolved group targets");
        Ok(SyncOutcome::Written)
    }

    async fn resolve(
        &self,
        instance: &AlertInstance,
        subscription_id: Uuid,
    ) -> Result<SyncOutcome, SyncError> {
        let subscription = self
            .source
            .process(GetGroupSubscription { subscription_id })
            .await?
            .ok_or(SyncError::SubscriptionNotFound(subscription_id))?;
        let members = self
            .source
            .process(ListGroupMembers {
                group_id: subscription.group_id,
            })
            .await?;
        let resolved: BTreeSet<String> = members
            .iter()
            .map(|m| m.target_key.parse::<TargetKey>().map(|k| k.to_string()))
            .collect::<Result<_, _>>()?;

        let key = self.targets_key(instance.user_id, instance.id);
        self.converge(&key, &resolved).await
    }

    async fn converge(&self, key: &str, resolved: &BTreeSet<String>) -> Result<SyncOutcome, SyncError> {
        if resolved.is_empty() {
            self.store.delete(key).await?;
            return Ok(SyncOutcome::Removed);
        }

        let existing: BTreeSet<String> = self.store.members(key).await?.into_iter().collect();
        let mut changed = false;
        for stale in existing.difference(resolved) {
            self.store.remove_from_set(key, stale).await?;
            changed = true;
        }
        for fresh in resolved.difference(&existing) {
            self.store.add_to_set(key, fresh).await?;
            changed = true;
        }

        Ok(if changed {
            SyncOutcome::Written
        } else {
            SyncOutcome::Unchanged
        })
    }
}
