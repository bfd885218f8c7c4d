//! Address labels of a user, collected from the members of the groups they own.
//!
//! `user:wallet_labels:{user_id}` maps an address to its label. When the same
//! address carries different labels in several groups, the first one in
//! `(target_key, group_id)` order wins.

use super::{SyncError, SyncOutcome};
use crate::entities::group::{GroupMember, ListOwnerGroupMembers};
use crate::index::SharedIndexStore;
use alertsync_sdk::KeySpace;
use alertsync_sdk::objects::{TargetKey, WalletLabels};
use kanau::processor::Processor;
use std::sync::Arc;

pub struct WalletLabelSynchronizer<D> {
    store: SharedIndexStore,
    keys: KeySpace,
    source: Arc<D>,
}

impl<D> WalletLabelSynchronizer<D>
where
    D: Processor<ListOwnerGroupMembers, Output = Vec<GroupMember>, Error = sqlx::Error>
        + Send
        + Sync,
{
    pub fn new(store: SharedIndexStore, keys: KeySpace, source: Arc<D>) -> Self {
        Self {
            store,
            keys,
            source,
        }
    }

    pub async fn on_owner_changed(&self, owner_id: i64) -> Result<SyncOutcome, SyncError> {
        let members = self
            .source
            .process(ListOwnerGroupMembers { owner_id })
            .await?;

        let mut labels = WalletLabels::new();
        for member in members {
            let Some(label) = member.label.filter(|l| !l.trim().is_empty()) else {
                continue;
            };
            let target: TargetKey = member.target_key.parse()?;
            labels.entry(target.address().to_owned()).or_insert(label);
        }

        let key = self.keys.wallet_labels(owner_id);
        if labels.is_empty() {
            self.store.delete(&key).await?;
            return Ok(SyncOutcome::Removed);
        }
        self.store.set(&key, &serde_json::to_vec(&labels)?).await?;
        Ok(SyncOutcome::Written)
    }
}
