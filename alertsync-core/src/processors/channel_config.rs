//! Per-user channel delivery configuration.
//!
//! One synchronizer exists per managed channel type. On any endpoint change it
//! recomputes the full projection from the source of truth, so the stored
//! value never depends on which endpoint changed or in which order changes
//! arrived.

use super::{SyncError, SyncOutcome};
use crate::entities::channel_endpoint::{ListUserChannelEndpoints, NotificationChannelEndpoint};
use crate::index::SharedIndexStore;
use alertsync_sdk::KeySpace;
use alertsync_sdk::objects::{ChannelConfigProjection, ChannelEndpointProjection, ChannelType};
use kanau::processor::Processor;
use std::sync::Arc;
use tracing::debug;

pub struct ChannelConfigSynchronizer<D> {
    channel_type: ChannelType,
    store: SharedIndexStore,
    keys: KeySpace,
    source: Arc<D>,
}

impl<D> ChannelConfigSynchronizer<D>
where
    D: Processor<
            ListUserChannelEndpoints,
            Output = Vec<NotificationChannelEndpoint>,
            Error = sqlx::Error,
        > + Send
        + Sync,
{
    pub fn new(
        channel_type: ChannelType,
        store: SharedIndexStore,
        keys: KeySpace,
        source: Arc<D>,
    ) -> Self {
        Self {
            channel_type,
            store,
            keys,
            source,
        }
    }

    pub fn channel_type(&self) -> ChannelType {
        self.channel_type
    }

    /// Rewrite `channel:{type}:{user_id}` from the user's deliverable
    /// endpoints, or delete it when none remain.
    pub async fn on_changed(&self, user_id: i64) -> Result<SyncOutcome, SyncError> {
        let mut endpoints: Vec<ChannelEndpointProjection> = self
            .source
            .process(ListUserChannelEndpoints {
                user_id,
                channel_type: self.channel_type.into(),
            })
            .await?
            .into_iter()
            .filter(NotificationChannelEndpoint::is_deliverable)
            .map(|endpoint| ChannelEndpointProjection {
                endpoint_id: endpoint.id,
                config: endpoint.config,
            })
            .collect();
        endpoints.sort_by_key(|e| e.endpoint_id);

        let key = self.keys.channel(self.channel_type, user_id);
        if endpoints.is_empty() {
            self.store.delete(&key).await?;
            debug!(user_id, channel_type = %self.channel_type, "Removed channel config");
            return Ok(SyncOutcome::Removed);
        }

        let count = endpoints.len();
        let payload = serde_json::to_vec(&ChannelConfigProjection {
            user_id,
            channel_type: self.channel_type,
            endpoints,
        })?;
        self.store.set(&key, &payload).await?;
        debug!(
            user_id,
            channel_type = %self.channel_type,
            endpoints = count,
            "Projected channel config"
        );
        Ok(SyncOutcome::Written)
    }
}
