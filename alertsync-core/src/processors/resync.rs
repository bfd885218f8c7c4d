//! Full and single-instance resync.
//!
//! A resync replays the current relational state through the regular
//! dispatch path, as if every entity had just been saved. It is the recovery
//! path for events lost while the index store or the listener was down.

use super::{DispatchReport, IndexDispatcher, SourceOfTruth};
use crate::entities::Page;
use crate::entities::alert_instance::{GetAlertInstanceById, ListAlertInstances};
use crate::entities::alert_template::ListTemplateVersionKeys;
use crate::entities::channel_endpoint::ListChannelEndpointOwners;
use crate::entities::group::ListGroupOwners;
use crate::events::IndexEvent;
use kanau::processor::Processor;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

/// Walk every template version, instance, channel owner and group owner.
#[derive(Debug, Clone, Copy)]
pub struct FullResync {
    /// Rows fetched per query.
    pub batch_size: i64,
}

impl Default for FullResync {
    fn default() -> Self {
        Self { batch_size: 500 }
    }
}

/// Replay the current state of a single instance.
#[derive(Debug, Clone, Copy)]
pub struct ResyncInstance {
    pub instance_id: Uuid,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResyncReport {
    pub template_versions: usize,
    pub instances: usize,
    pub channels: usize,
    pub wallet_label_owners: usize,
    /// Synchronizer reactions that failed during the walk.
    pub failed_reactions: usize,
}

impl ResyncReport {
    fn absorb(&mut self, dispatch: &DispatchReport) {
        self.failed_reactions += dispatch.failures().count();
    }
}

impl<D: SourceOfTruth> Processor<FullResync> for IndexDispatcher<D> {
    type Output = ResyncReport;
    type Error = sqlx::Error;

    #[tracing::instrument(skip_all, err, name = "FullResync")]
    async fn process(&self, input: FullResync) -> Result<ResyncReport, sqlx::Error> {
        let mut report = ResyncReport::default();
        info!(batch_size = input.batch_size, "Full resync started");

        // Bundles first, so instance projections find them in place.
        let mut page = Page::first(input.batch_size);
        loop {
            let batch = self.source.process(ListTemplateVersionKeys { page }).await?;
            for key in &batch {
                let event = IndexEvent::TemplateVersionSaved {
                    template_id: key.template_id,
                    template_version: key.template_version,
                };
                report.absorb(&self.dispatch(&event).await);
                report.template_versions += 1;
            }
            if (batch.len() as i64) < page.limit {
                break;
            }
            page = page.next();
        }

        let mut page = Page::first(input.batch_size);
        loop {
            let batch = self.source.process(ListAlertInstances { page }).await?;
            let fetched = batch.len() as i64;
            for instance in batch {
                let event = IndexEvent::InstanceSaved {
                    instance,
                    was_created: false,
                };
                report.absorb(&self.dispatch(&event).await);
                report.instances += 1;
            }
            if fetched < page.limit {
                break;
            }
            page = page.next();
        }

        let mut page = Page::first(input.batch_size);
        loop {
            let batch = self
                .source
                .process(ListChannelEndpointOwners { page })
                .await?;
            for owner in &batch {
                let event = IndexEvent::ChannelEndpointChanged {
                    user_id: owner.user_id,
                    channel_type: owner.channel_type.into(),
                };
                report.absorb(&self.dispatch(&event).await);
                report.channels += 1;
            }
            if (batch.len() as i64) < page.limit {
                break;
            }
            page = page.next();
        }

        // Group target sets were refreshed with their instances above; only
        // the per-owner labels are left.
        let mut page = Page::first(input.batch_size);
        loop {
            let batch = self.source.process(ListGroupOwners { page }).await?;
            for owner_id in &batch {
                if let Err(e) = self.wallet_labels.on_owner_changed(*owner_id).await {
                    warn!(owner_id, error = %e, "Failed to resync wallet labels");
                    report.failed_reactions += 1;
                }
                report.wallet_label_owners += 1;
            }
            if (batch.len() as i64) < page.limit {
                break;
            }
            page = page.next();
        }

        info!(
            template_versions = report.template_versions,
            instances = report.instances,
            channels = report.channels,
            wallet_label_owners = report.wallet_label_owners,
            failed_reactions = report.failed_reactions,
            "Full resync finished"
        );
        Ok(report)
    }
}

impl<D: SourceOfTruth> Processor<ResyncInstance> for IndexDispatcher<D> {
    /// `None` when the instance does not exist.
    type Output = Option<DispatchReport>;
    type Error = sqlx::Error;

    #[tracing::instrument(skip_all, err, name = "ResyncInstance")]
    async fn process(&self, input: ResyncInstance) -> Result<Option<DispatchReport>, sqlx::Error> {
        let Some(instance) = self
            .source
            .process(GetAlertInstanceById {
                id: input.instance_id,
            })
            .await?
        else {
            return Ok(None);
        };
        let event = IndexEvent::InstanceSaved {
            instance,
            was_created: false,
        };
        Ok(Some(self.dispatch(&event).await))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigStore, RuntimeSyncSettings, SyncOptions};
    use crate::index::MemoryIndexStore;
    use crate::test_support::{FakeSource, USER, endpoint, instance, template};
    use alertsync_sdk::objects::ChannelType;
    use std::sync::Arc;

    fn setup() -> (
        Arc<MemoryIndexStore>,
        Arc<FakeSource>,
        IndexDispatcher<FakeSource>,
    ) {
        let store = Arc::new(MemoryIndexStore::new());
        let source = Arc::new(FakeSource::new());
        let dispatcher = IndexDispatcher::new(
            store.clone(),
            source.clone(),
            SyncOptions::default(),
            ConfigStore::new(RuntimeSyncSettings::default()),
        );
        (store, source, dispatcher)
    }

    #[tokio::test]
    async fn test_full_resync_rebuilds_every_projection() {
        let (store, source, dispatcher) = setup();
        let instances: Vec<_> = (0..5)
            .map(|n| instance(&[format!("evm:1:0x{n:03}").as_str()]))
            .collect();
        for i in &instances {
            source.put_instance(i.clone());
            source.put_template(template(i.template_id, i.template_version));
        }
        source.put_endpoint(endpoint(USER, ChannelType::Slack, true, true));
        let group_id = Uuid::new_v4();
        source.put_group(group_id, USER);
        source.set_members(group_id, &[("evm:1:0xfff", Some("ops"))]);

        let report = dispatcher.process(FullResync { batch_size: 2 }).await.unwrap();

        assert_eq!(
            report,
            ResyncReport {
                template_versions: 5,
                instances: 5,
                channels: 1,
                wallet_label_owners: 1,
                failed_reactions: 0,
            }
        );
        for i in &instances {
            assert!(store.contains_key(&format!("instance:projection:{}", i.id)));
            assert!(store.contains_key(&format!(
                "template:bundle:{}:{}",
                i.template_id, i.template_version
            )));
        }
        assert!(store.contains_key(&format!("channel:slack:{USER}")));
        assert!(store.contains_key(&format!("user:wallet_labels:{USER}")));
    }

    #[tokio::test]
    async fn test_full_resync_aborts_on_database_error() {
        let (_store, source, dispatcher) = setup();
        source.set_failing(true);

        let result = dispatcher.process(FullResync::default()).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_resync_single_instance() {
        let (store, source, dispatcher) = setup();
        let i = instance(&["evm:1:0xaaa"]);
        source.put_instance(i.clone());

        let report = dispatcher
            .process(ResyncInstance { instance_id: i.id })
            .await
            .unwrap()
            .unwrap();
        assert!(report.is_clean());
        assert!(store.contains_key("address:evm:1:0xaaa"));

        let missing = dispatcher
            .process(ResyncInstance {
                instance_id: Uuid::new_v4(),
            })
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}
