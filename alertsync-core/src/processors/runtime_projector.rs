//! Alert runtime projections.
//!
//! Writes the pinned template bundles and the per-instance snapshots the
//! alert runtime evaluates. Every operation is gated by
//! [`RuntimeSyncSettings::enabled`]; with the flag off the projector does not
//! issue a single index store call.

use super::{SyncError, SyncOutcome};
use crate::config::{ConfigStore, RuntimeSyncSettings};
use crate::entities::alert_instance::AlertInstance;
use crate::entities::alert_template::{AlertTemplateVersion, GetTemplateVersion};
use crate::index::SharedIndexStore;
use alertsync_sdk::KeySpace;
use alertsync_sdk::objects::{InstanceProjection, TemplateBundle, TemplateRef};
use kanau::processor::Processor;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

pub struct AlertRuntimeProjector<D> {
    store: SharedIndexStore,
    keys: KeySpace,
    source: Arc<D>,
    settings: ConfigStore<RuntimeSyncSettings>,
}

impl<D> AlertRuntimeProjector<D>
where
    D: Processor<GetTemplateVersion, Output = Option<AlertTemplateVersion>, Error = sqlx::Error>
        + Send
        + Sync,
{
    pub fn new(
        store: SharedIndexStore,
        keys: KeySpace,
        source: Arc<D>,
        settings: ConfigStore<RuntimeSyncSettings>,
    ) -> Self {
        Self {
            store,
            keys,
            source,
            settings,
        }
    }

    fn enabled(&self) -> bool {
        self.settings.current().enabled
    }

    /// Project the compiled bundle of one template version.
    ///
    /// A bundle is immutable once written: replaying the same version is a
    /// no-op, and a different payload under the same key is refused.
    pub async fn project_template_bundle(
        &self,
        template_id: Uuid,
        template_version: i32,
    ) -> Result<SyncOutcome, SyncError> {
        if !self.enabled() {
            return Ok(SyncOutcome::Skipped);
        }
        self.write_bundle(template_id, template_version).await
    }

    /// Project the runtime snapshot of an instance, enabled or not.
    pub async fn project_instance(
        &self,
        instance: &AlertInstance,
    ) -> Result<SyncOutcome, SyncError> {
        if !self.enabled() {
            return Ok(SyncOutcome::Skipped);
        }

        // A disabled snapshot must reach the runtime even when some stored
        // keys are malformed; an enabled one is never written with a partial
        // target set.
        let target_keys = if instance.enabled {
            instance.parsed_target_keys()?
        } else {
            let (keys, rejected) = instance.partition_target_keys();
            for (raw, e) in &rejected {
                warn!(
                    instance_id = %instance.id,
                    target_key = %raw,
                    error = %e,
                    "Dropping malformed target key from disabled snapshot"
                );
            }
            keys
        };

        let bundle_key = self
            .keys
            .template_bundle(instance.template_id, instance.template_version);
        let projection = InstanceProjection {
            instance_id: instance.id,
            user_id: instance.user_id,
            enabled: instance.enabled,
            template: TemplateRef {
                template_id: instance.template_id,
                template_version: instance.template_version,
                bundle_key: bundle_key.clone(),
            },
            target_keys,
            params: instance.params.clone(),
            source_subscription: instance.source_subscription,
            disabled_by_subscription: instance.disabled_by_subscription,
        };
        let payload = serde_json::to_vec(&projection)?;

        if self.store.get(&bundle_key).await?.is_none() {
            // The snapshot is still written: its enabled flag must reach the
            // runtime even while the bundle is unavailable.
            if let Err(e) = self
                .write_bundle(instance.template_id, instance.template_version)
                .await
            {
                warn!(
                    instance_id = %instance.id,
                    template_id = %instance.template_id,
                    template_version = instance.template_version,
                    error = %e,
                    "Pinned template bundle could not be projected"
                );
            }
        }

        self.store
            .set(&self.keys.instance_projection(instance.id), &payload)
            .await?;
        debug!(instance_id = %instance.id, enabled = instance.enabled, "Projected instance");
        Ok(SyncOutcome::Written)
    }

    pub async fn remove_instance(&self, instance_id: Uuid) -> Result<SyncOutcome, SyncError> {
        if !self.enabled() {
            return Ok(SyncOutcome::Skipped);
        }
        self.store
            .delete(&self.keys.instance_projection(instance_id))
            .await?;
        Ok(SyncOutcome::Removed)
    }

    async fn write_bundle(
        &self,
        template_id: Uuid,
        template_version: i32,
    ) -> Result<SyncOutcome, SyncError> {
        let version = self
            .source
            .process(GetTemplateVersion {
                template_id,
                template_version,
            })
            .await?
            .ok_or(SyncError::TemplateNotFound {
                template_id,
                template_version,
            })?;
        let payload = serde_json::to_vec(&TemplateBundle::from(version))?;
        let key = self.keys.template_bundle(template_id, template_version);

        match self.store.get(&key).await? {
            Some(existing) if existing == payload => Ok(SyncOutcome::Unchanged),
            Some(_) => Err(SyncError::BundleConflict { key }),
            None => {
                self.store.set(&key, &payload).await?;
                debug!(%template_id, template_version, "Projected template bundle");
                Ok(SyncOutcome::Written)
            }
        }
    }
}
