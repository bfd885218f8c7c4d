//! IndexDispatcher processor.
//!
//! The IndexDispatcher is responsible for:
//! - Receiving `IndexEvent`s, either through the `Processor` trait or from the
//!   event channel in [`IndexDispatcher::run`]
//! - Running every synchronizer that reacts to the event, one after another
//! - Isolating failures: a failing synchronizer is logged with the entity
//!   kind, entity ID and error, and never prevents the others from running
//!
//! Dispatch never fails and never retries. The returned [`DispatchReport`]
//! records what each synchronizer did.

use super::{
    AddressIndexSynchronizer, AlertRuntimeProjector, ChannelConfigSynchronizer,
    GroupTargetSynchronizer, SourceOfTruth, SubscriptionIndexSynchronizer, SyncError, SyncOutcome,
    WalletLabelSynchronizer,
};
use crate::config::{ConfigStore, ConfigWatcher, RuntimeSyncSettings, SyncOptions};
use crate::events::{IndexEvent, IndexEventReceiver};
use crate::index::SharedIndexStore;
use alertsync_sdk::objects::ChannelType;
use kanau::processor::Processor;
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info};

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// Identifies a synchronizer in reports and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynchronizerKind {
    AddressIndex,
    GroupTargets,
    RuntimeProjector,
    ChannelConfig(ChannelType),
    SubscriptionIndex,
    WalletLabels,
}

impl fmt::Display for SynchronizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynchronizerKind::AddressIndex => f.write_str("address_index"),
            SynchronizerKind::GroupTargets => f.write_str("group_targets"),
            SynchronizerKind::RuntimeProjector => f.write_str("runtime_projector"),
            SynchronizerKind::ChannelConfig(channel_type) => {
                write!(f, "channel_config:{channel_type}")
            }
            SynchronizerKind::SubscriptionIndex => f.write_str("subscription_index"),
            SynchronizerKind::WalletLabels => f.write_str("wallet_labels"),
        }
    }
}

/// Result of one synchronizer reacting to one event.
#[derive(Debug)]
pub struct Reaction {
    pub synchronizer: SynchronizerKind,
    pub result: Result<SyncOutcome, SyncError>,
}

/// Everything that happened while dispatching one event.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub reactions: Vec<Reaction>,
}

impl DispatchReport {
    fn record(&mut self, synchronizer: SynchronizerKind, result: Result<SyncOutcome, SyncError>) {
        self.reactions.push(Reaction {
            synchronizer,
            result,
        });
    }

    pub fn failures(&self) -> impl Iterator<Item = (SynchronizerKind, &SyncError)> {
        self.reactions
            .iter()
            .filter_map(|r| r.result.as_ref().err().map(|e| (r.synchronizer, e)))
    }

    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Outcome of a synchronizer, if it ran and succeeded.
    pub fn outcome(&self, synchronizer: SynchronizerKind) -> Option<SyncOutcome> {
        self.reactions
            .iter()
            .find(|r| r.synchronizer == synchronizer)
            .and_then(|r| r.result.as_ref().ok().copied())
    }
}

// ---------------------------------------------------------------------------
// IndexDispatcher
// ---------------------------------------------------------------------------

pub struct IndexDispatcher<D> {
    pub(super) address: AddressIndexSynchronizer,
    pub(super) group_targets: GroupTargetSynchronizer<D>,
    pub(super) projector: AlertRuntimeProjector<D>,
    pub(super) channels: Vec<ChannelConfigSynchronizer<D>>,
    pub(super) subscriptions: SubscriptionIndexSynchronizer,
    pub(super) wallet_labels: WalletLabelSynchronizer<D>,
    pub(super) source: Arc<D>,
}

impl<D: SourceOfTruth> IndexDispatcher<D> {
    /// Build every synchronizer over one shared store and source.
    pub fn new(
        store: SharedIndexStore,
        source: Arc<D>,
        options: SyncOptions,
        runtime_sync: ConfigStore<RuntimeSyncSettings>,
    ) -> Self {
        let keys = options.keys;
        let mut managed = options.managed_channels;
        managed.sort();
        managed.dedup();

        let channels = managed
            .into_iter()
            .map(|channel_type| {
                ChannelConfigSynchronizer::new(
                    channel_type,
                    store.clone(),
                    keys.clone(),
                    source.clone(),
                )
            })
            .collect();

        Self {
            address: AddressIndexSynchronizer::new(store.clone(), keys.clone()),
            group_targets: GroupTargetSynchronizer::new(
                store.clone(),
                keys.clone(),
                source.clone(),
                options.scope_targets_by_user,
            ),
            projector: AlertRuntimeProjector::new(
                store.clone(),
                keys.clone(),
                source.clone(),
                runtime_sync,
            ),
            channels,
            subscriptions: SubscriptionIndexSynchronizer::new(store.clone(), keys.clone()),
            wallet_labels: WalletLabelSynchronizer::new(store, keys, source.clone()),
            source,
        }
    }

    /// Run every synchronizer that reacts to `event`.
    pub async fn dispatch(&self, event: &IndexEvent) -> DispatchReport {
        let mut report = DispatchReport::default();

        match event {
            IndexEvent::InstanceSaved {
                instance,
                was_created,
            } => {
                report.record(
                    SynchronizerKind::AddressIndex,
                    self.address.on_saved(instance, *was_created).await,
                );
                report.record(
                    SynchronizerKind::GroupTargets,
                    self.group_targets.on_saved(instance, *was_created).await,
                );
                report.record(
                    SynchronizerKind::RuntimeProjector,
                    self.projector.project_instance(instance).await,
                );
                report.record(
                    SynchronizerKind::SubscriptionIndex,
                    self.subscriptions.on_saved(instance).await,
                );
            }
            IndexEvent::InstanceDeleted {
                instance_id,
                user_id,
                template_id,
            } => {
                report.record(
                    SynchronizerKind::AddressIndex,
                    self.address.on_deleted(*instance_id).await,
                );
                report.record(
                    SynchronizerKind::GroupTargets,
                    self.group_targets.on_deleted(*instance_id, *user_id).await,
                );
                report.record(
                    SynchronizerKind::RuntimeProjector,
                    self.projector.remove_instance(*instance_id).await,
                );
                report.record(
                    SynchronizerKind::SubscriptionIndex,
                    self.subscriptions.on_deleted(*user_id, *template_id).await,
                );
            }
            IndexEvent::TemplateVersionSaved {
                template_id,
                template_version,
            } => {
                report.record(
                    SynchronizerKind::RuntimeProjector,
                    self.projector
                        .project_template_bundle(*template_id, *template_version)
                        .await,
                );
            }
            IndexEvent::ChannelEndpointChanged {
                user_id,
                channel_type,
            } => {
                let mut managed = false;
                for sync in self
                    .channels
                    .iter()
                    .filter(|s| s.channel_type() == *channel_type)
                {
                    managed = true;
                    report.record(
                        SynchronizerKind::ChannelConfig(*channel_type),
                        sync.on_changed(*user_id).await,
                    );
                }
                if !managed {
                    debug!(%channel_type, user_id, "Channel type not managed, ignoring");
                }
            }
            IndexEvent::GroupMembershipChanged { group_id, owner_id } => {
                report.record(
                    SynchronizerKind::GroupTargets,
                    self.group_targets.on_group_changed(*group_id).await,
                );
                report.record(
                    SynchronizerKind::WalletLabels,
                    self.wallet_labels.on_owner_changed(*owner_id).await,
                );
            }
        }

        for (synchronizer, e) in report.failures() {
            error!(
                entity_type = event.entity_kind(),
                entity_id = %event.entity_id(),
                %synchronizer,
                error_class = e.class(),
                error = %e,
                "Index synchronization failed"
            );
        }
        report
    }

    /// Consume events until shutdown is signalled or every sender is gone.
    ///
    /// Events are handled one at a time, in arrival order.
    pub async fn run(
        self: Arc<Self>,
        mut shutdown_rx: watch::Receiver<bool>,
        mut event_rx: IndexEventReceiver,
        mut config_watcher: ConfigWatcher<RuntimeSyncSettings>,
    ) {
        info!(channels = self.channels.len(), "IndexDispatcher started");

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("IndexDispatcher received shutdown signal");
                        break;
                    }
                }

                Ok(settings) = config_watcher.changed() => {
                    info!(
                        runtime_sync_enabled = settings.enabled,
                        "Runtime sync settings changed"
                    );
                }

                event = event_rx.recv() => {
                    let Some(event) = event else {
                        info!("IndexEvent channel closed");
                        break;
                    };
                    let report = self.dispatch(&event).await;
                    debug!(
                        entity_type = event.entity_kind(),
                        entity_id = %event.entity_id(),
                        reactions = report.reactions.len(),
                        clean = report.is_clean(),
                        "Dispatched IndexEvent"
                    );
                }
            }
        }

        info!("IndexDispatcher shutdown complete");
    }
}

// ---------------------------------------------------------------------------
// Processor trait implementation
// ---------------------------------------------------------------------------

impl<D: SourceOfTruth> Processor<IndexEvent> for IndexDispatcher<D> {
    type Output = DispatchReport;
    type Error = Infallible;

    async fn process(&self, event: IndexEvent) -> Result<DispatchReport, Infallible> {
        Ok(self.dispatch(&event).await)
    }
}
