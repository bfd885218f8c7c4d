//! Change notification ingestion.
//!
//! The relational side publishes [`ChangeNotification`] payloads with
//! `pg_notify`. The listener decodes each payload, turns it into an
//! [`IndexEvent`] (re-reading the instance row for saves) and forwards it to
//! the dispatcher. Payloads that cannot be decoded or resolved are logged and
//! dropped; a later save or a resync repairs what they would have changed.

use alertsync_core::entities::alert_instance::{AlertInstance, GetAlertInstanceById};
use alertsync_core::events::{IndexEvent, IndexEventSender};
use alertsync_core::framework::DatabaseProcessor;
use alertsync_sdk::objects::ChangeNotification;
use kanau::processor::Processor;
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("malformed notification payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("failed to resolve notification: {0}")]
    Database(#[from] sqlx::Error),
}

/// Map a decoded notification to the event the dispatcher consumes.
///
/// Returns `None` for saves whose row is already gone; the matching delete
/// notification follows.
pub async fn resolve<D>(
    db: &D,
    notification: ChangeNotification,
) -> Result<Option<IndexEvent>, NotificationError>
where
    D: Processor<GetAlertInstanceById, Output = Option<AlertInstance>, Error = sqlx::Error>,
{
    let event = match notification {
        ChangeNotification::InstanceSaved {
            instance_id,
            was_created,
        } => {
            let Some(instance) = db.process(GetAlertInstanceById { id: instance_id }).await? else {
                debug!(%instance_id, "Saved instance no longer exists, skipping");
                return Ok(None);
            };
            IndexEvent::InstanceSaved {
                instance,
                was_created,
            }
        }
        ChangeNotification::InstanceDeleted {
            instance_id,
            user_id,
            template_id,
        } => IndexEvent::InstanceDeleted {
            instance_id,
            user_id,
            template_id,
        },
        ChangeNotification::TemplateVersionSaved {
            template_id,
            template_version,
        } => IndexEvent::TemplateVersionSaved {
            template_id,
            template_version,
        },
        ChangeNotification::ChannelEndpointChanged {
            user_id,
            channel_type,
        } => IndexEvent::ChannelEndpointChanged {
            user_id,
            channel_type,
        },
        ChangeNotification::GroupMembershipChanged { group_id, owner_id } => {
            IndexEvent::GroupMembershipChanged { group_id, owner_id }
        }
    };
    Ok(Some(event))
}

pub struct NotificationListener {
    pool: PgPool,
    channel: String,
    event_tx: IndexEventSender,
}

impl NotificationListener {
    pub fn new(pool: PgPool, channel: String, event_tx: IndexEventSender) -> Self {
        Self {
            pool,
            channel,
            event_tx,
        }
    }

    async fn handle(&self, db: &DatabaseProcessor, payload: &str) -> Result<(), NotificationError> {
        let notification = ChangeNotification::from_payload(payload)?;
        if let Some(event) = resolve(db, notification).await? {
            if self.event_tx.send(event).await.is_err() {
                warn!("Dispatcher is gone, dropping event");
            }
        }
        Ok(())
    }

    /// Listen until shutdown is signalled or the dispatcher goes away.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) -> Result<(), sqlx::Error> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(&self.channel).await?;
        let db = DatabaseProcessor {
            pool: self.pool.clone(),
        };
        info!(channel = %self.channel, "NotificationListener started");

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("NotificationListener received shutdown signal");
                        break;
                    }
                }

                received = listener.recv() => {
                    match received {
                        Ok(notification) => {
                            if let Err(e) = self.handle(&db, notification.payload()).await {
                                error!(
                                    error = %e,
                                    payload = notification.payload(),
                                    "Dropping change notification"
                                );
                            }
                            if self.event_tx.is_closed() {
                                info!("IndexEvent channel closed");
                                break;
                            }
                        }
                        Err(e) => {
                            // The next recv reconnects and re-subscribes.
                            warn!(error = %e, "Notification connection lost");
                            tokio::time::sleep(RECONNECT_BACKOFF).await;
                        }
                    }
                }
            }
        }

        info!("NotificationListener shutdown complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use uuid::Uuid;

    #[derive(Default)]
    struct Rows(HashMap<Uuid, AlertInstance>);

    impl Processor<GetAlertInstanceById> for Rows {
        type Output = Option<AlertInstance>;
        type Error = sqlx::Error;
        async fn process(
            &self,
            query: GetAlertInstanceById,
        ) -> Result<Option<AlertInstance>, sqlx::Error> {
            Ok(self.0.get(&query.id).cloned())
        }
    }

    fn row(id: Uuid) -> AlertInstance {
        AlertInstance {
            id,
            user_id: 1,
            enabled: true,
            template_id: Uuid::new_v4(),
            template_version: 1,
            target_keys: vec!["evm:1:0xaaa".to_string()],
            params: json!({}),
            source_subscription: None,
            disabled_by_subscription: false,
        }
    }

    #[tokio::test]
    async fn test_saved_instance_is_reread() {
        let id = Uuid::new_v4();
        let rows = Rows(HashMap::from([(id, row(id))]));
        let notification = ChangeNotification::InstanceSaved {
            instance_id: id,
            was_created: true,
        };

        let event = resolve(&rows, notification).await.unwrap();

        assert!(matches!(
            event,
            Some(IndexEvent::InstanceSaved { instance, was_created: true }) if instance.id == id
        ));
    }

    #[tokio::test]
    async fn test_saved_instance_already_gone() {
        let notification = ChangeNotification::InstanceSaved {
            instance_id: Uuid::new_v4(),
            was_created: false,
        };

        let event = resolve(&Rows::default(), notification).await.unwrap();

        assert!(event.is_none());
    }

    #[tokio::test]
    async fn test_identifier_only_notifications_pass_through() {
        let group_id = Uuid::new_v4();
        let payload = format!(
            r#"{{"type":"group_membership_changed","group_id":"{group_id}","owner_id":3}}"#
        );
        let notification = ChangeNotification::from_payload(&payload).unwrap();

        let event = resolve(&Rows::default(), notification).await.unwrap();

        assert!(matches!(
            event,
            Some(IndexEvent::GroupMembershipChanged { group_id: g, owner_id: 3 }) if g == group_id
        ));
    }

    #[test]
    fn test_malformed_payload() {
        let err = ChangeNotification::from_payload(r#"{"type":"nope"}"#)
            .map_err(NotificationError::from)
            .unwrap_err();
        assert!(matches!(err, NotificationError::Decode(_)));
    }
}
