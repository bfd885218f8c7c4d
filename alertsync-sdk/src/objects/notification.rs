//! Wire form of relational change notifications.
//!
//! The relational side publishes one JSON object per committed change. The
//! payload is internally tagged on `"type"`:
//!
//! ```json
//! {"type":"instance_saved","instance_id":"...","was_created":true}
//! {"type":"instance_deleted","instance_id":"...","user_id":42,"template_id":"..."}
//! {"type":"channel_endpoint_changed","user_id":42,"channel_type":"telegram"}
//! ```
//!
//! Notifications carry identifiers only. Deletions carry the denormalized
//! identity needed to clean up without reading the (already gone) row.

use super::channel::ChannelType;
use super::{AlertId, TemplateId, TemplateVersion, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeNotification {
    InstanceSaved {
        instance_id: AlertId,
        was_created: bool,
    },
    InstanceDeleted {
        instance_id: AlertId,
        user_id: UserId,
        #[serde(default)]
        template_id: Option<TemplateId>,
    },
    TemplateVersionSaved {
        template_id: TemplateId,
        template_version: TemplateVersion,
    },
    ChannelEndpointChanged {
        user_id: UserId,
        channel_type: ChannelType,
    },
    GroupMembershipChanged {
        group_id: Uuid,
        owner_id: UserId,
    },
}

impl ChangeNotification {
    pub fn from_payload(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_instance_deleted_without_template() {
        let id = Uuid::new_v4();
        let payload = format!(r#"{{"type":"instance_deleted","instance_id":"{id}","user_id":7}}"#);
        let decoded = ChangeNotification::from_payload(&payload).unwrap();
        assert_eq!(
            decoded,
            ChangeNotification::InstanceDeleted {
                instance_id: id,
                user_id: 7,
                template_id: None,
            }
        );
    }

    #[test]
    fn test_decode_channel_change() {
        let payload = r#"{"type":"channel_endpoint_changed","user_id":3,"channel_type":"telegram"}"#;
        let decoded = ChangeNotification::from_payload(payload).unwrap();
        assert_eq!(
            decoded,
            ChangeNotification::ChannelEndpointChanged {
                user_id: 3,
                channel_type: ChannelType::Telegram,
            }
        );
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(ChangeNotification::from_payload(r#"{"type":"wallet_funded"}"#).is_err());
    }
}
