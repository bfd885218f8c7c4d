//! Event type definitions.

use crate::entities::alert_instance::AlertInstance;
use alertsync_sdk::objects::ChannelType;
use std::fmt;
use uuid::Uuid;

/// The closed set of changes the index reacts to.
#[derive(Debug, Clone)]
pub enum IndexEvent {
    /// An alert instance row was inserted or updated.
    InstanceSaved {
        instance: AlertInstance,
        /// `false` for updates. Creations skip the stale-entry removal pass.
        was_created: bool,
    },
    /// An alert instance row was deleted. Carries the identity needed to clean
    /// up without the row.
    InstanceDeleted {
        instance_id: Uuid,
        user_id: i64,
        template_id: Option<Uuid>,
    },
    /// A template version was compiled and stored.
    TemplateVersionSaved {
        template_id: Uuid,
        template_version: i32,
    },
    /// Any endpoint of this user and channel type was saved or deleted.
    ChannelEndpointChanged {
        user_id: i64,
        channel_type: ChannelType,
    },
    /// Members were added to or removed from a group.
    GroupMembershipChanged { group_id: Uuid, owner_id: i64 },
}

impl IndexEvent {
    /// Entity kind, used in logs.
    pub fn entity_kind(&self) -> &'static str {
        match self {
            IndexEvent::InstanceSaved { .. } | IndexEvent::InstanceDeleted { .. } => {
                "alert_instance"
            }
            IndexEvent::TemplateVersionSaved { .. } => "alert_template_version",
            IndexEvent::ChannelEndpointChanged { .. } => "notification_channel_endpoint",
            IndexEvent::GroupMembershipChanged { .. } => "generic_group",
        }
    }

    /// Identity of the changed entity, used in logs.
    pub fn entity_id(&self) -> EntityId {
        match self {
            IndexEvent::InstanceSaved { instance, .. } => EntityId::Instance(instance.id),
            IndexEvent::InstanceDeleted { instance_id, .. } => EntityId::Instance(*instance_id),
            IndexEvent::TemplateVersionSaved {
                template_id,
                template_version,
            } => EntityId::TemplateVersion(*template_id, *template_version),
            IndexEvent::ChannelEndpointChanged {
                user_id,
                channel_type,
            } => EntityId::Channel(*user_id, *channel_type),
            IndexEvent::GroupMembershipChanged { group_id, .. } => EntityId::Group(*group_id),
        }
    }
}

/// Printable entity identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityId {
    Instance(Uuid),
    TemplateVersion(Uuid, i32),
    Channel(i64, ChannelType),
    Group(Uuid),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Instance(id) | EntityId::Group(id) => write!(f, "{id}"),
            EntityId::TemplateVersion(id, version) => write!(f, "{id}@{version}"),
            EntityId::Channel(user_id, channel_type) => write!(f, "{channel_type}:{user_id}"),
        }
    }
}
