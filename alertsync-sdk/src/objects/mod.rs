pub mod channel;
pub mod notification;
pub mod projection;
pub mod target;

pub use channel::{ChannelType, UnknownChannelType};
pub use notification::ChangeNotification;
pub use projection::{
    ChannelConfigProjection, ChannelEndpointProjection, InstanceProjection, TemplateBundle,
    TemplateRef, WalletLabels,
};
pub use target::{TargetKey, TargetKeyError};

/// Opaque alert instance identity.
pub type AlertId = uuid::Uuid;
/// Alert template identity.
pub type TemplateId = uuid::Uuid;
/// Monotonic version number of a template.
pub type TemplateVersion = i32;
/// Owning user identity.
pub type UserId = i64;
