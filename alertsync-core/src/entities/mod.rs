pub mod alert_instance;
pub mod alert_template;
pub mod channel_endpoint;
pub mod group;

use alertsync_sdk::objects::ChannelType as SdkChannelType;

/// Channel type for database operations.
///
/// This is the sqlx::Type version. For projection payloads, see `alertsync_sdk::objects::ChannelType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "channel_type")]
pub enum ChannelTypeName {
    Telegram,
    Slack,
    Email,
    Discord,
    Webhook,
}

impl From<ChannelTypeName> for SdkChannelType {
    fn from(value: ChannelTypeName) -> Self {
        match value {
            ChannelTypeName::Telegram => SdkChannelType::Telegram,
            ChannelTypeName::Slack => SdkChannelType::Slack,
            ChannelTypeName::Email => SdkChannelType::Email,
            ChannelTypeName::Discord => SdkChannelType::Discord,
            ChannelTypeName::Webhook => SdkChannelType::Webhook,
        }
    }
}

impl From<SdkChannelType> for ChannelTypeName {
    fn from(value: SdkChannelType) -> Self {
        match value {
            SdkChannelType::Telegram => ChannelTypeName::Telegram,
            SdkChannelType::Slack => ChannelTypeName::Slack,
            SdkChannelType::Email => ChannelTypeName::Email,
            SdkChannelType::Discord => ChannelTypeName::Discord,
            SdkChannelType::Webhook => ChannelTypeName::Webhook,
        }
    }
}

/// Offset pagination used by the full resync walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub fn first(limit: i64) -> Self {
        Self {
            limit: limit.max(1),
            offset: 0,
        }
    }

    pub fn next(self) -> Self {
        Self {
            limit: self.limit,
            offset: self.offset + self.limit,
        }
    }
}
