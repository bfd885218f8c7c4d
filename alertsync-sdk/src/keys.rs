//! Index store key schema.
//!
//! | Key | Value |
//! |---|---|
//! | `address:{target_key}` | set of alert instance IDs |
//! | `alert:addresses:{alert_id}` | set of target keys the instance is indexed under |
//! | `alert:targets:{alert_id}` or `alert:targets:{user_id}:{alert_id}` | set of resolved target keys |
//! | `template:bundle:{template_id}:{version}` | JSON [`TemplateBundle`](crate::objects::TemplateBundle) |
//! | `instance:projection:{instance_id}` | JSON [`InstanceProjection`](crate::objects::InstanceProjection) |
//! | `channel:{channel_type}:{user_id}` | JSON [`ChannelConfigProjection`](crate::objects::ChannelConfigProjection) |
//! | `template:subscribers:{template_id}` | set of user IDs |
//! | `user:wallet_labels:{user_id}` | JSON [`WalletLabels`](crate::objects::WalletLabels) |
//!
//! Every key is optionally namespaced by a prefix (`{prefix}:address:...`) so
//! several environments can share one store.

use crate::objects::{AlertId, ChannelType, TargetKey, TemplateId, TemplateVersion, UserId};
use std::fmt;

/// Builds fully qualified index keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySpace {
    prefix: Option<String>,
}

impl KeySpace {
    /// Create a key space. An empty prefix is the same as no prefix.
    pub fn new(prefix: Option<String>) -> Self {
        let prefix = prefix
            .map(|p| p.trim_end_matches(':').to_owned())
            .filter(|p| !p.is_empty());
        Self { prefix }
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    fn key(&self, body: fmt::Arguments<'_>) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{body}"),
            None => body.to_string(),
        }
    }

    pub fn address(&self, target: &TargetKey) -> String {
        self.key(format_args!("address:{target}"))
    }

    pub fn alert_addresses(&self, alert_id: AlertId) -> String {
        self.key(format_args!("alert:addresses:{alert_id}"))
    }

    pub fn alert_targets(&self, alert_id: AlertId) -> String {
        self.key(format_args!("alert:targets:{alert_id}"))
    }

    pub fn alert_targets_scoped(&self, user_id: UserId, alert_id: AlertId) -> String {
        self.key(format_args!("alert:targets:{user_id}:{alert_id}"))
    }

    pub fn template_bundle(&self, template_id: TemplateId, version: TemplateVersion) -> String {
        self.key(format_args!("template:bundle:{template_id}:{version}"))
    }

    pub fn instance_projection(&self, instance_id: AlertId) -> String {
        self.key(format_args!("instance:projection:{instance_id}"))
    }

    pub fn channel(&self, channel_type: ChannelType, user_id: UserId) -> String {
        self.key(format_args!("channel:{channel_type}:{user_id}"))
    }

    pub fn template_subscribers(&self, template_id: TemplateId) -> String {
        self.key(format_args!("template:subscribers:{template_id}"))
    }

    pub fn wallet_labels(&self, user_id: UserId) -> String {
        self.key(format_args!("user:wallet_labels:{user_id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_unprefixed_keys() {
        let keys = KeySpace::default();
        let target: TargetKey = "ethereum:mainnet:0xAA".parse().unwrap();
        let id = Uuid::nil();
        assert_eq!(keys.address(&target), "address:ethereum:mainnet:0xaa");
        assert_eq!(
            keys.template_bundle(id, 3),
            "template:bundle:00000000-0000-0000-0000-000000000000:3"
        );
        assert_eq!(keys.channel(ChannelType::Telegram, 42), "channel:telegram:42");
        assert_eq!(keys.wallet_labels(42), "user:wallet_labels:42");
    }

    #[test]
    fn test_prefix_is_normalized() {
        let keys = KeySpace::new(Some("staging:".to_string()));
        assert_eq!(keys.prefix(), Some("staging"));
        assert_eq!(
            keys.template_subscribers(Uuid::nil()),
            "staging:template:subscribers:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(KeySpace::new(Some(String::new())), KeySpace::default());
    }
}
