//! TOML file configuration structures.
//!
//! These structs directly map to the `alertsync.toml` file format.

use alertsync_sdk::objects::ChannelType;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub admin: AdminConfig,
    pub index: IndexConfig,
    #[serde(default)]
    pub runtime_sync: RuntimeSyncConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080))
}

/// Admin configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// The admin secret. If this is plaintext (doesn't start with `$argon2`),
    /// it will be hashed and the config file will be rewritten.
    pub secret: String,
}

/// Index store section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// `redis://`, `rediss://` or `memory://`.
    pub url: String,
    /// Namespace prepended to every key, e.g. `staging`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_prefix: Option<String>,
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_op_timeout_ms() -> u64 {
    500
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

/// Reloadable on SIGHUP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeSyncConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for RuntimeSyncConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Channel types that get a `channel:{type}:{user_id}` projection.
    #[serde(default = "default_managed_channels")]
    pub managed_channels: Vec<ChannelType>,
    #[serde(default)]
    pub scope_targets_by_user: bool,
    /// Postgres NOTIFY channel carrying change notifications.
    #[serde(default = "default_notify_channel")]
    pub notify_channel: String,
    #[serde(default = "default_resync_batch_size")]
    pub resync_batch_size: i64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            managed_channels: default_managed_channels(),
            scope_targets_by_user: false,
            notify_channel: default_notify_channel(),
            resync_batch_size: default_resync_batch_size(),
        }
    }
}

fn default_managed_channels() -> Vec<ChannelType> {
    ChannelType::ALL.to_vec()
}

fn default_notify_channel() -> String {
    "alert_index_events".to_string()
}

fn default_resync_batch_size() -> i64 {
    500
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

impl FileConfig {
    /// Check if the admin secret is already hashed (argon2 format).
    pub fn is_admin_secret_hashed(&self) -> bool {
        self.admin.secret.starts_with("$argon2")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_parsing() {
        let toml_str = r#"
[server]
listen = "127.0.0.1:3000"

[admin]
secret = "test-secret"

[index]
url = "redis://127.0.0.1:6379/2"
key_prefix = "staging"
op_timeout_ms = 250

[runtime_sync]
enabled = false

[sync]
managed_channels = ["telegram", "email"]
scope_targets_by_user = true
notify_channel = "index_changes"
resync_batch_size = 100

[logging]
format = "json"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 3000);
        assert_eq!(config.index.key_prefix.as_deref(), Some("staging"));
        assert_eq!(config.index.op_timeout_ms, 250);
        assert_eq!(config.index.connect_timeout_ms, 5_000);
        assert!(!config.runtime_sync.enabled);
        assert_eq!(
            config.sync.managed_channels,
            vec![ChannelType::Telegram, ChannelType::Email]
        );
        assert!(config.sync.scope_targets_by_user);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(!config.is_admin_secret_hashed());
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let toml_str = r#"
[admin]
secret = "$argon2id$v=19$m=19456,t=2,p=1$abc123"

[index]
url = "memory://"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen, default_listen_addr());
        assert!(config.runtime_sync.enabled);
        assert_eq!(config.sync.managed_channels.len(), ChannelType::ALL.len());
        assert_eq!(config.sync.notify_channel, "alert_index_events");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.is_admin_secret_hashed());
    }
}
