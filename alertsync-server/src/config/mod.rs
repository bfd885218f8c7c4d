//! Configuration module for alertsync-server.
//!
//! Handles loading configuration from TOML files, CLI arguments,
//! and environment variables. Also handles admin secret hashing.

pub mod file;
pub mod runtime;

use crate::config::file::{FileConfig, LogFormat};
use crate::config::runtime::{AdminConfig, ListenerConfig, ServerConfig};
use alertsync_core::config::{IndexStoreConfig, RuntimeSyncSettings, SyncOptions};
use alertsync_sdk::KeySpace;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("password hashing error: {0}")]
    HashError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Loaded configuration result containing all parts.
#[derive(Debug)]
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub admin: AdminConfig,
    pub index: IndexStoreConfig,
    pub runtime_sync: RuntimeSyncSettings,
    pub sync: SyncOptions,
    pub listener: ListenerConfig,
    pub resync_batch_size: i64,
    pub log_format: LogFormat,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Validate the configuration
    /// 3. Hash the admin secret if it's plaintext (and rewrite the file)
    /// 4. Apply CLI overrides
    /// 5. Build the loaded configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let mut file_config: FileConfig = toml::from_str(&config_content)?;

        validate(&file_config)?;

        let secret_hash = if file_config.is_admin_secret_hashed() {
            file_config.admin.secret.clone()
        } else {
            let hash = hash_secret(&file_config.admin.secret)?;
            file_config.admin.secret = hash.clone();
            self.rewrite_config(&file_config)?;
            tracing::info!("Admin secret hashed and config file updated");
            hash
        };

        // Applied after the rewrite so the override never lands in the file.
        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        Ok(build_loaded_config(file_config, secret_hash))
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }

    fn rewrite_config(&self, config: &FileConfig) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(config)?;

        // Write to a sibling temp file, then rename over the original.
        let temp_path = self.config_path.with_extension("toml.tmp");
        std::fs::write(&temp_path, toml_string)?;
        std::fs::rename(&temp_path, &self.config_path)?;

        Ok(())
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.index.url).map_err(|e| {
        ConfigError::ValidationError(format!("index.url `{}`: {e}", config.index.url))
    })?;
    if !matches!(url.scheme(), "redis" | "rediss" | "memory") {
        return Err(ConfigError::ValidationError(format!(
            "index.url scheme `{}` is not supported, expected redis, rediss or memory",
            url.scheme()
        )));
    }
    if config.index.op_timeout_ms == 0 || config.index.connect_timeout_ms == 0 {
        return Err(ConfigError::ValidationError(
            "index timeouts must be greater than zero".to_string(),
        ));
    }
    if config.sync.resync_batch_size <= 0 {
        return Err(ConfigError::ValidationError(
            "sync.resync_batch_size must be greater than zero".to_string(),
        ));
    }
    let channel = &config.sync.notify_channel;
    if channel.is_empty() || !channel.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ConfigError::ValidationError(format!(
            "sync.notify_channel `{channel}` must be a plain identifier"
        )));
    }
    if config.admin.secret.is_empty() {
        return Err(ConfigError::ValidationError(
            "admin.secret must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Hash a plaintext secret into an argon2 PHC string.
pub fn hash_secret(plaintext: &str) -> Result<String, ConfigError> {
    use argon2::{
        Argon2, PasswordHasher,
        password_hash::{SaltString, rand_core::OsRng},
    };

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ConfigError::HashError(e.to_string()))
}

fn build_loaded_config(file_config: FileConfig, secret_hash: String) -> LoadedConfig {
    let index = file_config.index;
    let sync = file_config.sync;

    LoadedConfig {
        server: ServerConfig {
            listen: file_config.server.listen,
        },
        admin: AdminConfig::new(secret_hash),
        index: IndexStoreConfig {
            url: index.url,
            connect_timeout: Duration::from_millis(index.connect_timeout_ms),
            op_timeout: Duration::from_millis(index.op_timeout_ms),
        },
        runtime_sync: RuntimeSyncSettings {
            enabled: file_config.runtime_sync.enabled,
        },
        sync: SyncOptions {
            keys: KeySpace::new(index.key_prefix),
            scope_targets_by_user: sync.scope_targets_by_user,
            managed_channels: sync.managed_channels,
        },
        listener: ListenerConfig {
            channel: sync.notify_channel,
        },
        resync_batch_size: sync.resync_batch_size,
        log_format: file_config.logging.format,
    }
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("alertsync-{}-{name}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("alertsync.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_plaintext_secret_is_hashed_and_rewritten() {
        let path = write_config(
            "hash",
            r#"
[admin]
secret = "hunter2"

[index]
url = "memory://"
key_prefix = "dev:"
"#,
        );

        let loaded = ConfigLoader::new(&path, None).load().unwrap();

        assert!(loaded.admin.verify_secret("hunter2"));
        assert_eq!(loaded.sync.keys.prefix(), Some("dev"));
        let rewritten: FileConfig =
            toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(rewritten.is_admin_secret_hashed());

        // A second load keeps the existing hash.
        let again = ConfigLoader::new(&path, None).load().unwrap();
        assert!(again.admin.verify_secret("hunter2"));
    }

    #[test]
    fn test_listen_override() {
        let path = write_config(
            "listen",
            r#"
[admin]
secret = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHQ$aGFzaA"

[index]
url = "redis://localhost"
"#,
        );
        let listen: SocketAddr = "127.0.0.1:9999".parse().unwrap();

        let loaded = ConfigLoader::new(&path, Some(listen)).load().unwrap();

        assert_eq!(loaded.server.listen, listen);
        assert_eq!(loaded.index.op_timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_rejects_unknown_index_scheme() {
        let path = write_config(
            "scheme",
            r#"
[admin]
secret = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHQ$aGFzaA"

[index]
url = "http://localhost:6379"
"#,
        );

        let err = ConfigLoader::new(&path, None).load().unwrap_err();

        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_rejects_bad_notify_channel() {
        let path = write_config(
            "channel",
            r#"
[admin]
secret = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHQ$aGFzaA"

[index]
url = "memory://"

[sync]
notify_channel = "events; DROP TABLE"
"#,
        );

        let err = ConfigLoader::new(&path, None).load().unwrap_err();

        assert!(matches!(err, ConfigError::ValidationError(_)));
    }
}
