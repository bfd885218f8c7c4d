//! Configuration types for the synchronization layer.
//!
//! These are validated runtime values handed to constructors. Loading and
//! parsing the configuration file is handled by the server crate.

mod config_store;

pub use config_store::{ConfigStore, ConfigWatcher};

use alertsync_sdk::KeySpace;
use alertsync_sdk::objects::ChannelType;
use std::time::Duration;

/// Settings that may change while the process runs (reloaded on SIGHUP).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeSyncSettings {
    /// Gates every alert runtime projection. When off, the projector never
    /// touches the index store.
    pub enabled: bool,
}

impl Default for RuntimeSyncSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Settings fixed for the lifetime of a dispatcher.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub keys: KeySpace,
    /// Write group target sets under `alert:targets:{user_id}:{alert_id}`.
    pub scope_targets_by_user: bool,
    /// One channel config synchronizer is created per listed type.
    pub managed_channels: Vec<ChannelType>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            keys: KeySpace::default(),
            scope_targets_by_user: false,
            managed_channels: ChannelType::ALL.to_vec(),
        }
    }
}

/// Connection settings of the index store.
#[derive(Debug, Clone)]
pub struct IndexStoreConfig {
    /// `redis://` / `rediss://` URL, or `memory://` for an in-process store.
    pub url: String,
    pub connect_timeout: Duration,
    /// Upper bound for every single command.
    pub op_timeout: Duration,
}

impl IndexStoreConfig {
    pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_millis(500);
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn is_in_memory(&self) -> bool {
        self.url.starts_with("memory://")
    }
}
