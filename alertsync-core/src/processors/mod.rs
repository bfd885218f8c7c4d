//! Synchronizers that project relational state into the index store.
//!
//! - `AddressIndexSynchronizer`: target key -> watching alert instances
//! - `GroupTargetSynchronizer`: alert instance -> resolved group members
//! - `AlertRuntimeProjector`: template bundles and instance snapshots
//! - `ChannelConfigSynchronizer`: per user, per channel type delivery config
//! - `SubscriptionIndexSynchronizer`: template -> subscribed users
//! - `WalletLabelSynchronizer`: user -> address labels
//! - `IndexDispatcher`: routes each `IndexEvent` to the synchronizers above
//!   and is the failure boundary between them
//!
//! Every synchronizer entry point returns `Result<SyncOutcome, SyncError>`.
//! Nothing is retried; the next save of the same entity or a full resync
//! converges the index again.

pub mod address_index;
pub mod channel_config;
pub mod dispatcher;
pub mod group_targets;
pub mod resync;
pub mod runtime_projector;
pub mod source;
pub mod subscription_index;
pub mod wallet_labels;

pub use address_index::AddressIndexSynchronizer;
pub use channel_config::ChannelConfigSynchronizer;
pub use dispatcher::{DispatchReport, IndexDispatcher, Reaction, SynchronizerKind};
pub use group_targets::GroupTargetSynchronizer;
pub use resync::{FullResync, ResyncInstance, ResyncReport};
pub use runtime_projector::AlertRuntimeProjector;
pub use source::SourceOfTruth;
pub use subscription_index::SubscriptionIndexSynchronizer;
pub use wallet_labels::WalletLabelSynchronizer;

use crate::index::IndexError;
use alertsync_sdk::objects::TargetKeyError;
use thiserror::Error;
use uuid::Uuid;

/// Errors a synchronizer reaction can end with.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Index store unreachable, timed out, or rejected a command.
    #[error("index store error: {0}")]
    Index(#[from] IndexError),

    /// Reading the source of truth failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A projection payload could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The entity holds a malformed target key.
    #[error("invalid target key: {0}")]
    InvalidTargetKey(#[from] TargetKeyError),

    #[error("template version not found: {template_id}@{template_version}")]
    TemplateNotFound {
        template_id: Uuid,
        template_version: i32,
    },

    #[error("group subscription not found: {0}")]
    SubscriptionNotFound(Uuid),

    /// A different payload is already projected for this pinned version.
    #[error("template bundle `{key}` is already projected with different content")]
    BundleConflict { key: String },

    /// Some of the instances touched by a fan-out reaction failed.
    #[error("{failed} of {total} instances failed to resync")]
    PartialFailure { failed: usize, total: usize },
}

impl SyncError {
    /// Coarse error class, used as a log field.
    pub fn class(&self) -> &'static str {
        match self {
            SyncError::Index(_) => "index",
            SyncError::Database(_) => "database",
            SyncError::Serialization(_) | SyncError::InvalidTargetKey(_) => "serialization",
            SyncError::TemplateNotFound { .. }
            | SyncError::SubscriptionNotFound(_)
            | SyncError::BundleConflict { .. } => "resolution",
            SyncError::PartialFailure { .. } => "partial",
        }
    }
}

/// What a successful reaction did to the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Keys were written.
    Written,
    /// Keys or memberships were removed.
    Removed,
    /// The stored projection already matched.
    Unchanged,
    /// Nothing applied to this event (feature off, unrelated entity).
    Skipped,
}
