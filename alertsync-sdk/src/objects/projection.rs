//! Projection payloads stored in the index store.
//!
//! All payloads are serialized as JSON. Object keys inside `serde_json::Value`
//! are kept in sorted order and list fields are sorted by the writer, so the
//! same source state always serializes to the same bytes.

use super::channel::ChannelType;
use super::target::TargetKey;
use super::{AlertId, TemplateId, TemplateVersion, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// The pinned compiled specification and executable for one template version.
///
/// Stored at `template:bundle:{template_id}:{version}` and never rewritten once
/// projected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateBundle {
    pub template_id: TemplateId,
    pub template_version: TemplateVersion,
    pub spec: serde_json::Value,
    pub executable: serde_json::Value,
}

/// Reference from an instance to the bundle it is pinned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRef {
    pub template_id: TemplateId,
    pub template_version: TemplateVersion,
    /// Fully qualified index key of the bundle.
    pub bundle_key: String,
}

/// Runtime-ready snapshot of an alert instance.
///
/// Written on every save regardless of `enabled`; the runtime must honor the
/// flag instead of relying on key presence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceProjection {
    pub instance_id: AlertId,
    pub user_id: UserId,
    pub enabled: bool,
    pub template: TemplateRef,
    pub target_keys: Vec<TargetKey>,
    pub params: serde_json::Value,
    pub source_subscription: Option<Uuid>,
    pub disabled_by_subscription: bool,
}

/// One enabled, verified endpoint inside a channel projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelEndpointProjection {
    pub endpoint_id: Uuid,
    pub config: serde_json::Value,
}

/// All deliverable endpoints of one channel type for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfigProjection {
    pub user_id: UserId,
    pub channel_type: ChannelType,
    pub endpoints: Vec<ChannelEndpointProjection>,
}

/// Address to human label map for one user, stored at `user:wallet_labels:{user_id}`.
///
/// Keyed by the bare address, without network or subnet: the same address
/// labelled on two networks collapses to one entry, and the label of the
/// first member in (target key, group ID) order wins.
pub type WalletLabels = BTreeMap<String, String>;
