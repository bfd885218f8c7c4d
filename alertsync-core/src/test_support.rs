//! In-memory source of truth and fixtures for synchronizer tests.

use crate::entities::ChannelTypeName;
use crate::entities::Page;
use crate::entities::alert_instance::{
    AlertInstance, GetAlertInstanceById, ListAlertInstances, ListAlertInstancesForGroup,
};
use crate::entities::alert_template::{
    AlertTemplateVersion, GetTemplateVersion, ListTemplateVersionKeys, TemplateVersionKey,
};
use crate::entities::channel_endpoint::{
    ChannelEndpointOwner, ListChannelEndpointOwners, ListUserChannelEndpoints,
    NotificationChannelEndpoint,
};
use crate::entities::group::{
    GetGroupSubscription, GroupMember, GroupSubscription, ListGroupMembers, ListGroupOwners,
    ListOwnerGroupMembers,
};
use alertsync_sdk::objects::ChannelType;
use kanau::processor::Processor;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

pub(crate) const USER: i64 = 7;

#[derive(Debug, Default)]
pub(crate) struct FakeSource {
    state: Mutex<FakeState>,
    failing: AtomicBool,
}

#[derive(Debug, Default)]
struct FakeState {
    instances: BTreeMap<Uuid, AlertInstance>,
    templates: BTreeMap<(Uuid, i32), AlertTemplateVersion>,
    endpoints: BTreeMap<Uuid, NotificationChannelEndpoint>,
    subscriptions: BTreeMap<Uuid, GroupSubscription>,
    group_owners: BTreeMap<Uuid, i64>,
    members: BTreeMap<Uuid, Vec<GroupMember>>,
}

fn page<T: Clone>(items: impl Iterator<Item = T>, page: Page) -> Vec<T> {
    items
        .skip(page.offset as usize)
        .take(page.limit as usize)
        .collect()
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    fn check(&self) -> Result<(), sqlx::Error> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(())
    }

    /// Make every query fail with a database error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn put_instance(&self, instance: AlertInstance) {
        self.state().instances.insert(instance.id, instance);
    }

    pub fn put_template(&self, version: AlertTemplateVersion) {
        self.state()
            .templates
            .insert((version.template_id, version.template_version), version);
    }

    pub fn put_endpoint(&self, endpoint: NotificationChannelEndpoint) {
        self.state().endpoints.insert(endpoint.id, endpoint);
    }

    pub fn remove_endpoint(&self, id: Uuid) {
        self.state().endpoints.remove(&id);
    }

    /// Create a group owned by `owner_id` and a subscription of that owner to it.
    pub fn put_group(&self, group_id: Uuid, owner_id: i64) -> Uuid {
        let subscription_id = Uuid::new_v4();
        let mut state = self.state();
        state.group_owners.insert(group_id, owner_id);
        state.subscriptions.insert(
            subscription_id,
            GroupSubscription {
                id: subscription_id,
                owner_id,
                group_id,
            },
        );
        subscription_id
    }

    pub fn set_members(&self, group_id: Uuid, members: &[(&str, Option<&str>)]) {
        let mut members: Vec<GroupMember> = members
            .iter()
            .map(|(target_key, label)| GroupMember {
                group_id,
                target_key: target_key.to_string(),
                label: label.map(str::to_string),
            })
            .collect();
        members.sort_by(|a, b| a.target_key.cmp(&b.target_key));
        self.state().members.insert(group_id, members);
    }
}

pub(crate) fn template(template_id: Uuid, template_version: i32) -> AlertTemplateVersion {
    AlertTemplateVersion {
        template_id,
        template_version,
        spec: json!({ "kind": "balance_below", "version": template_version }),
        executable: json!({ "op": "lt", "field": "balance" }),
    }
}

pub(crate) fn instance(target_keys: &[&str]) -> AlertInstance {
    AlertInstance {
        id: Uuid::new_v4(),
        user_id: USER,
        enabled: true,
        template_id: Uuid::new_v4(),
        template_version: 1,
        target_keys: target_keys.iter().map(|k| k.to_string()).collect(),
        params: json!({ "threshold": 10 }),
        source_subscription: None,
        disabled_by_subscription: false,
    }
}

pub(crate) fn endpoint(
    user_id: i64,
    channel_type: ChannelType,
    enabled: bool,
    verified: bool,
) -> NotificationChannelEndpoint {
    NotificationChannelEndpoint {
        id: Uuid::new_v4(),
        user_id,
        channel_type: channel_type.into(),
        enabled,
        verified,
        config: json!({ "target": format!("{channel_type}-{user_id}") }),
    }
}

impl Processor<GetAlertInstanceById> for FakeSource {
    type Output = Option<AlertInstance>;
    type Error = sqlx::Error;
    async fn process(
        &self,
        query: GetAlertInstanceById,
    ) -> Result<Option<AlertInstance>, sqlx::Error> {
        self.check()?;
        Ok(self.state().instances.get(&query.id).cloned())
    }
}

impl Processor<ListAlertInstancesForGroup> for FakeSource {
    type Output = Vec<AlertInstance>;
    type Error = sqlx::Error;
    async fn process(
        &self,
        query: ListAlertInstancesForGroup,
    ) -> Result<Vec<AlertInstance>, sqlx::Error> {
        self.check()?;
        let state = self.state();
        let subscriptions: BTreeSet<Uuid> = state
            .subscriptions
            .values()
            .filter(|s| s.group_id == query.group_id)
            .map(|s| s.id)
            .collect();
        Ok(state
            .instances
            .values()
            .filter(|i| {
                i.source_subscription
                    .is_some_and(|id| subscriptions.contains(&id))
            })
            .cloned()
            .collect())
    }
}

impl Processor<ListAlertInstances> for FakeSource {
    type Output = Vec<AlertInstance>;
    type Error = sqlx::Error;
    async fn process(&self, query: ListAlertInstances) -> Result<Vec<AlertInstance>, sqlx::Error> {
        self.check()?;
        Ok(page(self.state().instances.values().cloned(), query.page))
    }
}

impl Processor<GetTemplateVersion> for FakeSource {
    type Output = Option<AlertTemplateVersion>;
    type Error = sqlx::Error;
    async fn process(
        &self,
        query: GetTemplateVersion,
    ) -> Result<Option<AlertTemplateVersion>, sqlx::Error> {
        self.check()?;
        Ok(self
            .state()
            .templates
            .get(&(query.template_id, query.template_version))
            .cloned())
    }
}

impl Processor<ListTemplateVersionKeys> for FakeSource {
    type Output = Vec<TemplateVersionKey>;
    type Error = sqlx::Error;
    async fn process(
        &self,
        query: ListTemplateVersionKeys,
    ) -> Result<Vec<TemplateVersionKey>, sqlx::Error> {
        self.check()?;
        let keys = self
            .state()
            .templates
            .keys()
            .map(|(template_id, template_version)| TemplateVersionKey {
                template_id: *template_id,
                template_version: *template_version,
            })
            .collect::<Vec<_>>();
        Ok(page(keys.into_iter(), query.page))
    }
}

impl Processor<ListUserChannelEndpoints> for FakeSource {
    type Output = Vec<NotificationChannelEndpoint>;
    type Error = sqlx::Error;
    async fn process(
        &self,
        query: ListUserChannelEndpoints,
    ) -> Result<Vec<NotificationChannelEndpoint>, sqlx::Error> {
        self.check()?;
        Ok(self
            .state()
            .endpoints
            .values()
            .filter(|e| e.user_id == query.user_id && e.channel_type == query.channel_type)
            .cloned()
            .collect())
    }
}

impl Processor<ListChannelEndpointOwners> for FakeSource {
    type Output = Vec<ChannelEndpointOwner>;
    type Error = sqlx::Error;
    async fn process(
        &self,
        query: ListChannelEndpointOwners,
    ) -> Result<Vec<ChannelEndpointOwner>, sqlx::Error> {
        self.check()?;
        let owners: BTreeSet<(i64, ChannelTypeName)> = self
            .state()
            .endpoints
            .values()
            .map(|e| (e.user_id, e.channel_type))
            .collect();
        Ok(page(
            owners
                .into_iter()
                .map(|(user_id, channel_type)| ChannelEndpointOwner {
                    user_id,
                    channel_type,
                }),
            query.page,
        ))
    }
}

impl Processor<GetGroupSubscription> for FakeSource {
    type Output = Option<GroupSubscription>;
    type Error = sqlx::Error;
    async fn process(
        &self,
        query: GetGroupSubscription,
    ) -> Result<Option<GroupSubscription>, sqlx::Error> {
        self.check()?;
        Ok(self
            .state()
            .subscriptions
            .get(&query.subscription_id)
            .cloned())
    }
}

impl Processor<ListGroupMembers> for FakeSource {
    type Output = Vec<GroupMember>;
    type Error = sqlx::Error;
    async fn process(&self, query: ListGroupMembers) -> Result<Vec<GroupMember>, sqlx::Error> {
        self.check()?;
        Ok(self
            .state()
            .members
            .get(&query.group_id)
            .cloned()
            .unwrap_or_default())
    }
}

impl Processor<ListOwnerGroupMembers> for FakeSource {
    type Output = Vec<GroupMember>;
    type Error = sqlx::Error;
    async fn process(&self, query: ListOwnerGroupMembers) -> Result<Vec<GroupMember>, sqlx::Error> {
        self.check()?;
        let state = self.state();
        let mut members: Vec<GroupMember> = state
            .group_owners
            .iter()
            .filter(|(_, owner)| **owner == query.owner_id)
            .flat_map(|(group_id, _)| state.members.get(group_id).cloned().unwrap_or_default())
            .collect();
        members.sort_by(|a, b| {
            a.target_key
                .cmp(&b.target_key)
                .then(a.group_id.cmp(&b.group_id))
        });
        Ok(members)
    }
}

impl Processor<ListGroupOwners> for FakeSource {
    type Output = Vec<i64>;
    type Error = sqlx::Error;
    async fn process(&self, query: ListGroupOwners) -> Result<Vec<i64>, sqlx::Error> {
        self.check()?;
        let owners: BTreeSet<i64> = self.state().group_owners.values().copied().collect();
        Ok(page(owners.into_iter(), query.page))
    }
}
