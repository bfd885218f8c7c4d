//! The relational queries the synchronizers depend on, bundled as one bound.

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
use kanau::processor::Processor;

/// Everything the dispatcher reads from the relational store.
///
/// Implemented by [`DatabaseProcessor`](crate::framework::DatabaseProcessor)
/// and by any other type answering the same queries.
pub trait SourceOfTruth:
    Processor<GetAlertInstanceById, Output = Option<AlertInstance>, Error = sqlx::Error>
    + Processor<ListAlertInstancesForGroup, Output = Vec<AlertInstance>, Error = sqlx::Error>
    + Processor<ListAlertInstances, Output = Vec<AlertInstance>, Error = sqlx::Error>
    + Processor<GetTemplateVersion, Output = Option<AlertTemplateVersion>, Error = sqlx::Error>
    + Processor<ListTemplateVersionKeys, Output = Vec<TemplateVersionKey>, Error = sqlx::Error>
    + Processor<
        ListUserChannelEndpoints,
        Output = Vec<NotificationChannelEndpoint>,
        Error = sqlx::Error,
    > + Processor<ListChannelEndpointOwners, Output = Vec<ChannelEndpointOwner>, Error = sqlx::Error>
    + Processor<GetGroupSubscription, Output = Option<GroupSubscription>, Error = sqlx::Error>
    + Processor<ListGroupMembers, Output = Vec<GroupMember>, Error = sqlx::Error>
    + Processor<ListOwnerGroupMembers, Output = Vec<GroupMember>, Error = sqlx::Error>
    + Processor<ListGroupOwners, Output = Vec<i64>, Error = sqlx::Error>
    + Send
    + Sync
    + 'static
{
}

impl<T> SourceOfTruth for T where
    T: Processor<GetAlertInstanceById, Output = Option<AlertInstance>, Error = sqlx::Error>
        + Processor<ListAlertInstancesForGroup, Output = Vec<AlertInstance>, Error = sqlx::Error>
        + Processor<ListAlertInstances, Output = Vec<AlertInstance>, Error = sqlx::Error>
        + Processor<GetTemplateVersion, Output = Option<AlertTemplateVersion>, Error = sqlx::Error>
        + Processor<ListTemplateVersionKeys, Output = Vec<TemplateVersionKey>, Error = sqlx::Error>
        + Processor<
            ListUserChannelEndpoints,
            Output = Vec<NotificationChannelEndpoint>,
            Error = sqlx::Error,
        > + Processor<
            ListChannelEndpointOwners,
            Output = Vec<ChannelEndpointOwner>,
            Error = sqlx::Error,
        > + Processor<GetGroupSubscription, Output = Option<GroupSubscription>, Error = sqlx::Error>
        + Processor<ListGroupMembers, Output = Vec<GroupMember>, Error = sqlx::Error>
        + Processor<ListOwnerGroupMembers, Output = Vec<GroupMember>, Error = sqlx::Error>
        + Processor<ListGroupOwners, Output = Vec<i64>, Error = sqlx::Error>
        + Send
        + Sync
        + 'static
{
}
