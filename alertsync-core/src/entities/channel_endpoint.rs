use crate::entities::{ChannelTypeName, Page};
use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct NotificationChannelEndpoint {
    pub id: Uuid,
    pub user_id: i64,
    pub channel_type: ChannelTypeName,
    pub enabled: bool,
    pub verified: bool,
    /// Channel specific settings (chat id, webhook url, address...).
    pub config: serde_json::Value,
}

impl NotificationChannelEndpoint {
    /// Only enabled and verified endpoints may receive deliveries.
    pub fn is_deliverable(&self) -> bool {
        self.enabled && self.verified
    }
}

/// A (user, channel type) pair that owns at least one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct ChannelEndpointOwner {
    pub user_id: i64,
    pub channel_type: ChannelTypeName,
}

#[derive(Debug, Clone)]
/// List all endpoints of one channel type owned by a user, in ID order.
pub struct ListUserChannelEndpoints {
    pub user_id: i64,
    pub channel_type: ChannelTypeName,
}

impl Processor<ListUserChannelEndpoints> for DatabaseProcessor {
    type Output = Vec<NotificationChannelEndpoint>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListUserChannelEndpoints")]
    async fn process(
        &self,
        query: ListUserChannelEndpoints,
    ) -> Result<Vec<NotificationChannelEndpoint>, sqlx::Error> {
        let endpoints = sqlx::query_as::<_, NotificationChannelEndpoint>(
            r#"
            SELECT id, user_id, channel_type, enabled, verified, config
            FROM notification_channel_endpoints
            WHERE user_id = $1 AND channel_type = $2
            ORDER BY id
            "#,
        )
        .bind(query.user_id)
        .bind(query.channel_type)
        .fetch_all(&self.pool)
        .await?;
        Ok(endpoints)
    }
}

#[derive(Debug, Clone)]
/// Page through every distinct (user, channel type) pair with endpoints.
pub struct ListChannelEndpointOwners {
    pub page: Page,
}

impl Processor<ListChannelEndpointOwners> for DatabaseProcessor {
    type Output = Vec<ChannelEndpointOwner>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListChannelEndpointOwners")]
    async fn process(
        &self,
        query: ListChannelEndpointOwners,
    ) -> Result<Vec<ChannelEndpointOwner>, sqlx::Error> {
        let owners = sqlx::query_as::<_, ChannelEndpointOwner>(
            r#"
            SELECT DISTINCT user_id, channel_type
            FROM notification_channel_endpoints
            ORDER BY user_id, channel_type
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(query.page.limit)
        .bind(query.page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(owners)
    }
}
