use crate::entities::Page;
use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use uuid::Uuid;

/// A user's subscription to a generic group of targets.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct GroupSubscription {
    pub id: Uuid,
    pub owner_id: i64,
    pub group_id: Uuid,
}

/// One resolved member of a generic group.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct GroupMember {
    pub group_id: Uuid,
    /// `network:subnet:address` of the member.
    pub target_key: String,
    pub label: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GetGroupSubscription {
    pub subscription_id: Uuid,
}

impl Processor<GetGroupSubscription> for DatabaseProcessor {
    type Output = Option<GroupSubscription>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetGroupSubscription")]
    async fn process(
        &self,
        query: GetGroupSubscription,
    ) -> Result<Option<GroupSubscription>, sqlx::Error> {
        let subscription = sqlx::query_as::<_, GroupSubscription>(
            r#"
            SELECT id, owner_id, group_id
            FROM group_subscriptions
            WHERE id = $1
            "#,
        )
        .bind(query.subscription_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(subscription)
    }
}

#[derive(Debug, Clone)]
/// Current membership of one group.
pub struct ListGroupMembers {
    pub group_id: Uuid,
}

impl Processor<ListGroupMembers> for DatabaseProcessor {
    type Output = Vec<GroupMember>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListGroupMembers")]
    async fn process(&self, query: ListGroupMembers) -> Result<Vec<GroupMember>, sqlx::Error> {
        let members = sqlx::query_as::<_, GroupMember>(
            r#"
            SELECT group_id, target_key, label
            FROM group_members
            WHERE group_id = $1
            ORDER BY target_key
            "#,
        )
        .bind(query.group_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(members)
    }
}

#[derive(Debug, Clone)]
/// Members of every group owned by a user.
pub struct ListOwnerGroupMembers {
    pub owner_id: i64,
}

impl Processor<ListOwnerGroupMembers> for DatabaseProcessor {
    type Output = Vec<GroupMember>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListOwnerGroupMembers")]
    async fn process(&self, query: ListOwnerGroupMembers) -> Result<Vec<GroupMember>, sqlx::Error> {
        let members = sqlx::query_as::<_, GroupMember>(
            r#"
            SELECT m.group_id, m.target_key, m.label
            FROM group_members m
            JOIN generic_groups g ON g.id = m.group_id
            WHERE g.owner_id = $1
            ORDER BY m.target_key, m.group_id
            "#,
        )
        .bind(query.owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(members)
    }
}

#[derive(Debug, Clone)]
/// Page through the distinct owners of generic groups.
pub struct ListGroupOwners {
    pub page: Page,
}

impl Processor<ListGroupOwners> for DatabaseProcessor {
    type Output = Vec<i64>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListGroupOwners")]
    async fn process(&self, query: ListGroupOwners) -> Result<Vec<i64>, sqlx::Error> {
        let owners = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT DISTINCT owner_id
            FROM generic_groups
            ORDER BY owner_id
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
