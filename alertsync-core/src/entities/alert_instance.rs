use crate::entities::Page;
use crate::framework::DatabaseProcessor;
use alertsync_sdk::objects::{TargetKey, TargetKeyError};
use itertools::Itertools;
use kanau::processor::Processor;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct AlertInstance {
    pub id: Uuid,
    pub user_id: i64,
    pub enabled: bool,
    pub template_id: Uuid,
    pub template_version: i32,
    /// Raw `network:subnet:address` strings as stored.
    pub target_keys: Vec<String>,
    pub params: serde_json::Value,
    pub source_subscription: Option<Uuid>,
    pub disabled_by_subscription: bool,
}

impl AlertInstance {
    /// Parse, normalize, sort and deduplicate the stored target keys.
    ///
    /// Fails on the first malformed key so that no partial index is written.
    pub fn parsed_target_keys(&self) -> Result<Vec<TargetKey>, TargetKeyError> {
        let keys: Vec<TargetKey> = self
            .target_keys
            .iter()
            .map(|raw| raw.parse())
            .collect::<Result<_, _>>()?;
        Ok(keys.into_iter().sorted().dedup().collect())
    }

    /// Like [`parsed_target_keys`](Self::parsed_target_keys), but sets the
    /// malformed keys aside instead of failing.
    ///
    /// Used on paths that only remove or disable, where a bad key must not
    /// block the rest of the reaction.
    pub fn partition_target_keys(&self) -> (Vec<TargetKey>, Vec<(String, TargetKeyError)>) {
        let (keys, rejected): (Vec<TargetKey>, Vec<(String, TargetKeyError)>) = self
            .target_keys
            .iter()
            .map(|raw| raw.parse::<TargetKey>().map_err(|e| (raw.clone(), e)))
            .partition_result();
        (keys.into_iter().sorted().dedup().collect(), rejected)
    }
}

const INSTANCE_COLUMNS: &str = r#"
    i.id,
    i.user_id,
    i.enabled,
    i.template_id,
    i.template_version,
    i.target_keys,
    i.params,
    i.source_subscription,
    i.disabled_by_subscription
"#;

#[derive(Debug, Clone)]
/// Get a single alert instance by ID.
pub struct GetAlertInstanceById {
    pub id: Uuid,
}

impl Processor<GetAlertInstanceById> for DatabaseProcessor {
    type Output = Option<AlertInstance>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetAlertInstanceById")]
    async fn process(
        &self,
        query: GetAlertInstanceById,
    ) -> Result<Option<AlertInstance>, sqlx::Error> {
        let sql = format!("SELECT {INSTANCE_COLUMNS} FROM alert_instances i WHERE i.id = $1");
        let instance = sqlx::query_as::<_, AlertInstance>(&sql)
            .bind(query.id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(instance)
    }
}

#[derive(Debug, Clone)]
/// List every alert instance created from a subscription to the given group.
pub struct ListAlertInstancesForGroup {
    pub group_id: Uuid,
}

impl Processor<ListAlertInstancesForGroup> for DatabaseProcessor {
    type Output = Vec<AlertInstance>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListAlertInstancesForGroup")]
    async fn process(
        &self,
        query: ListAlertInstancesForGroup,
    ) -> Result<Vec<AlertInstance>, sqlx::Error> {
        let sql = format!(
            "SELECT {INSTANCE_COLUMNS} \
             FROM alert_instances i \
             JOIN group_subscriptions s ON s.id = i.source_subscription \
             WHERE s.group_id = $1 \
             ORDER BY i.id"
        );
        let instances = sqlx::query_as::<_, AlertInstance>(&sql)
            .bind(query.group_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(instances)
    }
}

#[derive(Debug, Clone)]
/// Page through all alert instances in ID order.
pub struct ListAlertInstances {
    pub page: Page,
}

impl Processor<ListAlertInstances> for DatabaseProcessor {
    type Output = Vec<AlertInstance>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListAlertInstances")]
    async fn process(&self, query: ListAlertInstances) -> Result<Vec<AlertInstance>, sqlx::Error> {
        let sql = format!(
            "SELECT {INSTANCE_COLUMNS} FROM alert_instances i ORDER BY i.id LIMIT $1 OFFSET $2"
        );
        let instances = sqlx::query_as::<_, AlertInstance>(&sql)
            .bind(query.page.limit)
            .bind(query.page.offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(instances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(keys: &[&str]) -> AlertInstance {
        AlertInstance {
            id: Uuid::new_v4(),
            user_id: 1,
            enabled: true,
            template_id: Uuid::new_v4(),
            template_version: 1,
            target_keys: keys.iter().map(|k| k.to_string()).collect(),
            params: serde_json::Value::Null,
            source_subscription: None,
            disabled_by_subscription: false,
        }
    }

    #[test]
    fn test_parsed_target_keys_are_sorted_and_deduplicated() {
        let keys = instance(&["eth:main:0xBB", "eth:main:0xaa", "eth:main:0xbb"])
            .parsed_target_keys()
            .unwrap();
        let keys: Vec<String> = keys.iter().map(ToString::to_string).collect();
        assert_eq!(keys, vec!["eth:main:0xaa", "eth:main:0xbb"]);
    }

    #[test]
    fn test_malformed_target_key_fails_whole_set() {
        assert!(instance(&["eth:main:0xaa", "garbage"]).parsed_target_keys().is_err());
    }

    #[test]
    fn test_partition_sets_malformed_keys_aside() {
        let (keys, rejected) =
            instance(&["eth:main:0xAA", "garbage", "eth:main:0xaa"]).partition_target_keys();
        let keys: Vec<String> = keys.iter().map(ToString::to_string).collect();
        assert_eq!(keys, vec!["eth:main:0xaa"]);
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].0, "garbage");
    }
}
