use crate::entities::Page;
use crate::framework::DatabaseProcessor;
use alertsync_sdk::objects::TemplateBundle;
use kanau::processor::Processor;
use uuid::Uuid;

/// One compiled, immutable version of an alert template.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct AlertTemplateVersion {
    pub template_id: Uuid,
    pub template_version: i32,
    pub spec: serde_json::Value,
    pub executable: serde_json::Value,
}

impl From<AlertTemplateVersion> for TemplateBundle {
    fn from(value: AlertTemplateVersion) -> Self {
        TemplateBundle {
            template_id: value.template_id,
            template_version: value.template_version,
            spec: value.spec,
            executable: value.executable,
        }
    }
}

/// Identity of a template version, used when walking all versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct TemplateVersionKey {
    pub template_id: Uuid,
    pub template_version: i32,
}

#[derive(Debug, Clone)]
/// Load the compiled spec and executable of exactly one template version.
pub struct GetTemplateVersion {
    pub template_id: Uuid,
    pub template_version: i32,
}

impl Processor<GetTemplateVersion> for DatabaseProcessor {
    type Output = Option<AlertTemplateVersion>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetTemplateVersion")]
    async fn process(
        &self,
        query: GetTemplateVersion,
    ) -> Result<Option<AlertTemplateVersion>, sqlx::Error> {
        let version = sqlx::query_as::<_, AlertTemplateVersion>(
            r#"
            SELECT template_id, template_version, spec, executable
            FROM alert_template_versions
            WHERE template_id = $1 AND template_version = $2
            "#,
        )
        .bind(query.template_id)
        .bind(query.template_version)
        .fetch_optional(&self.pool)
        .await?;
        Ok(version)
    }
}

#[derive(Debug, Clone)]
/// Page through the identities of all template versions.
pub struct ListTemplateVersionKeys {
    pub page: Page,
}

impl Processor<ListTemplateVersionKeys> for DatabaseProcessor {
    type Output = Vec<TemplateVersionKey>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListTemplateVersionKeys")]
    async fn process(
        &self,
        query: ListTemplateVersionKeys,
    ) -> Result<Vec<TemplateVersionKey>, sqlx::Error> {
        let keys = sqlx::query_as::<_, TemplateVersionKey>(
            r#"
            SELECT template_id, template_version
            FROM alert_template_versions
            ORDER BY template_id, template_version
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(query.page.limit)
        .bind(query.page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(keys)
    }
}
