use crate::lookup::OrMissing;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    TransactionError, TransactionTrait,
};
use std::error::Error;
use uuid::Uuid;
use windward_entity::template::config::{ActiveModel as ActiveConfig, Model as Config};
use windward_entity::template::template_item::{ActiveModel as ActiveTemplateItem, Model as TemplateItem};
use windward_entity::template::{
    ActiveModel as ActiveTemplate, AssessmentType, Entity as TemplateEntity, Model as Template,
};

use windward_entity::template::{self, config, template_item};

pub struct Query;

impl Query {
    pub async fn require<C: ConnectionTrait>(conn: &C, template_id: Uuid) -> Result<Template, DbErr> {
        TemplateEntity::find_by_id(template_id)
            .one(conn)
            .await
            .or_missing("template")
            .inspect_err(|error| tracing::error!(error = error as &dyn Error, %template_id, "failed to load template"))
    }

    /// The single active config for a template.
    pub async fn active_config<C: ConnectionTrait>(conn: &C, template_id: Uuid) -> Result<Option<Config>, DbErr> {
        config::Entity::find()
            .filter(config::Column::TemplateId.eq(template_id))
            .filter(config::Column::Active.eq(true))
            .one(conn)
            .await
            .inspect_err(
                |error| tracing::error!(error = error as &dyn Error, %template_id, "failed to load template config"),
            )
    }

    /// Fixed item list for a non-adaptive template, in defined order.
    pub async fn ordered_items<C: ConnectionTrait>(conn: &C, template_id: Uuid) -> Result<Vec<TemplateItem>, DbErr> {
        template_item::Entity::find()
            .filter(template_item::Column::TemplateId.eq(template_id))
            .order_by_asc(template_item::Column::ItemOrder)
            .all(conn)
            .await
    }

    pub async fn all<C: ConnectionTrait>(conn: &C) -> Result<Vec<Template>, DbErr> {
        TemplateEntity::find()
            .order_by_asc(template::Column::CreatedAt)
            .all(conn)
            .await
    }
}

pub struct Mutation;

impl Mutation {
    /// Create a published template together with its config row and, for
    /// non-adaptive templates, the fixed item list. One transaction so a
    /// template is never visible half-authored.
    #[allow(clippy::too_many_arguments)]
    pub async fn create<C: ConnectionTrait + TransactionTrait>(
        conn: &C,
        pathway_id: Uuid,
        name: String,
        assessment_type: AssessmentType,
        rubric: Option<serde_json::Value>,
        parameters: Option<serde_json::Value>,
        adaptive_params: Option<serde_json::Value>,
        speaking_params: Option<serde_json::Value>,
        writing_params: Option<serde_json::Value>,
        item_ids: Vec<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Template, DbErr> {
        conn.transaction(|conn| {
            Box::pin(async move {
                let template = ActiveTemplate {
                    id: ActiveValue::Set(Uuid::new_v4()),
                    pathway_id: ActiveValue::Set(pathway_id),
                    name: ActiveValue::Set(name),
                    assessment_type: ActiveValue::Set(assessment_type),
                    rubric: ActiveValue::Set(rubric),
                    version: ActiveValue::Set(1),
                    published_at: ActiveValue::Set(Some(now)),
                    active: ActiveValue::Set(true),
                    created_at: ActiveValue::Set(now),
                }
                .insert(conn)
                .await?;

                ActiveConfig {
                    id: ActiveValue::Set(Uuid::new_v4()),
                    template_id: ActiveValue::Set(template.id),
                    parameters: ActiveValue::Set(parameters),
                    adaptive_params: ActiveValue::Set(adaptive_params),
                    speaking_params: ActiveValue::Set(speaking_params),
                    writing_params: ActiveValue::Set(writing_params),
                    active: ActiveValue::Set(true),
                }
                .insert(conn)
                .await?;

                if !item_ids.is_empty() {
                    let rows: Vec<_> = item_ids
                        .into_iter()
                        .enumerate()
                        .map(|(order, item_id)| ActiveTemplateItem {
                            template_id: ActiveValue::Set(template.id),
                            item_id: ActiveValue::Set(item_id),
                            item_order: ActiveValue::Set(order as i32),
                        })
                        .collect();
                    template_item::Entity::insert_many(rows).exec(conn).await?;
                }

                Ok(template)
            })
        })
        .await
        .map_err(|error| match error {
            TransactionError::Connection(error) => error,
            TransactionError::Transaction(error) => error,
        })
        .inspect_err(|error| tracing::error!(error = error as &dyn Error, "failed to create template"))
    }
}
