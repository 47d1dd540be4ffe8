use crate::lookup::OrMissing;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};
use std::error::Error;
use uuid::Uuid;
use windward_entity::item::{ActiveModel as ActiveItem, Entity as ItemEntity, ItemKind, Model as Item};

use windward_entity::item;

pub struct Query;

impl Query {
    pub async fn require<C: ConnectionTrait>(conn: &C, item_id: Uuid) -> Result<Item, DbErr> {
        ItemEntity::find_by_id(item_id)
            .one(conn)
            .await
            .or_missing("item")
            .inspect_err(|error| tracing::error!(error = error as &dyn Error, %item_id, "failed to load item"))
    }

    /// All active calibrated items. Skill filtering happens in the engine;
    /// skill tags live in a JSON column.
    pub async fn load_active<C: ConnectionTrait>(conn: &C) -> Result<Vec<Item>, DbErr> {
        ItemEntity::find()
            .filter(item::Column::Active.eq(true))
            .all(conn)
            .await
            .inspect_err(|error| tracing::error!(error = error as &dyn Error, "failed to load item bank"))
    }

    pub async fn by_ids<C: ConnectionTrait>(conn: &C, ids: &[Uuid]) -> Result<Vec<Item>, DbErr> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        ItemEntity::find()
            .filter(item::Column::Id.is_in(ids.iter().copied()))
            .all(conn)
            .await
    }
}

pub struct Mutation;

impl Mutation {
    #[allow(clippy::too_many_arguments)]
    pub async fn create<C: ConnectionTrait>(
        conn: &C,
        content: serde_json::Value,
        item_kind: ItemKind,
        skill_areas: Vec<String>,
        target_cefr: String,
        discrimination: f64,
        difficulty: f64,
        guessing: f64,
        now: DateTime<Utc>,
    ) -> Result<Item, DbErr> {
        let row = ActiveItem {
            id: ActiveValue::Set(Uuid::new_v4()),
            content: ActiveValue::Set(content),
            item_kind: ActiveValue::Set(item_kind),
            skill_areas: ActiveValue::Set(serde_json::json!(skill_areas)),
            target_cefr: ActiveValue::Set(target_cefr),
            discrimination: ActiveValue::Set(discrimination),
            difficulty: ActiveValue::Set(difficulty),
            guessing: ActiveValue::Set(guessing),
            active: ActiveValue::Set(true),
            created_at: ActiveValue::Set(now),
        };
        row.insert(conn)
            .await
            .inspect_err(|error| tracing::error!(error = error as &dyn Error, "failed to create item"))
    }

    /// Items are never edited in place once used; retiring one is a soft
    /// deactivation.
    pub async fn deactivate<C: ConnectionTrait>(conn: &C, item_id: Uuid) -> Result<(), DbErr> {
        ItemEntity::update_many()
            .col_expr(item::Column::Active, Expr::value(false))
            .filter(item::Column::Id.eq(item_id))
            .exec(conn)
            .await?;
        Ok(())
    }
}
