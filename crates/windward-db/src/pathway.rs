use crate::lookup::OrMissing;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ActiveValue, ConnectionTrait, DbErr, EntityTrait};
use std::error::Error;
use uuid::Uuid;
use windward_entity::pathway::{ActiveModel as ActivePathway, Entity as PathwayEntity, Model as Pathway};

pub struct Query;

impl Query {
    pub async fn require<C: ConnectionTrait>(conn: &C, pathway_id: Uuid) -> Result<Pathway, DbErr> {
        PathwayEntity::find_by_id(pathway_id)
            .one(conn)
            .await
            .or_missing("pathway")
            .inspect_err(|error| tracing::error!(error = error as &dyn Error, %pathway_id, "failed to load pathway"))
    }
}

pub struct Mutation;

impl Mutation {
    pub async fn create<C: ConnectionTrait>(
        conn: &C,
        name: String,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Pathway, DbErr> {
        let row = ActivePathway {
            id: ActiveValue::Set(Uuid::new_v4()),
            name: ActiveValue::Set(name),
            description: ActiveValue::Set(description),
            active: ActiveValue::Set(true),
            created_at: ActiveValue::Set(now),
        };
        row.insert(conn)
            .await
            .inspect_err(|error| tracing::error!(error = error as &dyn Error, "failed to create pathway"))
    }
}
