use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder};
use std::error::Error;
use uuid::Uuid;
use windward_entity::recommendation::{
    ActiveModel as ActiveRecommendation, ContentKind, Entity as RecommendationEntity, Model as Recommendation,
    RecommendationSource,
};

use windward_entity::recommendation;

/// One plan row to be written; ids and timestamps are filled at insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecommendation {
    pub content_id: Uuid,
    pub content_kind: ContentKind,
    pub target_skill: String,
    pub skill_gap_size: Option<f64>,
    pub rationale: Option<String>,
    pub priority_order: i32,
}

pub struct Query;

impl Query {
    pub async fn for_result<C: ConnectionTrait>(conn: &C, result_id: Uuid) -> Result<Vec<Recommendation>, DbErr> {
        RecommendationEntity::find()
            .filter(recommendation::Column::ResultId.eq(result_id))
            .order_by_asc(recommendation::Column::PriorityOrder)
            .all(conn)
            .await
            .inspect_err(
                |error| tracing::error!(error = error as &dyn Error, %result_id, "failed to load recommendations"),
            )
    }
}

pub struct Mutation;

impl Mutation {
    pub async fn insert_auto_many<C: ConnectionTrait>(
        conn: &C,
        result_id: Uuid,
        rows: Vec<NewRecommendation>,
        now: DateTime<Utc>,
    ) -> Result<(), DbErr> {
        if rows.is_empty() {
            return Ok(());
        }
        let rows: Vec<_> = rows
            .into_iter()
            .map(|row| active_row(result_id, row, RecommendationSource::Auto, None, now))
            .collect();
        RecommendationEntity::insert_many(rows).exec(conn).await.inspect_err(
            |error| tracing::error!(error = error as &dyn Error, %result_id, "failed to insert recommendations"),
        )?;
        Ok(())
    }

    /// Replace the whole plan for a result with manual rows: delete then
    /// insert. The caller supplies the surrounding transaction so the swap
    /// commits together with whatever records it, and applying the same
    /// payload twice leaves the same final set.
    pub async fn replace_manual<C: ConnectionTrait>(
        conn: &C,
        result_id: Uuid,
        rows: Vec<NewRecommendation>,
        overridden_by: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Recommendation>, DbErr> {
        RecommendationEntity::delete_many()
            .filter(recommendation::Column::ResultId.eq(result_id))
            .exec(conn)
            .await?;
        let rows: Vec<_> = rows
            .into_iter()
            .map(|row| active_row(result_id, row, RecommendationSource::Manual, Some(overridden_by), now))
            .collect();
        RecommendationEntity::insert_many(rows).exec(conn).await.inspect_err(
            |error| tracing::error!(error = error as &dyn Error, %result_id, "failed to override recommendations"),
        )?;
        Query::for_result(conn, result_id).await
    }
}

fn active_row(
    result_id: Uuid,
    row: NewRecommendation,
    source: RecommendationSource,
    overridden_by: Option<Uuid>,
    now: DateTime<Utc>,
) -> ActiveRecommendation {
    ActiveRecommendation {
        id: ActiveValue::Set(Uuid::new_v4()),
        result_id: ActiveValue::Set(result_id),
        content_id: ActiveValue::Set(row.content_id),
        content_kind: ActiveValue::Set(row.content_kind),
        target_skill: ActiveValue::Set(row.target_skill),
        skill_gap_size: ActiveValue::Set(row.skill_gap_size),
        rationale: ActiveValue::Set(row.rationale),
        priority_order: ActiveValue::Set(row.priority_order),
        source: ActiveValue::Set(source),
        overridden_by: ActiveValue::Set(overridden_by),
        overridden_at: ActiveValue::Set(overridden_by.map(|_| now)),
        created_at: ActiveValue::Set(now),
    }
}
