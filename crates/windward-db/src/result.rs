use crate::lookup::OrMissing;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, JoinType, QueryFilter, QueryOrder,
    QuerySelect, RelationTrait,
};
use std::error::Error;
use uuid::Uuid;
use windward_entity::result::{ActiveModel as ActiveResult, Entity as ResultEntity, Model as StoredResult, ResultKind};
use windward_entity::{assignment, result, session};

/// Field bundle for the single result row written at finalization.
#[derive(Debug, Clone)]
pub struct NewResult {
    pub session_id: Uuid,
    pub proficiency_level: String,
    pub skill_scores: serde_json::Value,
    pub overall_score: f64,
    pub result_kind: ResultKind,
    pub information_metric: Option<serde_json::Value>,
}

pub struct Query;

impl Query {
    pub async fn by_session<C: ConnectionTrait>(conn: &C, session_id: Uuid) -> Result<Option<StoredResult>, DbErr> {
        ResultEntity::find()
            .filter(result::Column::SessionId.eq(session_id))
            .one(conn)
            .await
            .inspect_err(|error| tracing::error!(error = error as &dyn Error, %session_id, "failed to load result"))
    }

    pub async fn require<C: ConnectionTrait>(conn: &C, result_id: Uuid) -> Result<StoredResult, DbErr> {
        ResultEntity::find_by_id(result_id).one(conn).await.or_missing("result")
    }

    /// Completed results for one test-taker, newest first.
    pub async fn history_for_test_taker<C: ConnectionTrait>(
        conn: &C,
        test_taker_id: Uuid,
        kind: Option<ResultKind>,
    ) -> Result<Vec<StoredResult>, DbErr> {
        let mut query = ResultEntity::find()
            .join(JoinType::InnerJoin, result::Relation::Session.def())
            .join(JoinType::InnerJoin, session::Relation::Assignment.def())
            .filter(assignment::Column::TestTakerId.eq(test_taker_id))
            .order_by_desc(result::Column::CreatedAt);
        if let Some(kind) = kind {
            query = query.filter(result::Column::ResultKind.eq(kind));
        }
        query.all(conn).await.inspect_err(
            |error| tracing::error!(error = error as &dyn Error, %test_taker_id, "failed to load result history"),
        )
    }
}

pub struct Mutation;

impl Mutation {
    pub async fn insert<C: ConnectionTrait>(
        conn: &C,
        new_result: NewResult,
        now: DateTime<Utc>,
    ) -> Result<StoredResult, DbErr> {
        let row = ActiveResult {
            id: ActiveValue::Set(Uuid::new_v4()),
            session_id: ActiveValue::Set(new_result.session_id),
            proficiency_level: ActiveValue::Set(new_result.proficiency_level),
            skill_scores: ActiveValue::Set(new_result.skill_scores),
            overall_score: ActiveValue::Set(new_result.overall_score),
            result_kind: ActiveValue::Set(new_result.result_kind),
            information_metric: ActiveValue::Set(new_result.information_metric),
            created_at: ActiveValue::Set(now),
        };
        row.insert(conn)
            .await
            .inspect_err(|error| tracing::error!(error = error as &dyn Error, "failed to insert result"))
    }
}
