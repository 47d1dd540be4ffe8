use crate::lookup::OrMissing;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveValue, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder};
use std::error::Error;
use uuid::Uuid;
use windward_entity::assignment::{
    ActiveModel as ActiveAssignment, AssignmentStatus, Entity as AssignmentEntity, Model as Assignment,
};

use windward_entity::assignment;

pub struct Query;

impl Query {
    pub async fn require<C: ConnectionTrait>(conn: &C, assigned_id: Uuid) -> Result<Assignment, DbErr> {
        AssignmentEntity::find_by_id(assigned_id)
            .one(conn)
            .await
            .or_missing("assignment")
            .inspect_err(|error| tracing::error!(error = error as &dyn Error, %assigned_id, "failed to load assignment"))
    }

    pub async fn for_test_taker<C: ConnectionTrait>(conn: &C, test_taker_id: Uuid) -> Result<Vec<Assignment>, DbErr> {
        AssignmentEntity::find()
            .filter(assignment::Column::TestTakerId.eq(test_taker_id))
            .order_by_desc(assignment::Column::AssignedAt)
            .all(conn)
            .await
    }
}

pub struct Mutation;

impl Mutation {
    /// Create one assignment per test-taker in a single insert.
    pub async fn assign_many<C: ConnectionTrait>(
        conn: &C,
        template_id: Uuid,
        test_taker_ids: &[Uuid],
        assigned_by: Uuid,
        due_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Uuid>, DbErr> {
        let ids: Vec<Uuid> = test_taker_ids.iter().map(|_| Uuid::new_v4()).collect();
        let rows: Vec<_> = test_taker_ids
            .iter()
            .zip(&ids)
            .map(|(&test_taker_id, &id)| ActiveAssignment {
                id: ActiveValue::Set(id),
                template_id: ActiveValue::Set(template_id),
                test_taker_id: ActiveValue::Set(test_taker_id),
                assigned_by: ActiveValue::Set(Some(assigned_by)),
                assigned_at: ActiveValue::Set(now),
                due_at: ActiveValue::Set(due_at),
                status: ActiveValue::Set(AssignmentStatus::Pending),
                notes: ActiveValue::Set(None),
            })
            .collect();
        AssignmentEntity::insert_many(rows).exec(conn).await.inspect_err(
            |error| tracing::error!(error = error as &dyn Error, %template_id, "failed to create assignments"),
        )?;
        Ok(ids)
    }

    pub async fn set_status<C: ConnectionTrait>(
        conn: &C,
        assigned_id: Uuid,
        status: AssignmentStatus,
    ) -> Result<(), DbErr> {
        AssignmentEntity::update_many()
            .col_expr(assignment::Column::Status, Expr::value(status))
            .filter(assignment::Column::Id.eq(assigned_id))
            .exec(conn)
            .await?;
        Ok(())
    }
}
