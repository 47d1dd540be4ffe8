use crate::recommendation::NewRecommendation;
use crate::result::NewResult;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};
use std::error::Error;
use thiserror::Error;
use uuid::Uuid;
use windward_entity::assignment::AssignmentStatus;
use windward_entity::session::{ActiveModel as ActiveSession, Entity as SessionEntity, Model as Session, SessionStatus};
use windward_entity::{response, result, session};

#[derive(Debug, Error)]
pub enum SessionWriteError {
    /// The optimistic `(session_id, current_index)` check failed; another
    /// writer advanced the session first.
    #[error("session was updated concurrently")]
    Conflict,

    #[error("item was already answered in this session")]
    AlreadyAnswered,

    #[error(transparent)]
    Db(#[from] DbErr),
}

pub struct Mutation;

impl Mutation {
    pub async fn create_session<C: ConnectionTrait>(
        conn: &C,
        assigned_id: Uuid,
        starting_ability: f64,
        template_snapshot: serde_json::Value,
        rubric_snapshot: Option<serde_json::Value>,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, DbErr> {
        let session = ActiveSession {
            id: ActiveValue::Set(Uuid::new_v4()),
            assigned_id: ActiveValue::Set(assigned_id),
            current_ability: ActiveValue::Set(starting_ability),
            standard_error: ActiveValue::Set(None),
            questions_answered: ActiveValue::Set(0),
            current_index: ActiveValue::Set(0),
            status: ActiveValue::Set(SessionStatus::InProgress),
            template_snapshot: ActiveValue::Set(template_snapshot),
            rubric_snapshot: ActiveValue::Set(rubric_snapshot),
            started_at: ActiveValue::Set(now),
            completed_at: ActiveValue::Set(None),
            expires_at: ActiveValue::Set(expires_at),
        };

        session
            .insert(conn)
            .await
            .inspect_err(|error| tracing::error!(error = error as &dyn Error, %assigned_id, "failed to create session"))
    }

    /// Record that an item was shown: a response row with `submitted_at`
    /// unset. The `(session_id, item_id)` primary key rejects re-presenting
    /// an item the session has already seen.
    pub async fn present_item<C: ConnectionTrait>(
        conn: &C,
        session_id: Uuid,
        item_id: Uuid,
        position: i32,
        now: DateTime<Utc>,
    ) -> Result<response::Model, DbErr> {
        let pending = response::ActiveModel {
            session_id: ActiveValue::Set(session_id),
            item_id: ActiveValue::Set(item_id),
            position: ActiveValue::Set(position),
            response_data: ActiveValue::Set(None),
            is_correct: ActiveValue::Set(None),
            raw_score: ActiveValue::Set(None),
            presented_at: ActiveValue::Set(now),
            submitted_at: ActiveValue::Set(None),
            time_taken: ActiveValue::Set(None),
            media_key: ActiveValue::Set(None),
            asr_transcript: ActiveValue::Set(None),
        };
        pending.insert(conn).await.inspect_err(
            |error| tracing::error!(error = error as &dyn Error, %session_id, %item_id, "failed to present item"),
        )
    }

    /// Fill in the pending response. The update is conditioned on
    /// `submitted_at IS NULL`, so a duplicate submit touches zero rows and
    /// surfaces as [`SessionWriteError::AlreadyAnswered`].
    #[allow(clippy::too_many_arguments)]
    pub async fn submit_response<C: ConnectionTrait>(
        conn: &C,
        session_id: Uuid,
        item_id: Uuid,
        response_data: serde_json::Value,
        is_correct: Option<bool>,
        raw_score: Option<f64>,
        time_taken: Option<i32>,
        media_key: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), SessionWriteError> {
        let updated = response::Entity::update_many()
            .col_expr(response::Column::ResponseData, Expr::value(Some(response_data)))
            .col_expr(response::Column::IsCorrect, Expr::value(is_correct))
            .col_expr(response::Column::RawScore, Expr::value(raw_score))
            .col_expr(response::Column::TimeTaken, Expr::value(time_taken))
            .col_expr(response::Column::MediaKey, Expr::value(media_key))
            .col_expr(response::Column::SubmittedAt, Expr::value(Some(now)))
            .filter(response::Column::SessionId.eq(session_id))
            .filter(response::Column::ItemId.eq(item_id))
            .filter(response::Column::SubmittedAt.is_null())
            .exec(conn)
            .await?;

        if updated.rows_affected == 0 {
            return Err(SessionWriteError::AlreadyAnswered);
        }
        Ok(())
    }

    /// Advance the ability estimate and index. The write is conditioned on
    /// the caller's `expected_index`; exactly one of two racing writers
    /// succeeds, the other observes zero affected rows.
    pub async fn advance_progress<C: ConnectionTrait>(
        conn: &C,
        session_id: Uuid,
        expected_index: i32,
        current_ability: f64,
        standard_error: Option<f64>,
        questions_answered: i32,
    ) -> Result<(), SessionWriteError> {
        let updated = SessionEntity::update_many()
            .col_expr(session::Column::CurrentAbility, Expr::value(current_ability))
            .col_expr(session::Column::StandardError, Expr::value(standard_error))
            .col_expr(session::Column::QuestionsAnswered, Expr::value(questions_answered))
            .col_expr(session::Column::CurrentIndex, Expr::value(expected_index + 1))
            .filter(session::Column::Id.eq(session_id))
            .filter(session::Column::CurrentIndex.eq(expected_index))
            .filter(session::Column::Status.eq(SessionStatus::InProgress))
            .exec(conn)
            .await?;

        if updated.rows_affected == 0 {
            tracing::debug!(%session_id, expected_index, "optimistic progress update lost");
            return Err(SessionWriteError::Conflict);
        }
        Ok(())
    }

    /// Completion writes: the result row, its recommendation rows, and the
    /// COMPLETED flips on session and assignment. The caller supplies the
    /// surrounding transaction so these four writes land atomically with
    /// whatever triggered them.
    pub async fn finalize_writes<C: ConnectionTrait>(
        conn: &C,
        session_id: Uuid,
        assigned_id: Uuid,
        new_result: NewResult,
        recommendations: Vec<NewRecommendation>,
        now: DateTime<Utc>,
    ) -> Result<result::Model, DbErr> {
        let stored = crate::result::Mutation::insert(conn, new_result, now)
            .await
            .inspect_err(|error| tracing::error!(error = error as &dyn Error, %session_id, "failed to finalize session"))?;
        crate::recommendation::Mutation::insert_auto_many(conn, stored.id, recommendations, now).await?;

        SessionEntity::update_many()
            .col_expr(session::Column::Status, Expr::value(SessionStatus::Completed))
            .col_expr(session::Column::CompletedAt, Expr::value(Some(now)))
            .filter(session::Column::Id.eq(session_id))
            .filter(session::Column::Status.eq(SessionStatus::InProgress))
            .exec(conn)
            .await?;

        crate::assignment::Mutation::set_status(conn, assigned_id, AssignmentStatus::Completed).await?;
        Ok(stored)
    }

    pub async fn set_status<C: ConnectionTrait>(
        conn: &C,
        session_id: Uuid,
        status: SessionStatus,
    ) -> Result<(), DbErr> {
        SessionEntity::update_many()
            .col_expr(session::Column::Status, Expr::value(status))
            .filter(session::Column::Id.eq(session_id))
            .exec(conn)
            .await?;
        Ok(())
    }

    /// Mark overdue IN_PROGRESS sessions as EXPIRED; returns how many rows
    /// were touched. The engine also rechecks expiry per request, so this
    /// sweep is advisory.
    pub async fn expire_stale<C: ConnectionTrait>(conn: &C, now: DateTime<Utc>) -> Result<u64, DbErr> {
        let updated = SessionEntity::update_many()
            .col_expr(session::Column::Status, Expr::value(SessionStatus::Expired))
            .filter(session::Column::Status.eq(SessionStatus::InProgress))
            .filter(session::Column::ExpiresAt.lt(now))
            .exec(conn)
            .await
            .inspect_err(|error| tracing::error!(error = error as &dyn Error, "failed to expire stale sessions"))?;
        Ok(updated.rows_affected)
    }
}
