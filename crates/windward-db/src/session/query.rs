use crate::lookup::OrMissing;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder};
use std::error::Error;
use uuid::Uuid;
use windward_entity::response;
use windward_entity::session::{self, Entity as SessionEntity, Model as Session};

pub struct Query;

impl Query {
    pub async fn load<C: ConnectionTrait>(conn: &C, session_id: Uuid) -> Result<Option<Session>, DbErr> {
        SessionEntity::find_by_id(session_id)
            .one(conn)
            .await
            .inspect_err(|error| tracing::error!(error = error as &dyn Error, %session_id, "failed to load session"))
    }

    pub async fn require<C: ConnectionTrait>(conn: &C, session_id: Uuid) -> Result<Session, DbErr> {
        Self::load(conn, session_id).await.or_missing("session")
    }

    /// Most recently started session for an assignment, if any.
    pub async fn latest_for_assignment<C: ConnectionTrait>(
        conn: &C,
        assigned_id: Uuid,
    ) -> Result<Option<Session>, DbErr> {
        SessionEntity::find()
            .filter(session::Column::AssignedId.eq(assigned_id))
            .order_by_desc(session::Column::StartedAt)
            .one(conn)
            .await
            .inspect_err(
                |error| tracing::error!(error = error as &dyn Error, %assigned_id, "failed to load latest session"),
            )
    }

    /// All responses for a session in presentation order, pending included.
    pub async fn responses<C: ConnectionTrait>(conn: &C, session_id: Uuid) -> Result<Vec<response::Model>, DbErr> {
        response::Entity::find()
            .filter(response::Column::SessionId.eq(session_id))
            .order_by_asc(response::Column::Position)
            .all(conn)
            .await
            .inspect_err(|error| tracing::error!(error = error as &dyn Error, %session_id, "failed to load responses"))
    }

    /// The presented-but-unanswered response, if one exists.
    pub async fn pending_response<C: ConnectionTrait>(
        conn: &C,
        session_id: Uuid,
    ) -> Result<Option<response::Model>, DbErr> {
        response::Entity::find()
            .filter(response::Column::SessionId.eq(session_id))
            .filter(response::Column::SubmittedAt.is_null())
            .one(conn)
            .await
            .inspect_err(
                |error| tracing::error!(error = error as &dyn Error, %session_id, "failed to load pending response"),
            )
    }

    pub async fn submitted_responses<C: ConnectionTrait>(
        conn: &C,
        session_id: Uuid,
    ) -> Result<Vec<response::Model>, DbErr> {
        response::Entity::find()
            .filter(response::Column::SessionId.eq(session_id))
            .filter(response::Column::SubmittedAt.is_not_null())
            .order_by_asc(response::Column::Position)
            .all(conn)
            .await
    }

    pub async fn response_at<C: ConnectionTrait>(
        conn: &C,
        session_id: Uuid,
        position: i32,
    ) -> Result<Option<response::Model>, DbErr> {
        response::Entity::find()
            .filter(response::Column::SessionId.eq(session_id))
            .filter(response::Column::Position.eq(position))
            .one(conn)
            .await
    }
}
