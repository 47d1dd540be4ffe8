use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ActiveValue, ConnectionTrait, DbErr};
use std::error::Error;
use uuid::Uuid;
use windward_entity::audit::{ActiveModel as ActiveAudit, ActorKind, Model as AuditEntry};

pub struct Mutation;

impl Mutation {
    /// Append one audit row. Callers run this inside the same transaction
    /// as the action it describes, so the action and its record commit or
    /// roll back together.
    #[allow(clippy::too_many_arguments)]
    pub async fn append<C: ConnectionTrait>(
        conn: &C,
        actor_id: Option<Uuid>,
        actor_kind: ActorKind,
        action: &str,
        entity_type: &str,
        entity_id: String,
        details: Option<serde_json::Value>,
        now: DateTime<Utc>,
    ) -> Result<AuditEntry, DbErr> {
        let row = ActiveAudit {
            id: ActiveValue::Set(Uuid::new_v4()),
            actor_id: ActiveValue::Set(actor_id),
            actor_kind: ActiveValue::Set(actor_kind),
            action: ActiveValue::Set(action.to_owned()),
            entity_type: ActiveValue::Set(entity_type.to_owned()),
            entity_id: ActiveValue::Set(entity_id),
            details: ActiveValue::Set(details),
            created_at: ActiveValue::Set(now),
        };
        row.insert(conn)
            .await
            .inspect_err(|error| tracing::error!(error = error as &dyn Error, action, "failed to append audit entry"))
    }
}
