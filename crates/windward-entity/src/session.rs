use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum SessionStatus {
    #[sea_orm(string_value = "IN_PROGRESS")]
    InProgress,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
    #[sea_orm(string_value = "EXPIRED")]
    Expired,
}

/// One concrete attempt at an assignment. `current_index` is the optimistic
/// concurrency token: every progress write is conditioned on it.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "assessment_session")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub assigned_id: Uuid,
    pub current_ability: f64,
    pub standard_error: Option<f64>,
    pub questions_answered: i32,
    pub current_index: i32,
    pub status: SessionStatus,
    pub template_snapshot: Json,
    pub rubric_snapshot: Option<Json>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

impl Model {
    pub fn is_time_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn can_accept_answer(&self, now: DateTime<Utc>) -> bool {
        self.status == SessionStatus::InProgress && !self.is_time_expired(now)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "crate::assignment::Entity",
        from = "Column::AssignedId",
        to = "crate::assignment::Column::Id"
    )]
    Assignment,
    #[sea_orm(has_many = "crate::response::Entity")]
    Responses,
}

impl Related<crate::assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignment.def()
    }
}

impl Related<crate::response::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Responses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
