use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum AssignmentStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "IN_PROGRESS")]
    InProgress,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    #[sea_orm(string_value = "EXPIRED")]
    Expired,
}

/// Grants one test-taker one attempt at a template.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "assigned_assessment")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub template_id: Uuid,
    pub test_taker_id: Uuid,
    pub assigned_by: Option<Uuid>,
    pub assigned_at: DateTime<Utc>,
    pub due_at: Option<DateTime<Utc>>,
    pub status: AssignmentStatus,
    pub notes: Option<String>,
}

impl Model {
    pub fn can_start(&self, now: DateTime<Utc>) -> bool {
        if !matches!(self.status, AssignmentStatus::Pending | AssignmentStatus::InProgress) {
            return false;
        }
        match self.due_at {
            Some(due) => now <= due,
            None => true,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "crate::template::Entity",
        from = "Column::TemplateId",
        to = "crate::template::Column::Id"
    )]
    Template,
    #[sea_orm(has_many = "crate::session::Entity")]
    Sessions,
}

impl Related<crate::template::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Template.def()
    }
}

impl Related<crate::session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
