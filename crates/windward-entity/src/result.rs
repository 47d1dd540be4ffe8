use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum ResultKind {
    #[sea_orm(string_value = "P")]
    Placement,
    #[sea_orm(string_value = "S")]
    Speaking,
    #[sea_orm(string_value = "W")]
    Writing,
}

/// Final measurement for a completed session. Written exactly once.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "assessment_result")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub session_id: Uuid,
    pub proficiency_level: String,
    /// Map of skill name to `{theta, standard_error, cefr}`.
    pub skill_scores: Json,
    pub overall_score: f64,
    pub result_kind: ResultKind,
    pub information_metric: Option<Json>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "crate::session::Entity",
        from = "Column::SessionId",
        to = "crate::session::Column::Id"
    )]
    Session,
    #[sea_orm(has_many = "crate::recommendation::Entity")]
    Recommendations,
}

impl Related<crate::session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl Related<crate::recommendation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recommendations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
