use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum ContentKind {
    #[sea_orm(string_value = "course")]
    Course,
    #[sea_orm(string_value = "lesson")]
    Lesson,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum RecommendationSource {
    #[sea_orm(string_value = "AUTO")]
    Auto,
    #[sea_orm(string_value = "MANUAL")]
    Manual,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "recommended_item")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub result_id: Uuid,
    pub content_id: Uuid,
    pub content_kind: ContentKind,
    pub target_skill: String,
    pub skill_gap_size: Option<f64>,
    pub rationale: Option<String>,
    pub priority_order: i32,
    pub source: RecommendationSource,
    pub overridden_by: Option<Uuid>,
    pub overridden_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "crate::result::Entity",
        from = "Column::ResultId",
        to = "crate::result::Column::Id"
    )]
    Result,
}

impl Related<crate::result::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Result.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
