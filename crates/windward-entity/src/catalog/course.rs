use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "course")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub pathway_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub target_cefr: String,
    pub primary_skill: String,
    /// JSON array of additional skill names covered by the course.
    pub secondary_skills: Json,
    pub difficulty_order: i32,
    /// JSON map of skill name to minimum CEFR level, e.g. `{"grammar": "A2"}`.
    pub prerequisites: Json,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Model {
    pub fn secondary_skills(&self) -> Vec<String> {
        serde_json::from_value(self.secondary_skills.clone()).unwrap_or_default()
    }

    pub fn prerequisites(&self) -> std::collections::BTreeMap<String, String> {
        serde_json::from_value(self.prerequisites.clone()).unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "crate::pathway::Entity",
        from = "Column::PathwayId",
        to = "crate::pathway::Column::Id"
    )]
    Pathway,
    #[sea_orm(has_many = "super::lesson::Entity")]
    Lessons,
}

impl Related<crate::pathway::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pathway.def()
    }
}

impl Related<super::lesson::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lessons.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
