use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum ItemKind {
    #[sea_orm(string_value = "multiple_choice")]
    MultipleChoice,
    #[sea_orm(string_value = "speaking_prompt")]
    SpeakingPrompt,
    #[sea_orm(string_value = "writing_prompt")]
    WritingPrompt,
}

/// A calibrated item. IRT parameters are fixed at calibration time; an item
/// that has been answered is deactivated instead of edited in place.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "assessment_item")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub content: Json,
    pub item_kind: ItemKind,
    /// JSON array of skill names, e.g. `["grammar", "reading"]`.
    pub skill_areas: Json,
    pub target_cefr: String,
    pub discrimination: f64,
    pub difficulty: f64,
    pub guessing: f64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Model {
    pub fn skills(&self) -> Vec<String> {
        serde_json::from_value(self.skill_areas.clone()).unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
