use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// One presented item within a session. A row is created with
/// `submitted_at` unset when the question is shown and filled in on submit;
/// the `(session_id, item_id)` key makes double-appends impossible.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "assessment_response")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub session_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub item_id: Uuid,
    /// Zero-based position within the session; matches the session's
    /// `current_index` at presentation time.
    pub position: i32,
    pub response_data: Option<Json>,
    pub is_correct: Option<bool>,
    pub raw_score: Option<f64>,
    pub presented_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub time_taken: Option<i32>,
    pub media_key: Option<String>,
    pub asr_transcript: Option<String>,
}

impl Model {
    pub fn is_pending(&self) -> bool {
        self.submitted_at.is_none()
    }

    pub fn score(&self) -> f64 {
        if let Some(raw) = self.raw_score {
            return raw;
        }
        if self.is_correct == Some(true) { 1.0 } else { 0.0 }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "crate::session::Entity",
        from = "Column::SessionId",
        to = "crate::session::Column::Id"
    )]
    Session,
    #[sea_orm(
        belongs_to = "crate::item::Entity",
        from = "Column::ItemId",
        to = "crate::item::Column::Id"
    )]
    Item,
}

impl Related<crate::session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl Related<crate::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
