use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Course,
    Lesson,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationSource {
    Auto,
    Manual,
}

/// One row of the ordered learning plan attached to a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecommendationView {
    pub content_id: Uuid,
    pub content_kind: ContentKind,
    pub target_skill: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_gap_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    pub priority_order: i32,
    pub source: RecommendationSource,
}
