use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;
use windward_irt::CefrLevel;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ResultKind {
    #[serde(rename = "P")]
    Placement,
    #[serde(rename = "S")]
    Speaking,
    #[serde(rename = "W")]
    Writing,
}

/// Per-skill measurement slice. For placement results this is an EAP run
/// over the responses tagged with the skill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SkillScore {
    pub theta: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub standard_error: Option<f64>,
    #[schema(value_type = String)]
    pub cefr: CefrLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ResultView {
    pub result_id: Uuid,
    pub session_id: Uuid,
    #[schema(value_type = String)]
    pub proficiency_level: CefrLevel,
    pub skill_scores: BTreeMap<String, SkillScore>,
    pub overall_score: f64,
    pub result_kind: ResultKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub information_metric: Option<Value>,
    pub created_at: DateTime<Utc>,
}
