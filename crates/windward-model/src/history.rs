use crate::result::ResultView;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use windward_irt::CefrLevel;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct History {
    pub results: Vec<ResultView>,
}

/// Movement of one skill between the two most recent placement results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SkillTrend {
    pub skill: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_theta: Option<f64>,
    pub current_theta: f64,
    pub delta: f64,
    #[schema(value_type = String)]
    pub current_level: CefrLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProgressReport {
    #[schema(value_type = Option<String>)]
    pub overall_level: Option<CefrLevel>,
    pub trends: Vec<SkillTrend>,
}
