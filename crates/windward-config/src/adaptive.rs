use crate::error::ConfigError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use windward_irt::select::SkillQuota;
use windward_irt::terminate::StopRule;
use windward_irt::{IrtModel, ProficiencyRange};

/// Tunables for the adaptive (placement) flow, stored as the
/// `adaptive_params` JSON of an assessment config row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, ToSchema)]
#[serde(default, deny_unknown_fields, rename_all = "snake_case")]
pub struct AdaptiveParams {
    pub starting_ability: f64,
    pub min_questions: u32,
    pub max_questions: u32,
    pub stopping_criterion: StoppingCriterion,
    pub skill_areas: Vec<SkillArea>,
    #[schemars(skip)]
    #[schema(value_type = Object)]
    pub proficiency_range: ProficiencyRange,
    pub top_k_selection: usize,
    #[schemars(skip)]
    #[schema(value_type = String)]
    pub irt_model: IrtModel,
}

impl Default for AdaptiveParams {
    fn default() -> Self {
        Self {
            starting_ability: 0.0,
            min_questions: 5,
            max_questions: 25,
            stopping_criterion: StoppingCriterion::default(),
            skill_areas: Vec::new(),
            proficiency_range: ProficiencyRange::default(),
            top_k_selection: 1,
            irt_model: IrtModel::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema, ToSchema)]
#[serde(default, deny_unknown_fields, rename_all = "snake_case")]
pub struct StoppingCriterion {
    pub standard_error: f64,
}

impl Default for StoppingCriterion {
    fn default() -> Self {
        Self { standard_error: 0.3 }
    }
}

/// Coverage requirement for one skill within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, ToSchema)]
#[serde(deny_unknown_fields, rename_all = "snake_case")]
pub struct SkillArea {
    pub name: String,
    #[serde(default)]
    pub min_items: u32,
    #[serde(default)]
    pub max_items: Option<u32>,
}

impl AdaptiveParams {
    /// Decode from the stored JSON column; an absent column means the
    /// defaults apply.
    pub fn decode(value: Option<&Value>) -> Result<Self, ConfigError> {
        let params = match value {
            Some(value) => serde_json::from_value(value.clone())?,
            None => Self::default(),
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_questions > self.max_questions {
            return Err(ConfigError::QuestionLimits {
                min: self.min_questions,
                max: self.max_questions,
            });
        }
        if self.top_k_selection == 0 {
            return Err(ConfigError::ZeroTopK);
        }
        for area in &self.skill_areas {
            if let Some(max) = area.max_items {
                if area.min_items > max {
                    return Err(ConfigError::SkillQuota(area.name.clone()));
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn stop_rule(&self) -> StopRule {
        StopRule {
            min_questions: self.min_questions,
            max_questions: self.max_questions,
            target_standard_error: self.stopping_criterion.standard_error,
        }
    }

    #[must_use]
    pub fn quotas(&self) -> Vec<SkillQuota> {
        self.skill_areas
            .iter()
            .map(|area| SkillQuota {
                skill: area.name.clone(),
                min_items: area.min_items,
                max_items: area.max_items,
            })
            .collect()
    }

    #[must_use]
    pub fn skill_names(&self) -> Vec<String> {
        self.skill_areas.iter().map(|area| area.name.clone()).collect()
    }
}

/// General per-template parameters stored in the `parameters` JSON column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema, ToSchema)]
#[serde(default, rename_all = "snake_case")]
pub struct GeneralParams {
    pub time_limit_minutes: i64,
}

impl Default for GeneralParams {
    fn default() -> Self {
        Self { time_limit_minutes: 120 }
    }
}

impl GeneralParams {
    pub fn decode(value: Option<&Value>) -> Result<Self, ConfigError> {
        match value {
            Some(value) => Ok(serde_json::from_value(value.clone())?),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_column_yields_defaults() {
        let params = AdaptiveParams::decode(None).unwrap();
        assert_eq!(params.min_questions, 5);
        assert_eq!(params.max_questions, 25);
        assert!((params.stopping_criterion.standard_error - 0.3).abs() < f64::EPSILON);
        assert_eq!(params.irt_model, IrtModel::TwoPl);
    }

    #[test]
    fn decodes_stored_json() {
        let value = json!({
            "starting_ability": 0.5,
            "min_questions": 8,
            "max_questions": 20,
            "stopping_criterion": {"standard_error": 0.25},
            "skill_areas": [
                {"name": "grammar", "min_items": 3, "max_items": 10},
                {"name": "reading"}
            ],
            "irt_model": "3PL",
            "top_k_selection": 3
        });
        let params = AdaptiveParams::decode(Some(&value)).unwrap();
        assert_eq!(params.min_questions, 8);
        assert_eq!(params.irt_model, IrtModel::ThreePl);
        assert_eq!(params.skill_areas.len(), 2);
        assert_eq!(params.skill_areas[1].min_items, 0);
        assert_eq!(params.quotas()[0].max_items, Some(10));
    }

    #[test]
    fn rejects_inverted_question_limits() {
        let value = json!({"min_questions": 10, "max_questions": 5});
        assert!(matches!(
            AdaptiveParams::decode(Some(&value)),
            Err(ConfigError::QuestionLimits { min: 10, max: 5 })
        ));
    }

    #[test]
    fn rejects_unknown_fields() {
        let value = json!({"max_question": 10});
        assert!(AdaptiveParams::decode(Some(&value)).is_err());
    }
}
