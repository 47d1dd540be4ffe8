use crate::error::ConfigError;
use std::collections::BTreeMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use windward_irt::CefrLevel;

/// Whether diagnostic answers arrive one request per item or as a single
/// batch at the end.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionMode {
    #[default]
    OneByOne,
    Batch,
}

/// One cut point of the monotone score-to-band mapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema, ToSchema)]
#[serde(deny_unknown_fields, rename_all = "snake_case")]
pub struct BandCut {
    pub min_score: f64,
    #[schemars(skip)]
    #[schema(value_type = String)]
    pub level: CefrLevel,
}

/// Tunables for the non-adaptive speaking and writing flows, stored as the
/// `speaking_params` / `writing_params` JSON of an assessment config row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, ToSchema)]
#[serde(default, deny_unknown_fields, rename_all = "snake_case")]
pub struct DiagnosticParams {
    pub criteria_weights: BTreeMap<String, f64>,
    pub band_mapping: Vec<BandCut>,
    pub submission_mode: SubmissionMode,
    pub scorer_timeout_s: u64,
}

impl Default for DiagnosticParams {
    fn default() -> Self {
        Self {
            criteria_weights: BTreeMap::new(),
            band_mapping: default_band_mapping(),
            submission_mode: SubmissionMode::default(),
            scorer_timeout_s: 30,
        }
    }
}

fn default_band_mapping() -> Vec<BandCut> {
    [
        (0.0, CefrLevel::A1),
        (0.2, CefrLevel::A2),
        (0.35, CefrLevel::B1),
        (0.5, CefrLevel::B2),
        (0.65, CefrLevel::C1),
        (0.8, CefrLevel::C2),
    ]
    .into_iter()
    .map(|(min_score, level)| BandCut { min_score, level })
    .collect()
}

fn default_weights(criteria: &[&str]) -> BTreeMap<String, f64> {
    let share = 1.0 / criteria.len() as f64;
    criteria.iter().map(|&name| (name.to_owned(), share)).collect()
}

impl DiagnosticParams {
    pub fn decode_speaking(value: Option<&Value>) -> Result<Self, ConfigError> {
        let defaults = Self {
            criteria_weights: default_weights(&["fluency", "pronunciation", "vocabulary", "grammar"]),
            scorer_timeout_s: 30,
            ..Self::default()
        };
        Self::decode(value, defaults)
    }

    pub fn decode_writing(value: Option<&Value>) -> Result<Self, ConfigError> {
        let defaults = Self {
            criteria_weights: default_weights(&["content", "organization", "vocabulary", "grammar"]),
            scorer_timeout_s: 60,
            ..Self::default()
        };
        Self::decode(value, defaults)
    }

    fn decode(value: Option<&Value>, defaults: Self) -> Result<Self, ConfigError> {
        let mut params: Self = match value {
            Some(value) => serde_json::from_value(value.clone())?,
            None => return Ok(defaults),
        };
        if params.criteria_weights.is_empty() {
            params.criteria_weights = defaults.criteria_weights;
        }
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.criteria_weights.is_empty() || self.criteria_weights.values().any(|&weight| weight <= 0.0) {
            return Err(ConfigError::InvalidWeights);
        }
        let monotone = self
            .band_mapping
            .windows(2)
            .all(|pair| pair[0].min_score < pair[1].min_score && pair[0].level < pair[1].level);
        if !monotone || self.band_mapping.is_empty() {
            return Err(ConfigError::NonMonotoneBands);
        }
        Ok(())
    }

    /// Weighted overall score over the configured criteria. Criteria absent
    /// from the response score as zero; weights are normalized so partial
    /// weight sets still produce a [0, 1] score.
    #[must_use]
    pub fn overall_score(&self, criteria_scores: &BTreeMap<String, f64>) -> f64 {
        let total_weight: f64 = self.criteria_weights.values().sum();
        if total_weight <= 0.0 {
            return 0.0;
        }
        self.criteria_weights
            .iter()
            .map(|(name, weight)| weight * criteria_scores.get(name).copied().unwrap_or(0.0))
            .sum::<f64>()
            / total_weight
    }

    /// Map an overall score onto its CEFR band.
    #[must_use]
    pub fn band_for(&self, score: f64) -> CefrLevel {
        self.band_mapping
            .iter()
            .rev()
            .find(|cut| score >= cut.min_score)
            .map_or(CefrLevel::A1, |cut| cut.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn speaking_defaults_have_four_criteria() {
        let params = DiagnosticParams::decode_speaking(None).unwrap();
        assert_eq!(params.criteria_weights.len(), 4);
        assert_eq!(params.scorer_timeout_s, 30);
        let writing = DiagnosticParams::decode_writing(None).unwrap();
        assert_eq!(writing.scorer_timeout_s, 60);
    }

    #[test]
    fn weighted_overall_score() {
        let value = json!({
            "criteria_weights": {"fluency": 0.6, "grammar": 0.4}
        });
        let params = DiagnosticParams::decode_speaking(Some(&value)).unwrap();
        let scores = BTreeMap::from([("fluency".to_owned(), 0.5), ("grammar".to_owned(), 1.0)]);
        assert!((params.overall_score(&scores) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn band_mapping_is_applied_from_the_top() {
        let params = DiagnosticParams::decode_writing(None).unwrap();
        assert_eq!(params.band_for(0.1), CefrLevel::A1);
        assert_eq!(params.band_for(0.62), CefrLevel::B2);
        assert_eq!(params.band_for(0.95), CefrLevel::C2);
    }

    #[test]
    fn rejects_non_monotone_mapping() {
        let value = json!({
            "band_mapping": [
                {"min_score": 0.5, "level": "B2"},
                {"min_score": 0.3, "level": "C1"}
            ]
        });
        assert!(matches!(
            DiagnosticParams::decode_speaking(Some(&value)),
            Err(ConfigError::NonMonotoneBands)
        ));
    }
}
