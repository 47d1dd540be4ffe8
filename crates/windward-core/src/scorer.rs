use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use windward_entity::response;

use crate::error::EngineError;

#[derive(Debug, Error)]
pub enum ScorerError {
    #[error("scorer backend unavailable: {0}")]
    Unavailable(String),

    #[error("scoring call timed out")]
    Timeout,
}

/// Per-criterion scores in [0, 1] from the external speech pipeline, plus
/// the recognized transcript when available.
#[derive(Debug, Clone)]
pub struct SpeakingEvaluation {
    pub criteria_scores: BTreeMap<String, f64>,
    pub transcript: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WritingEvaluation {
    pub criteria_scores: BTreeMap<String, f64>,
    pub essay_text: Option<String>,
    pub word_count: Option<u32>,
}

/// Port to the external ASR + rating service for speaking diagnostics.
#[async_trait]
pub trait SpeakingEvaluator: Send + Sync {
    async fn evaluate(&self, responses: &[response::Model]) -> Result<SpeakingEvaluation, ScorerError>;
}

/// Port to the external essay rating service for writing diagnostics.
#[async_trait]
pub trait WritingEvaluator: Send + Sync {
    async fn evaluate(&self, responses: &[response::Model]) -> Result<WritingEvaluation, ScorerError>;
}

#[derive(Clone)]
pub struct Scorers {
    pub speaking: Arc<dyn SpeakingEvaluator>,
    pub writing: Arc<dyn WritingEvaluator>,
}

/// Run a scorer call under its configured deadline. A timeout or backend
/// failure surfaces as SCORER_UNAVAILABLE and leaves the session untouched
/// so the client can retry `complete`.
pub(crate) async fn with_deadline<T>(
    timeout_s: u64,
    call: impl Future<Output = Result<T, ScorerError>>,
) -> Result<T, EngineError> {
    match tokio::time::timeout(Duration::from_secs(timeout_s), call).await {
        Ok(Ok(evaluation)) => Ok(evaluation),
        Ok(Err(error)) => {
            tracing::warn!(error = &error as &dyn std::error::Error, "scorer call failed");
            Err(EngineError::ScorerUnavailable)
        }
        Err(_) => {
            tracing::warn!(timeout_s, "scorer call timed out");
            Err(EngineError::ScorerUnavailable)
        }
    }
}

/// Score one placement answer against the item's answer key. Comparison is
/// case-insensitive on trimmed string forms so `"B"` matches `"b"` and a
/// numeric option index round-trips through JSON either way.
pub fn score_placement_answer(content: &Value, response_data: &Value) -> Result<(f64, bool), EngineError> {
    let correct = content
        .get("correct_answer")
        .ok_or_else(|| EngineError::InvalidResponse("item carries no answer key".to_owned()))?;
    let selected = response_data
        .get("selected_option")
        .ok_or_else(|| EngineError::InvalidResponse("missing selected_option".to_owned()))?;

    let is_correct = canonical(correct) == canonical(selected);
    Ok((if is_correct { 1.0 } else { 0.0 }, is_correct))
}

fn canonical(value: &Value) -> String {
    match value {
        Value::String(text) => text.trim().to_lowercase(),
        other => other.to_string().trim().to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn exact_match_scores_one() {
        let (score, correct) =
            score_placement_answer(&json!({"correct_answer": "b"}), &json!({"selected_option": "b"})).unwrap();
        assert!(correct);
        assert!((score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn comparison_ignores_case_and_whitespace() {
        let (_, correct) =
            score_placement_answer(&json!({"correct_answer": " B "}), &json!({"selected_option": "b"})).unwrap();
        assert!(correct);
    }

    #[test]
    fn numbers_compare_by_string_form() {
        let (_, correct) =
            score_placement_answer(&json!({"correct_answer": 2}), &json!({"selected_option": "2"})).unwrap();
        assert!(correct);
    }

    #[test]
    fn wrong_option_scores_zero() {
        let (score, correct) =
            score_placement_answer(&json!({"correct_answer": "a"}), &json!({"selected_option": "c"})).unwrap();
        assert!(!correct);
        assert!(score.abs() < f64::EPSILON);
    }

    #[test]
    fn missing_answer_key_is_rejected() {
        assert!(matches!(
            score_placement_answer(&json!({}), &json!({"selected_option": "a"})),
            Err(EngineError::InvalidResponse(_))
        ));
    }

    #[test]
    fn missing_selection_is_rejected() {
        assert!(matches!(
            score_placement_answer(&json!({"correct_answer": "a"}), &json!({})),
            Err(EngineError::InvalidResponse(_))
        ));
    }
}
