use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use windward_core::scorer::{SpeakingEvaluation, WritingEvaluation};
use windward_core::{ScorerError, Scorers, SpeakingEvaluator, WritingEvaluator};
use windward_entity::response;

// TODO replace with the real rating-service clients once the ASR and essay
// endpoints are provisioned; these return fixed mid-band scores so the
// diagnostic pipeline is exercisable end to end.

pub(crate) struct PlaceholderSpeakingScorer;

#[async_trait]
impl SpeakingEvaluator for PlaceholderSpeakingScorer {
    async fn evaluate(&self, responses: &[response::Model]) -> Result<SpeakingEvaluation, ScorerError> {
        if responses.iter().all(|response| response.media_key.is_none()) {
            return Err(ScorerError::Unavailable("no audio artifacts to score".to_owned()));
        }
        Ok(SpeakingEvaluation {
            criteria_scores: BTreeMap::from([
                ("fluency".to_owned(), 0.62),
                ("pronunciation".to_owned(), 0.62),
                ("vocabulary".to_owned(), 0.62),
                ("grammar".to_owned(), 0.62),
            ]),
            transcript: None,
        })
    }
}

pub(crate) struct PlaceholderWritingScorer;

#[async_trait]
impl WritingEvaluator for PlaceholderWritingScorer {
    async fn evaluate(&self, responses: &[response::Model]) -> Result<WritingEvaluation, ScorerError> {
        let essay = responses
            .iter()
            .filter_map(|response| response.response_data.as_ref())
            .filter_map(|data| data.get("text").and_then(|text| text.as_str()))
            .collect::<Vec<_>>()
            .join("\n");
        if essay.is_empty() {
            return Err(ScorerError::Unavailable("no essay text to score".to_owned()));
        }
        let word_count = essay.split_whitespace().count() as u32;
        Ok(WritingEvaluation {
            criteria_scores: BTreeMap::from([
                ("content".to_owned(), 0.62),
                ("organization".to_owned(), 0.62),
                ("vocabulary".to_owned(), 0.62),
                ("grammar".to_owned(), 0.62),
            ]),
            essay_text: Some(essay),
            word_count: Some(word_count),
        })
    }
}

pub(crate) fn placeholder_scorers() -> Scorers {
    Scorers {
        speaking: Arc::new(PlaceholderSpeakingScorer),
        writing: Arc::new(PlaceholderWritingScorer),
    }
}
