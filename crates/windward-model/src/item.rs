use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    MultipleChoice,
    SpeakingPrompt,
    WritingPrompt,
}

/// The test-taker view of an item. Calibration parameters and the answer
/// key never leave the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PublicItem {
    pub id: Uuid,
    pub item_kind: ItemKind,
    pub content: Value,
    pub skill_areas: Vec<String>,
    pub target_cefr: String,
}

impl PublicItem {
    /// Strip scoring fields from the content payload.
    pub fn sanitize(&mut self) {
        if let Value::Object(content) = &mut self.content {
            content.remove("correct_answer");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sanitize_removes_the_answer_key() {
        let mut item = PublicItem {
            id: Uuid::new_v4(),
            item_kind: ItemKind::MultipleChoice,
            content: json!({"prompt": "Pick one", "options": ["a", "b"], "correct_answer": "a"}),
            skill_areas: vec!["grammar".to_owned()],
            target_cefr: "B1".to_owned(),
        };
        item.sanitize();
        assert_eq!(item.content, json!({"prompt": "Pick one", "options": ["a", "b"]}));
    }
}
