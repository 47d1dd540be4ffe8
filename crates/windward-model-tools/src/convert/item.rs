use crate::convert::FromDbModel;
use windward_entity::item as db_item;
use windward_model::item::{ItemKind, PublicItem};

impl FromDbModel<db_item::ItemKind> for ItemKind {
    fn from_db_model(model: db_item::ItemKind) -> Self {
        match model {
            db_item::ItemKind::MultipleChoice => Self::MultipleChoice,
            db_item::ItemKind::SpeakingPrompt => Self::SpeakingPrompt,
            db_item::ItemKind::WritingPrompt => Self::WritingPrompt,
        }
    }
}

/// Produces the sanitized client view: the answer key is removed here so no
/// caller can forget to strip it.
impl FromDbModel<db_item::Model> for PublicItem {
    fn from_db_model(model: db_item::Model) -> Self {
        let skill_areas = model.skills();
        let mut item = Self {
            id: model.id,
            item_kind: ItemKind::from_db_model(model.item_kind),
            content: model.content,
            skill_areas,
            target_cefr: model.target_cefr,
        };
        item.sanitize();
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::IntoModel;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn conversion_strips_the_answer_key() {
        let model = db_item::Model {
            id: Uuid::new_v4(),
            content: json!({"prompt": "Choose", "correct_answer": "b"}),
            item_kind: db_item::ItemKind::MultipleChoice,
            skill_areas: json!(["grammar"]),
            target_cefr: "A2".to_owned(),
            discrimination: 1.0,
            difficulty: 0.0,
            guessing: 0.0,
            active: true,
            created_at: Utc::now(),
        };
        let public: PublicItem = model.into_model();
        assert_eq!(public.content, json!({"prompt": "Choose"}));
        assert_eq!(public.skill_areas, vec!["grammar".to_owned()]);
    }
}
