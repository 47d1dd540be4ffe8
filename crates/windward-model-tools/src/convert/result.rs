use crate::convert::{FromDbModel, TryFromDbModel};
use crate::error::ConversionError;
use std::str::FromStr;
use windward_entity::result as db_result;
use windward_irt::CefrLevel;
use windward_model::result::{ResultKind, ResultView};

impl FromDbModel<db_result::ResultKind> for ResultKind {
    fn from_db_model(model: db_result::ResultKind) -> Self {
        match model {
            db_result::ResultKind::Placement => Self::Placement,
            db_result::ResultKind::Speaking => Self::Speaking,
            db_result::ResultKind::Writing => Self::Writing,
        }
    }
}

impl TryFromDbModel<db_result::Model> for ResultView {
    type Error = ConversionError;

    fn try_from_db_model(model: db_result::Model) -> Result<Self, Self::Error> {
        let proficiency_level = CefrLevel::from_str(&model.proficiency_level)
            .map_err(|_| ConversionError::InvalidCefr(model.proficiency_level.clone()))?;
        Ok(Self {
            result_id: model.id,
            session_id: model.session_id,
            proficiency_level,
            skill_scores: serde_json::from_value(model.skill_scores)?,
            overall_score: model.overall_score,
            result_kind: ResultKind::from_db_model(model.result_kind),
            information_metric: model.information_metric,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::TryIntoModel;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn stored(level: &str) -> db_result::Model {
        db_result::Model {
            id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            proficiency_level: level.to_owned(),
            skill_scores: json!({
                "grammar": {"theta": -0.5, "standard_error": 0.4, "cefr": "A2"}
            }),
            overall_score: -0.5,
            result_kind: db_result::ResultKind::Placement,
            information_metric: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn decodes_skill_scores() {
        let view: ResultView = stored("A2").try_into_model().unwrap();
        assert_eq!(view.proficiency_level, CefrLevel::A2);
        let grammar = &view.skill_scores["grammar"];
        assert_eq!(grammar.cefr, CefrLevel::A2);
        assert!((grammar.theta + 0.5).abs() < 1e-9);
    }

    #[test]
    fn rejects_garbage_levels() {
        let result: Result<ResultView, _> = stored("Z9").try_into_model();
        assert!(matches!(result, Err(ConversionError::InvalidCefr(level)) if level == "Z9"));
    }
}
