use crate::convert::FromDbModel;
use windward_entity::recommendation as db_recommendation;
use windward_model::recommendation::{ContentKind, RecommendationSource, RecommendationView};

impl FromDbModel<db_recommendation::ContentKind> for ContentKind {
    fn from_db_model(model: db_recommendation::ContentKind) -> Self {
        match model {
            db_recommendation::ContentKind::Course => Self::Course,
            db_recommendation::ContentKind::Lesson => Self::Lesson,
        }
    }
}

impl FromDbModel<db_recommendation::RecommendationSource> for RecommendationSource {
    fn from_db_model(model: db_recommendation::RecommendationSource) -> Self {
        match model {
            db_recommendation::RecommendationSource::Auto => Self::Auto,
            db_recommendation::RecommendationSource::Manual => Self::Manual,
        }
    }
}

impl FromDbModel<db_recommendation::Model> for RecommendationView {
    fn from_db_model(model: db_recommendation::Model) -> Self {
        Self {
            content_id: model.content_id,
            content_kind: ContentKind::from_db_model(model.content_kind),
            target_skill: model.target_skill,
            skill_gap_size: model.skill_gap_size,
            rationale: model.rationale,
            priority_order: model.priority_order,
            source: RecommendationSource::from_db_model(model.source),
        }
    }
}
