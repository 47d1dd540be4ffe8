use crate::convert::FromDbModel;
use windward_entity::session as db_session;
use windward_model::session::{SessionStatus, SessionView};

impl FromDbModel<db_session::SessionStatus> for SessionStatus {
    fn from_db_model(model: db_session::SessionStatus) -> Self {
        match model {
            db_session::SessionStatus::InProgress => Self::InProgress,
            db_session::SessionStatus::Completed => Self::Completed,
            db_session::SessionStatus::Cancelled => Self::Cancelled,
            db_session::SessionStatus::Expired => Self::Expired,
        }
    }
}

impl FromDbModel<db_session::Model> for SessionView {
    fn from_db_model(model: db_session::Model) -> Self {
        Self {
            session_id: model.id,
            assigned_id: model.assigned_id,
            status: SessionStatus::from_db_model(model.status),
            questions_answered: model.questions_answered,
            current_ability: model.current_ability,
            standard_error: model.standard_error,
            started_at: model.started_at,
            completed_at: model.completed_at,
            expires_at: model.expires_at,
        }
    }
}
