use axum::response::{IntoResponse, Response};
use http::StatusCode;
use std::error::Error;
use windward_core::EngineError;
use windward_db::sea_orm::DbErr;

/// Map an engine failure onto the wire contract. Expected state-machine
/// rejections keep their message; internal failures are logged and return
/// an opaque 500.
pub(crate) fn engine_response(error: EngineError) -> Response {
    let status = match &error {
        EngineError::NotFound => StatusCode::NOT_FOUND,
        EngineError::Forbidden => StatusCode::FORBIDDEN,
        EngineError::InvalidResponse(_) => StatusCode::BAD_REQUEST,
        EngineError::AssignmentNotStartable
        | EngineError::AlreadyCompleted
        | EngineError::NotAcceptingAnswers
        | EngineError::Conflict => StatusCode::CONFLICT,
        EngineError::AssignmentExpired | EngineError::SessionExpired => StatusCode::GONE,
        EngineError::WrongItem | EngineError::NoItemsAvailable => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::ScorerUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::Config(_) | EngineError::Conversion(_) | EngineError::Db(_) => {
            tracing::error!(error = &error as &dyn Error, "request failed internally");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    (status, error.to_string()).into_response()
}

pub(crate) fn db_response(error: DbErr) -> Response {
    match error {
        DbErr::RecordNotFound(_) => StatusCode::NOT_FOUND.into_response(),
        error => {
            tracing::error!(error = &error as &dyn Error, "database error");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
