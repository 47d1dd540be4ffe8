use crate::routes::error::{db_response, engine_response};
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use thiserror::Error;
use windward_core::EngineError;
use windward_db::sea_orm::DbErr;

#[derive(Debug, Error)]
pub(crate) enum Error {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Db(#[from] DbErr),

    #[error("caller may not access this session")]
    Forbidden,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Self::Engine(error) => engine_response(error),
            Self::Db(error) => db_response(error),
            Self::Forbidden => StatusCode::FORBIDDEN.into_response(),
        }
    }
}
