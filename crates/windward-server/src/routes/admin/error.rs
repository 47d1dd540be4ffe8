use crate::routes::error::{db_response, engine_response};
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use thiserror::Error;
use windward_config::ConfigError;
use windward_core::EngineError;
use windward_db::sea_orm::{DbErr, TransactionError};

#[derive(Debug, Error)]
pub(crate) enum AdminError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Db(#[from] DbErr),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Validation(String),

    #[error("record not found")]
    NotFound,
}

impl From<TransactionError<AdminError>> for AdminError {
    fn from(error: TransactionError<AdminError>) -> Self {
        match error {
            TransactionError::Connection(db) => db.into(),
            TransactionError::Transaction(inner) => inner,
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        match self {
            Self::Engine(error) => engine_response(error),
            Self::Db(error) => db_response(error),
            Self::Config(error) => (StatusCode::UNPROCESSABLE_ENTITY, error.to_string()).into_response(),
            Self::Validation(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            Self::NotFound => StatusCode::NOT_FOUND.into_response(),
        }
    }
}
