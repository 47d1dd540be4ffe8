use thiserror::Error;
use windward_config::ConfigError;
use windward_db::sea_orm::{DbErr, TransactionError};
use windward_db::session::SessionWriteError;
use windward_model_tools::error::ConversionError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("record not found")]
    NotFound,

    #[error("caller is not allowed to act on this record")]
    Forbidden,

    #[error("assignment cannot be started in its current state")]
    AssignmentNotStartable,

    #[error("assignment is past its due date")]
    AssignmentExpired,

    #[error("session has expired")]
    SessionExpired,

    #[error("session is already completed")]
    AlreadyCompleted,

    #[error("session is not accepting answers")]
    NotAcceptingAnswers,

    #[error("session state changed concurrently")]
    Conflict,

    #[error("submitted item does not match the current question")]
    WrongItem,

    #[error("invalid response payload: {0}")]
    InvalidResponse(String),

    #[error("no suitable items available")]
    NoItemsAvailable,

    #[error("external scorer unavailable")]
    ScorerUnavailable,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("database error")]
    Db(DbErr),
}

impl From<DbErr> for EngineError {
    fn from(error: DbErr) -> Self {
        match error {
            DbErr::RecordNotFound(_) => Self::NotFound,
            other => Self::Db(other),
        }
    }
}

impl From<SessionWriteError> for EngineError {
    fn from(error: SessionWriteError) -> Self {
        match error {
            // A duplicate submit and a lost optimistic write both mean the
            // caller raced another request; both surface as a conflict.
            SessionWriteError::Conflict | SessionWriteError::AlreadyAnswered => Self::Conflict,
            SessionWriteError::Db(db) => db.into(),
        }
    }
}

impl From<TransactionError<EngineError>> for EngineError {
    fn from(error: TransactionError<EngineError>) -> Self {
        match error {
            TransactionError::Connection(db) => db.into(),
            TransactionError::Transaction(inner) => inner,
        }
    }
}
