use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("stored proficiency level \"{0}\" is not a CEFR level")]
    InvalidCefr(String),

    #[error("failed to decode stored JSON column")]
    Json(#[from] serde_json::Error),
}
