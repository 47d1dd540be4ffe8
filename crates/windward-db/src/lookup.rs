use sea_orm::DbErr;

/// Missing-row handling for lookups the caller requires to succeed. The
/// entity name is carried into the error so a 404 says what was missing.
pub trait OrMissing<T> {
    fn or_missing(self, entity: &str) -> Result<T, DbErr>;
}

impl<T> OrMissing<T> for Result<Option<T>, DbErr> {
    fn or_missing(self, entity: &str) -> Result<T, DbErr> {
        self?.ok_or_else(|| DbErr::RecordNotFound(format!("{entity} not found")))
    }
}
