use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        // 23P01 = exclusion_violation, 23505 = unique_violation
        if let sqlx::Error::Database(ref db_err) = err {
            if matches!(db_err.code().as_deref(), Some("23P01") | Some("23505")) {
                return RepositoryError::Conflict(db_err.message().to_string());
            }
        }
        RepositoryError::DatabaseError(err)
    }
}
