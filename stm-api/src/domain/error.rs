use thiserror::Error;

use crate::repositories::RepositoryError;

/// Everything that can go wrong while validating or storing a time entry.
///
/// Repository conflicts and missing rows are folded into the matching domain
/// variants so that callers see one taxonomy regardless of whether a check
/// failed in application code or at the database constraint.
#[derive(Debug, Error)]
pub enum EntryError {
    #[error("date, code, start and end are required")]
    MissingFields,
    #[error("invalid time or date format: {0}")]
    InvalidFormat(String),
    #[error("start must be before end")]
    InvalidRange,
    #[error("unknown entry code: {0}")]
    InvalidCode(String),
    #[error("code AKN requires a customer")]
    MissingCustomer,
    #[error("customer not found: {0}")]
    UnknownCustomer(i32),
    #[error("customer can only be set on AKN entries")]
    CustomerNotAllowed,
    #[error("entry overlaps an existing entry on the same day")]
    OverlapDetected,
    #[error("entry not found")]
    NotFound,
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for EntryError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(_) => EntryError::OverlapDetected,
            RepositoryError::NotFound(_) => EntryError::NotFound,
            other => EntryError::Repository(other),
        }
    }
}
