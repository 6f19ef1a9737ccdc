use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

use crate::{domain::EntryError, repositories::RepositoryError};

/// Machine-readable rejection codes, mirrored by the offline client when it
/// decides whether a queued write was rejected or just could not be sent.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    MissingFields,
    InvalidFormat,
    InvalidRange,
    InvalidCode,
    MissingCustomer,
    UnknownCustomer,
    CustomerNotAllowed,
    OverlapDetected,
    NotFound,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<ErrorCode>,
}

pub struct ApiError {
    status: StatusCode,
    message: String,
    code: Option<ErrorCode>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            code: self.code,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DatabaseError(ref e) => {
                tracing::error!("Database error: {:?}", e);
                Self::internal(err.to_string())
            }
            RepositoryError::NotFound(_) => {
                Self::not_found(err.to_string()).with_code(ErrorCode::NotFound)
            }
            RepositoryError::Conflict(_) => Self::conflict(err.to_string()),
        }
    }
}

impl From<EntryError> for ApiError {
    fn from(err: EntryError) -> Self {
        let message = err.to_string();
        match err {
            EntryError::MissingFields => {
                Self::bad_request(message).with_code(ErrorCode::MissingFields)
            }
            EntryError::InvalidFormat(_) => {
                Self::bad_request(message).with_code(ErrorCode::InvalidFormat)
            }
            EntryError::InvalidRange => {
                Self::bad_request(message).with_code(ErrorCode::InvalidRange)
            }
            EntryError::InvalidCode(_) => {
                Self::bad_request(message).with_code(ErrorCode::InvalidCode)
            }
            EntryError::MissingCustomer => {
                Self::bad_request(message).with_code(ErrorCode::MissingCustomer)
            }
            EntryError::UnknownCustomer(_) => {
                Self::bad_request(message).with_code(ErrorCode::UnknownCustomer)
            }
            EntryError::CustomerNotAllowed => {
                Self::bad_request(message).with_code(ErrorCode::CustomerNotAllowed)
            }
            EntryError::OverlapDetected => {
                Self::conflict(message).with_code(ErrorCode::OverlapDetected)
            }
            EntryError::NotFound => Self::not_found(message).with_code(ErrorCode::NotFound),
            EntryError::Repository(err) => Self::from(err),
        }
    }
}
