use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use thiserror::Error;

use crate::domain::errors::{DomainError, FieldErrors};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotFound(what) => AppError::NotFound(what),
            DomainError::InvalidInput(msg) => AppError::BadRequest(msg),
            DomainError::Validation(fields) => AppError::Validation(fields),
            e @ (DomainError::EmptyCart
            | DomainError::TerminalStatus(_)
            | DomainError::WrongStep { .. }) => AppError::Conflict(e.to_string()),
            DomainError::Unauthenticated => AppError::Unauthorized,
            DomainError::Persistence(msg) => AppError::Unavailable(msg),
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut resp = HttpResponse::build(self.status_code());
        match self {
            AppError::Validation(fields) => resp.json(serde_json::json!({
                "error": self.to_string(),
                "fields": fields
            })),
            AppError::Unavailable(_) => resp.json(serde_json::json!({
                "error": "Could not save changes, please try again",
                "retryable": true
            })),
            AppError::Internal(_) => resp.json(serde_json::json!({
                "error": "Internal server error"
            })),
            _ => resp.json(serde_json::json!({
                "error": self.to_string()
            })),
        }
    }
}
