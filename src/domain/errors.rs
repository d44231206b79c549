use std::collections::BTreeMap;

use thiserror::Error;

/// Field name → message, as surfaced next to each form input.
pub type FieldErrors = BTreeMap<&'static str, String>;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Validation failed: {}", format_fields(.0))]
    Validation(FieldErrors),
    #[error("Cart is empty")]
    EmptyCart,
    #[error("No authenticated user")]
    Unauthenticated,
    #[error("Order {0} is already delivered")]
    TerminalStatus(String),
    #[error("Checkout is at {actual}, expected {expected}")]
    WrongStep {
        expected: &'static str,
        actual: &'static str,
    },
    #[error("Persistence failed: {0}")]
    Persistence(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Persistence failures are the only ones worth resubmitting unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::Persistence(_))
    }
}

fn format_fields(fields: &FieldErrors) -> String {
    fields
        .iter()
        .map(|(field, msg)| format!("{field}: {msg}"))
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<std::io::Error> for DomainError {
    fn from(e: std::io::Error) -> Self {
        DomainError::Persistence(e.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}
