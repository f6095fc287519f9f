//! Admin API error types.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdminError {
    #[error("Unauthorized")]
    Unauthorized,

    /// Authenticated but not on the admin allowlist.
    #[error("Admin access required")]
    Forbidden,

    #[error("{0}")]
    InvalidFilter(String),

    #[error("Failed to load {resource}")]
    Database { resource: &'static str, cause: String },
}

impl AdminError {
    pub fn database(resource: &'static str, err: DomainError) -> Self {
        AdminError::Database {
            resource,
            cause: err.to_string(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AdminError::Unauthorized => ErrorCode::Unauthorized,
            AdminError::Forbidden => ErrorCode::Forbidden,
            AdminError::InvalidFilter(_) => ErrorCode::ValidationFailed,
            AdminError::Database { .. } => ErrorCode::DatabaseError,
        }
    }
}

impl From<ValidationError> for AdminError {
    fn from(err: ValidationError) -> Self {
        AdminError::InvalidFilter(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_error_hides_cause() {
        let err = AdminError::database("sessions", DomainError::database("relation missing"));
        assert_eq!(err.to_string(), "Failed to load sessions");
        assert_eq!(err.code(), ErrorCode::DatabaseError);
    }
}
