//! Error types for factbook
//!
//! Every failure a handler can surface maps onto one HTTP status through
//! [`FactbookError::status_code`].

use hyper::StatusCode;

/// Main error type for factbook operations
#[derive(Debug, thiserror::Error)]
pub enum FactbookError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Field validation failures, one full message per broken rule
    #[error("Validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Authentication error: {0}")]
    Auth(String),
}

impl FactbookError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the error is caused by the server side rather than the request
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl From<std::io::Error> for FactbookError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for FactbookError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for FactbookError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<mongodb::error::Error> for FactbookError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Result type alias for factbook operations
pub type Result<T> = std::result::Result<T, FactbookError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            FactbookError::Validation(vec!["Email can't be blank".into()]).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            FactbookError::Unauthorized("nope".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            FactbookError::Forbidden("csrf".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            FactbookError::NotFound("member".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert!(FactbookError::Database("down".into()).is_server_error());
    }

    #[test]
    fn test_validation_display_joins_messages() {
        let err = FactbookError::Validation(vec![
            "First name can't be blank".into(),
            "Last name can't be blank".into(),
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: First name can't be blank, Last name can't be blank"
        );
    }
}
