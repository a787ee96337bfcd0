//! Application-wide error types.
//!
//! The taxonomy is deliberately coarse: callers of the desktop auth endpoints
//! only ever learn whether a credential was accepted, whether the request body
//! was malformed, or whether the server failed. The variant payloads carry the
//! internal cause for logging and are never sent to the client.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing, invalid, expired, revoked or already-used credential.
    #[error("Authentication failed: {0}")]
    Unauthenticated(String),

    /// Malformed request body.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Storage or signing failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Unauthenticated(_) => 401,
            Self::Validation(_) => 400,
            Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "UNAUTHENTICATED",
            Self::Validation(_) => "VALIDATION",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Returns the message shown to the client.
    ///
    /// Never includes the wrapped cause.
    #[must_use]
    pub const fn public_message(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "Invalid or expired credentials",
            Self::Validation(_) => "Invalid request body",
            Self::Internal(_) => "An internal error occurred",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(AppError::Unauthenticated(String::new()), 401, "UNAUTHENTICATED")]
    #[case(AppError::Validation(String::new()), 400, "VALIDATION")]
    #[case(AppError::Internal(String::new()), 500, "INTERNAL")]
    fn test_error_status_and_code(
        #[case] err: AppError,
        #[case] status: u16,
        #[case] code: &str,
    ) {
        assert_eq!(err.status_code(), status);
        assert_eq!(err.error_code(), code);
    }

    #[test]
    fn test_public_message_hides_cause() {
        let err = AppError::Internal("connection refused to 10.0.0.3".into());
        assert!(!err.public_message().contains("10.0.0.3"));

        let err = AppError::Unauthenticated("code already used".into());
        assert_eq!(err.public_message(), "Invalid or expired credentials");
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            AppError::Unauthenticated("msg".into()).to_string(),
            "Authentication failed: msg"
        );
        assert_eq!(
            AppError::Validation("msg".into()).to_string(),
            "Validation error: msg"
        );
        assert_eq!(
            AppError::Internal("msg".into()).to_string(),
            "Internal error: msg"
        );
    }
}
