//! Desktop auth error types.

use thiserror::Error;

use framefast_shared::error::AppError;
use framefast_shared::jwt::JwtError;

use crate::store::StoreError;

/// Errors raised by the pairing and refresh services.
#[derive(Debug, Error)]
pub enum DeviceAuthError {
    /// Missing, invalid, expired, used or revoked credential.
    ///
    /// Carries no detail on purpose: callers must not be able to tell an
    /// expired code from a used one.
    #[error("invalid or expired credentials")]
    Unauthenticated,

    /// The backing store failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Access token signing failed.
    #[error("signing error: {0}")]
    Signing(String),
}

impl DeviceAuthError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Unauthenticated => 401,
            Self::Storage(_) | Self::Signing(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Storage(_) | Self::Signing(_) => "INTERNAL",
        }
    }
}

impl From<StoreError> for DeviceAuthError {
    fn from(err: StoreError) -> Self {
        Self::Storage(err.0)
    }
}

impl From<JwtError> for DeviceAuthError {
    fn from(err: JwtError) -> Self {
        Self::Signing(err.to_string())
    }
}

impl From<DeviceAuthError> for AppError {
    fn from(err: DeviceAuthError) -> Self {
        match err {
            DeviceAuthError::Unauthenticated => Self::Unauthenticated(err.to_string()),
            DeviceAuthError::Storage(_) | DeviceAuthError::Signing(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}
