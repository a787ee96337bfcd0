//! JSON error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use framefast_core::DeviceAuthError;
use framefast_shared::AppError;

/// Handler error rendered as `{"error": {"code", "message"}}`.
///
/// The message is always the generic one for the code; the wrapped cause is
/// logged for internal errors and never sent to the client.
#[derive(Debug)]
pub struct ApiError(pub AppError);

/// Convenience type alias for handler return values.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// An authentication failure.
    #[must_use]
    pub fn unauthenticated(reason: &str) -> Self {
        Self(AppError::Unauthenticated(reason.to_string()))
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<DeviceAuthError> for ApiError {
    fn from(err: DeviceAuthError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let AppError::Internal(cause) = &self.0 {
            error!(error = %cause, "Internal error");
        }

        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = json!({
            "error": {
                "code": self.0.error_code(),
                "message": self.0.public_message(),
            }
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use rstest::rstest;

    #[rstest]
    #[case(
        AppError::Unauthenticated("code already used".into()),
        StatusCode::UNAUTHORIZED,
        "UNAUTHENTICATED"
    )]
    #[case(AppError::Validation("missing field".into()), StatusCode::BAD_REQUEST, "VALIDATION")]
    #[case(
        AppError::Internal("connection refused".into()),
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL"
    )]
    #[tokio::test]
    async fn test_envelope_hides_cause(
        #[case] err: AppError,
        #[case] status: StatusCode,
        #[case] code: &str,
    ) {
        let response = ApiError(err).into_response();
        assert_eq!(response.status(), status);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"]["code"], code);
        let message = json["error"]["message"].as_str().unwrap();
        assert!(!message.contains("already used"));
        assert!(!message.contains("missing field"));
        assert!(!message.contains("connection refused"));
    }
}
