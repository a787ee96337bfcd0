//! Request extractors.

use axum::{
    Json,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use validator::Validate;

use framefast_shared::AppError;

use crate::error::ApiError;

/// JSON body that is deserialized and then validated.
///
/// Both failures surface as `VALIDATION`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError(AppError::Validation(rejection.body_text())))?;

        value
            .validate()
            .map_err(|errors| ApiError(AppError::Validation(errors.to_string())))?;

        Ok(Self(value))
    }
}
