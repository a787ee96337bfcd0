//! Caller resolution for routes.
//!
//! Credentials are resolved to a [`Caller`] once per request and cached in
//! the request extensions; each extractor then checks the strategy its route
//! requires.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::warn;

use framefast_core::auth::{AuthStrategy, Caller, Credentials};
use framefast_shared::types::AccountId;

use crate::AppState;
use crate::error::ApiError;

/// Cookie carrying the browser session token.
pub const SESSION_COOKIE: &str = "__session";

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Pulls the raw credentials off a request.
#[must_use]
pub fn credentials(parts: &Parts) -> Credentials {
    let bearer = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(extract_bearer_token)
        .map(String::from);

    let session_cookie = CookieJar::from_headers(&parts.headers)
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty());

    Credentials {
        bearer,
        session_cookie,
    }
}

async fn resolve(parts: &mut Parts, state: &AppState) -> Caller {
    if let Some(caller) = parts.extensions.get::<Caller>() {
        return *caller;
    }
    let caller = state.resolver.resolve(&credentials(parts)).await;
    parts.extensions.insert(caller);
    caller
}

fn require(caller: Caller, required: AuthStrategy) -> Result<Caller, ApiError> {
    if caller.satisfies(required) {
        return Ok(caller);
    }
    warn!(
        required = %required,
        resolved = %caller.strategy(),
        "Caller does not satisfy route strategy"
    );
    Err(ApiError::unauthenticated("caller strategy not accepted"))
}

/// Whoever is calling, possibly anonymous.
///
/// Used by routes that require nothing but log who called.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedCaller(pub Caller);

impl FromRequestParts<AppState> for ResolvedCaller {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(resolve(parts, state).await))
    }
}

/// A caller authenticated by a browser session.
#[derive(Debug, Clone, Copy)]
pub struct BrowserCaller {
    /// Signed-in account.
    pub account_id: AccountId,
}

impl FromRequestParts<AppState> for BrowserCaller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match require(resolve(parts, state).await, AuthStrategy::BrowserSession)? {
            Caller::Browser { account_id } => Ok(Self { account_id }),
            Caller::Desktop { .. } | Caller::Anonymous => {
                Err(ApiError::unauthenticated("browser session required"))
            }
        }
    }
}

/// A caller authenticated by any credential.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedCaller(pub Caller);

impl FromRequestParts<AppState> for AuthenticatedCaller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match resolve(parts, state).await {
            Caller::Anonymous => {
                warn!("Anonymous caller on authenticated route");
                Err(ApiError::unauthenticated("no credential"))
            }
            caller => Ok(Self(caller)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, header::COOKIE};

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
    }

    #[test]
    fn test_credentials_reads_header_and_cookie() {
        let parts = parts(
            Request::builder()
                .header(AUTHORIZATION, "Bearer desktop-token")
                .header(COOKIE, "theme=dark; __session=browser-token"),
        );
        let creds = credentials(&parts);
        assert_eq!(creds.bearer.as_deref(), Some("desktop-token"));
        assert_eq!(creds.session_cookie.as_deref(), Some("browser-token"));
    }

    #[test]
    fn test_credentials_empty_request() {
        let creds = credentials(&parts(Request::builder()));
        assert!(creds.bearer.is_none());
        assert!(creds.session_cookie.is_none());
    }

    #[test]
    fn test_require_rejects_wrong_strategy() {
        let desktop = Caller::Desktop {
            account_id: AccountId::new(),
            session_id: framefast_shared::types::SessionId::new(),
        };
        assert!(require(desktop, AuthStrategy::BrowserSession).is_err());
        assert!(require(desktop, AuthStrategy::DesktopToken).is_ok());
        assert!(require(Caller::Anonymous, AuthStrategy::NoneRequiredButLogged).is_ok());
    }
}
