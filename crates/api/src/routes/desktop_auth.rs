//! Desktop pairing and session refresh routes.
//!
//! | Route                           | Strategy                 |
//! |---------------------------------|--------------------------|
//! | `POST /desktop/auth/exchange`   | browser session          |
//! | `POST /desktop/auth/redeem`     | none required, logged    |
//! | `POST /desktop/auth/refresh`    | none required, logged    |
//! | `POST /desktop/auth/revoke`     | none required, logged    |
//! | `GET  /desktop/auth/whoami`     | any verified credential  |

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use tracing::debug;

use framefast_shared::auth::{
    ExchangeRequest, ExchangeResponse, RedeemRequest, RefreshRequest, RefreshResponse,
    TokenGrantResponse, WhoAmIResponse,
};

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extractors::ValidatedJson;
use crate::middleware::auth::{AuthenticatedCaller, BrowserCaller, ResolvedCaller};

/// Creates the desktop auth router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/desktop/auth/exchange", post(exchange))
        .route("/desktop/auth/redeem", post(redeem))
        .route("/desktop/auth/refresh", post(refresh))
        .route("/desktop/auth/revoke", post(revoke))
        .route("/desktop/auth/whoami", get(whoami))
}

/// POST /desktop/auth/exchange - Mint a pairing code for the signed-in browser.
async fn exchange(
    State(state): State<AppState>,
    caller: BrowserCaller,
    ValidatedJson(payload): ValidatedJson<ExchangeRequest>,
) -> ApiResult<Json<ExchangeResponse>> {
    let issued = state
        .pairing
        .issue(caller.account_id, payload.device_name)
        .await?;

    Ok(Json(ExchangeResponse {
        code: issued.code,
        expires_at: issued.expires_at,
    }))
}

/// POST /desktop/auth/redeem - Trade a pairing code for a session.
async fn redeem(
    State(state): State<AppState>,
    ResolvedCaller(caller): ResolvedCaller,
    ValidatedJson(payload): ValidatedJson<RedeemRequest>,
) -> ApiResult<Json<TokenGrantResponse>> {
    debug!(strategy = %caller.strategy(), "Redeem requested");
    let grant = state
        .pairing
        .redeem(&payload.code, payload.device_name)
        .await?;

    Ok(Json(TokenGrantResponse {
        access_token: grant.access_token.token,
        access_token_expires_at: grant.access_token.expires_at,
        refresh_token: grant.refresh_token,
        refresh_token_expires_at: grant.refresh_token_expires_at,
    }))
}

/// POST /desktop/auth/refresh - Rotate a refresh token.
async fn refresh(
    State(state): State<AppState>,
    ResolvedCaller(caller): ResolvedCaller,
    ValidatedJson(payload): ValidatedJson<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    debug!(strategy = %caller.strategy(), "Refresh requested");
    let grant = state.refresh.refresh(&payload.refresh_token).await?;
    let refresh_token_unchanged = grant.refresh_token_unchanged();

    Ok(Json(RefreshResponse {
        access_token: grant.access_token.token,
        access_token_expires_at: grant.access_token.expires_at,
        refresh_token: grant.refresh_token,
        refresh_token_expires_at: grant.refresh_token_expires_at,
        refresh_token_unchanged,
    }))
}

/// POST /desktop/auth/revoke - Kill the session holding a refresh token.
async fn revoke(
    State(state): State<AppState>,
    ResolvedCaller(caller): ResolvedCaller,
    ValidatedJson(payload): ValidatedJson<RefreshRequest>,
) -> ApiResult<StatusCode> {
    debug!(strategy = %caller.strategy(), "Revoke requested");
    state.refresh.revoke(&payload.refresh_token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /desktop/auth/whoami - Echo the resolved caller.
async fn whoami(
    AuthenticatedCaller(caller): AuthenticatedCaller,
) -> ApiResult<Json<WhoAmIResponse>> {
    let account_id = caller
        .account_id()
        .ok_or_else(|| ApiError::unauthenticated("no account"))?;

    Ok(Json(WhoAmIResponse {
        strategy: caller.strategy().to_string(),
        account_id,
        session_id: caller.session_id(),
    }))
}
