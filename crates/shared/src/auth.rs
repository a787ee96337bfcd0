//! Access token claims and desktop auth request/response payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::types::{AccountId, SessionId};

/// JWT claims for desktop access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (account ID).
    pub sub: Uuid,
    /// Device session the token was minted for.
    pub sid: Uuid,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for a device session.
    #[must_use]
    pub fn new(
        account_id: AccountId,
        session_id: SessionId,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sub: account_id.into_inner(),
            sid: session_id.into_inner(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the account ID from claims.
    #[must_use]
    pub const fn account_id(&self) -> AccountId {
        AccountId::from_uuid(self.sub)
    }

    /// Returns the session ID from claims.
    #[must_use]
    pub const fn session_id(&self) -> SessionId {
        SessionId::from_uuid(self.sid)
    }

    /// Returns the expiry as a timestamp.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// `POST /desktop/auth/exchange` request.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRequest {
    /// Optional label for the desktop being paired.
    #[validate(length(max = 100))]
    pub device_name: Option<String>,
}

/// `POST /desktop/auth/exchange` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeResponse {
    /// The raw one-time pairing code. Shown exactly once.
    pub code: String,
    /// When the code stops being redeemable.
    pub expires_at: DateTime<Utc>,
}

/// `POST /desktop/auth/redeem` request.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RedeemRequest {
    /// The pairing code obtained from the browser.
    #[validate(length(min = 1, max = 512))]
    pub code: String,
    /// Optional label for the desktop, overrides the one given at exchange.
    #[validate(length(max = 100))]
    pub device_name: Option<String>,
}

/// `POST /desktop/auth/redeem` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGrantResponse {
    /// Short-lived signed access token.
    pub access_token: String,
    /// Access token expiry.
    pub access_token_expires_at: DateTime<Utc>,
    /// Long-lived opaque refresh token.
    pub refresh_token: String,
    /// Refresh token expiry.
    pub refresh_token_expires_at: DateTime<Utc>,
}

/// `POST /desktop/auth/refresh` and `/revoke` request.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    /// The refresh token.
    #[validate(length(min = 1, max = 512))]
    pub refresh_token: String,
}

/// `POST /desktop/auth/refresh` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    /// Freshly signed access token.
    pub access_token: String,
    /// Access token expiry.
    pub access_token_expires_at: DateTime<Utc>,
    /// The rotated refresh token, or `null` when the submitted one was a replay.
    pub refresh_token: Option<String>,
    /// Expiry of the refresh token the client should now hold.
    pub refresh_token_expires_at: DateTime<Utc>,
    /// `true` when no new refresh token was issued.
    pub refresh_token_unchanged: bool,
}

/// `GET /desktop/auth/whoami` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhoAmIResponse {
    /// How the caller was authenticated.
    pub strategy: String,
    /// Resolved account.
    pub account_id: AccountId,
    /// Device session, for desktop callers.
    pub session_id: Option<SessionId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_claims_new_sets_correct_fields() {
        let account_id = AccountId::new();
        let session_id = SessionId::new();
        let now = Utc::now();
        let expires_at = now + Duration::minutes(15);

        let claims = Claims::new(account_id, session_id, now, expires_at);

        assert_eq!(claims.account_id(), account_id);
        assert_eq!(claims.session_id(), session_id);
        assert_eq!(claims.iat, now.timestamp());
        assert_eq!(claims.exp, expires_at.timestamp());
        assert_eq!(
            claims.expires_at().map(|t| t.timestamp()),
            Some(expires_at.timestamp())
        );
    }

    #[test]
    fn test_refresh_response_serializes_null_token() {
        let now = Utc::now();
        let body = RefreshResponse {
            access_token: "a".into(),
            access_token_expires_at: now,
            refresh_token: None,
            refresh_token_expires_at: now,
            refresh_token_unchanged: true,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json["refreshToken"].is_null());
        assert_eq!(json["refreshTokenUnchanged"], true);
        assert!(json["accessTokenExpiresAt"].is_string());
    }

    #[test]
    fn test_redeem_request_validation() {
        let ok: RedeemRequest =
            serde_json::from_value(serde_json::json!({ "code": "abc" })).unwrap();
        assert!(ok.validate().is_ok());
        assert!(ok.device_name.is_none());

        let empty = RedeemRequest {
            code: String::new(),
            device_name: None,
        };
        assert!(empty.validate().is_err());

        let long_name = RedeemRequest {
            code: "abc".into(),
            device_name: Some("x".repeat(101)),
        };
        assert!(long_name.validate().is_err());
    }

    #[test]
    fn test_exchange_request_accepts_empty_body() {
        let req: ExchangeRequest = serde_json::from_str("{}").unwrap();
        assert!(req.device_name.is_none());
        assert!(req.validate().is_ok());
    }
}
