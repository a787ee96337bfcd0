//! Browser session verification.
//!
//! The web identity layer owns browser sessions. This crate only needs to
//! turn a session token into an account, so the collaborator is a trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use framefast_shared::types::AccountId;

/// Reasons a browser session token is rejected.
#[derive(Debug, Error)]
pub enum BrowserSessionError {
    /// Signature or payload is invalid.
    #[error("invalid browser session: {0}")]
    Invalid(String),

    /// The session has expired.
    #[error("browser session expired")]
    Expired,
}

/// Verifies browser session tokens issued by the web identity layer.
#[async_trait]
pub trait BrowserSessionVerifier: Send + Sync {
    /// Returns the account behind `token` if it is a live session at `now`.
    async fn verify(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<AccountId, BrowserSessionError>;
}

/// Claims carried by a browser session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserSessionClaims {
    /// Account ID.
    pub sub: Uuid,
    /// Expiration timestamp.
    pub exp: i64,
}

/// Verifies HS256 session tokens signed with a secret shared with the web app.
#[derive(Clone)]
pub struct JwtBrowserSessionVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtBrowserSessionVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtBrowserSessionVerifier")
            .field("decoding_key", &"[hidden]")
            .finish_non_exhaustive()
    }
}

impl JwtBrowserSessionVerifier {
    /// Creates a verifier for tokens signed with `secret`.
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims = ["exp".to_string(), "sub".to_string()].into();

        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

#[async_trait]
impl BrowserSessionVerifier for JwtBrowserSessionVerifier {
    async fn verify(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<AccountId, BrowserSessionError> {
        let claims = decode::<BrowserSessionClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| BrowserSessionError::Invalid(e.to_string()))?
            .claims;

        if now.timestamp() >= claims.exp {
            return Err(BrowserSessionError::Expired);
        }

        Ok(AccountId::from_uuid(claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use jsonwebtoken::{EncodingKey, Header, encode};

    const SECRET: &[u8] = b"browser-secret";

    fn token(sub: Uuid, exp: DateTime<Utc>, secret: &[u8]) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &BrowserSessionClaims {
                sub,
                exp: exp.timestamp(),
            },
            &EncodingKey::from_secret(secret),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_verify_valid_session() {
        let verifier = JwtBrowserSessionVerifier::new(SECRET);
        let now = Utc::now();
        let sub = Uuid::new_v4();

        let account = verifier
            .verify(&token(sub, now + Duration::hours(1), SECRET), now)
            .await
            .unwrap();
        assert_eq!(account.into_inner(), sub);
    }

    #[tokio::test]
    async fn test_verify_rejects_expired() {
        let verifier = JwtBrowserSessionVerifier::new(SECRET);
        let now = Utc::now();
        let result = verifier
            .verify(&token(Uuid::new_v4(), now, SECRET), now)
            .await;
        assert!(matches!(result, Err(BrowserSessionError::Expired)));
    }

    #[tokio::test]
    async fn test_verify_rejects_wrong_secret() {
        let verifier = JwtBrowserSessionVerifier::new(SECRET);
        let now = Utc::now();
        let result = verifier
            .verify(&token(Uuid::new_v4(), now + Duration::hours(1), b"other"), now)
            .await;
        assert!(matches!(result, Err(BrowserSessionError::Invalid(_))));
    }
}
