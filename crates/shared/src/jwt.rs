//! Stateless access token signing and verification.
//!
//! Access tokens are HS256 JWTs carrying `(account_id, session_id)`. They are
//! verified by signature and expiry only; no storage lookup happens, so a
//! revoked session keeps working until its last access token expires.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;

use crate::auth::Claims;
use crate::config::lifetime;
use crate::types::{AccountId, SessionId};

/// JWT configuration.
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for signing tokens.
    pub secret: String,
    /// Access token lifetime in seconds.
    pub access_token_ttl_secs: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[hidden]")
            .field("access_token_ttl_secs", &self.access_token_ttl_secs)
            .finish()
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: "change-me-in-production".to_string(),
            access_token_ttl_secs: 15 * 60,
        }
    }
}

/// Errors that can occur during JWT operations.
#[derive(Debug, Error)]
pub enum JwtError {
    /// Token encoding failed.
    #[error("failed to encode token: {0}")]
    EncodingError(String),

    /// Token decoding failed.
    #[error("failed to decode token: {0}")]
    DecodingError(String),

    /// Token has expired.
    #[error("token has expired")]
    Expired,
}

/// A freshly signed access token.
#[derive(Debug, Clone)]
pub struct SignedAccessToken {
    /// Compact JWT.
    pub token: String,
    /// Absolute expiry, truncated to the second like the `exp` claim.
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies desktop access tokens.
#[derive(Clone)]
pub struct AccessTokenSigner {
    ttl: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for AccessTokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessTokenSigner")
            .field("ttl", &self.ttl)
            .field("encoding_key", &"[hidden]")
            .field("decoding_key", &"[hidden]")
            .finish_non_exhaustive()
    }
}

impl AccessTokenSigner {
    /// Creates a new signer with the given configuration.
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the caller-supplied clock in `verify_at`.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::from(["exp".to_string()]);

        Self {
            ttl: lifetime(config.access_token_ttl_secs),
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
        }
    }

    /// Returns the access token lifetime.
    #[must_use]
    pub const fn access_token_ttl(&self) -> Duration {
        self.ttl
    }

    /// Signs an access token for a device session, valid from now.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::EncodingError` if token generation fails.
    pub fn sign(
        &self,
        account_id: AccountId,
        session_id: SessionId,
    ) -> Result<SignedAccessToken, JwtError> {
        self.sign_at(account_id, session_id, Utc::now())
    }

    /// Signs an access token as if issued at `now`.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::EncodingError` if token generation fails.
    pub fn sign_at(
        &self,
        account_id: AccountId,
        session_id: SessionId,
        now: DateTime<Utc>,
    ) -> Result<SignedAccessToken, JwtError> {
        let exp = (now + self.ttl).timestamp();
        let expires_at = DateTime::from_timestamp(exp, 0)
            .ok_or_else(|| JwtError::EncodingError("expiry out of range".to_string()))?;
        let claims = Claims::new(account_id, session_id, now, expires_at);

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingError(e.to_string()))?;

        Ok(SignedAccessToken { token, expires_at })
    }

    /// Verifies a token against the current time.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Expired` if the token has expired.
    /// Returns `JwtError::DecodingError` on a bad signature or malformed payload.
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        self.verify_at(token, Utc::now())
    }

    /// Verifies a token as of `now`. A token is dead once `now >= exp`.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Expired` if the token has expired.
    /// Returns `JwtError::DecodingError` on a bad signature or malformed payload.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, JwtError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| JwtError::DecodingError(e.to_string()))?;

        if now.timestamp() >= claims.exp {
            return Err(JwtError::Expired);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_signer() -> AccessTokenSigner {
        AccessTokenSigner::new(&JwtConfig {
            secret: "test-secret-key-for-testing".to_string(),
            access_token_ttl_secs: 900,
        })
    }

    #[test]
    fn test_sign_and_verify() {
        let signer = create_test_signer();
        let account_id = AccountId::new();
        let session_id = SessionId::new();

        let signed = signer.sign(account_id, session_id).unwrap();
        let claims = signer.verify(&signed.token).unwrap();

        assert_eq!(claims.account_id(), account_id);
        assert_eq!(claims.session_id(), session_id);
        assert_eq!(claims.exp, signed.expires_at.timestamp());
    }

    #[test]
    fn test_expiry_is_ttl_after_issue() {
        let signer = create_test_signer();
        let now = Utc::now();

        let signed = signer.sign_at(AccountId::new(), SessionId::new(), now).unwrap();

        assert_eq!(signed.expires_at.timestamp(), now.timestamp() + 900);
    }

    #[test]
    fn test_token_dead_at_exact_expiry() {
        let signer = create_test_signer();
        let now = Utc::now();
        let signed = signer.sign_at(AccountId::new(), SessionId::new(), now).unwrap();

        let just_before = signed.expires_at - Duration::seconds(1);
        assert!(signer.verify_at(&signed.token, just_before).is_ok());
        assert!(matches!(
            signer.verify_at(&signed.token, signed.expires_at),
            Err(JwtError::Expired)
        ));
    }

    #[test]
    fn test_different_secret_fails() {
        let signer = create_test_signer();
        let other = AccessTokenSigner::new(&JwtConfig {
            secret: "another-secret".to_string(),
            access_token_ttl_secs: 900,
        });

        let signed = signer.sign(AccountId::new(), SessionId::new()).unwrap();

        assert!(matches!(
            other.verify(&signed.token),
            Err(JwtError::DecodingError(_))
        ));
    }

    #[test]
    fn test_malformed_token_fails() {
        let signer = create_test_signer();
        assert!(signer.verify("invalid.token.here").is_err());
        assert!(signer.verify("").is_err());
    }

    #[test]
    fn test_debug_hides_keys() {
        let config = JwtConfig {
            secret: "super-secret".to_string(),
            access_token_ttl_secs: 900,
        };
        assert!(!format!("{config:?}").contains("super-secret"));
        assert!(!format!("{:?}", AccessTokenSigner::new(&config)).contains("super-secret"));
    }
}
