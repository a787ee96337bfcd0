//! Pairing orchestration: issue a code, redeem it for a session.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use framefast_shared::jwt::{AccessTokenSigner, SignedAccessToken};
use framefast_shared::types::{AccountId, SessionId};

use super::codes::{AuthCodes, IssuedCode};
use crate::error::DeviceAuthError;
use crate::policy::TokenPolicy;
use crate::store::AuthCodeStore;
use crate::token::{REFRESH_TOKEN_BYTES, TokenCodec};

/// Credentials handed to a desktop app that just paired.
#[derive(Clone)]
pub struct TokenGrant {
    /// Account the session belongs to.
    pub account_id: AccountId,
    /// The new session.
    pub session_id: SessionId,
    /// Signed access token.
    pub access_token: SignedAccessToken,
    /// Raw refresh token. Never stored.
    pub refresh_token: String,
    /// Absolute expiry of the refresh token.
    pub refresh_token_expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("account_id", &self.account_id)
            .field("session_id", &self.session_id)
            .field("access_token_expires_at", &self.access_token.expires_at)
            .field("refresh_token", &"[hidden]")
            .field("refresh_token_expires_at", &self.refresh_token_expires_at)
            .finish()
    }
}

/// Turns browser-issued codes into desktop sessions.
#[derive(Clone)]
pub struct PairingService {
    codes: AuthCodes,
    codec: TokenCodec,
    signer: AccessTokenSigner,
    policy: TokenPolicy,
}

impl std::fmt::Debug for PairingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PairingService")
            .field("codes", &self.codes)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl PairingService {
    /// Creates a pairing service.
    #[must_use]
    pub fn new(
        code_store: Arc<dyn AuthCodeStore>,
        codec: TokenCodec,
        signer: AccessTokenSigner,
        policy: TokenPolicy,
    ) -> Self {
        Self {
            codes: AuthCodes::new(code_store, codec.clone(), policy.auth_code_ttl),
            codec,
            signer,
            policy,
        }
    }

    /// Issues a pairing code for an authenticated browser caller.
    ///
    /// # Errors
    ///
    /// Returns `DeviceAuthError::Storage` if the code cannot be stored.
    pub async fn issue(
        &self,
        account_id: AccountId,
        device_name: Option<String>,
    ) -> Result<IssuedCode, DeviceAuthError> {
        self.issue_at(account_id, device_name, Utc::now()).await
    }

    /// [`Self::issue`] as of `now`.
    ///
    /// # Errors
    ///
    /// Returns `DeviceAuthError::Storage` if the code cannot be stored.
    pub async fn issue_at(
        &self,
        account_id: AccountId,
        device_name: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<IssuedCode, DeviceAuthError> {
        let issued = self.codes.issue(account_id, device_name, now).await?;
        info!(%account_id, expires_at = %issued.expires_at, "Pairing code issued");
        Ok(issued)
    }

    /// Redeems a pairing code for a new session and token pair.
    ///
    /// A `device_name` given here overrides the one recorded at issue.
    ///
    /// # Errors
    ///
    /// Returns `DeviceAuthError::Unauthenticated` if the code is unknown,
    /// expired or already used, without saying which.
    pub async fn redeem(
        &self,
        code: &str,
        device_name: Option<String>,
    ) -> Result<TokenGrant, DeviceAuthError> {
        self.redeem_at(code, device_name, Utc::now()).await
    }

    /// [`Self::redeem`] as of `now`.
    ///
    /// # Errors
    ///
    /// Returns `DeviceAuthError::Unauthenticated` if the code is unknown,
    /// expired or already used, without saying which.
    pub async fn redeem_at(
        &self,
        code: &str,
        device_name: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<TokenGrant, DeviceAuthError> {
        let (refresh_token, refresh_token_hash) = self.codec.issue(REFRESH_TOKEN_BYTES);
        let redeemed = self
            .codes
            .redeem(
                code,
                refresh_token_hash,
                device_name,
                now + self.policy.refresh_ttl,
                now,
            )
            .await?;
        let Some(session) = redeemed else {
            warn!("Pairing code rejected");
            return Err(DeviceAuthError::Unauthenticated);
        };

        let access_token = self.signer.sign_at(session.account_id, session.id, now)?;

        info!(
            account_id = %session.account_id,
            session_id = %session.id,
            "Desktop paired"
        );

        Ok(TokenGrant {
            account_id: session.account_id,
            session_id: session.id,
            access_token,
            refresh_token,
            refresh_token_expires_at: session.expires_at,
        })
    }
}
