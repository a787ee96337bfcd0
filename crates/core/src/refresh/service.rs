//! Refresh token rotation.
//!
//! Presenting the current token rotates it: the old digest moves into the
//! previous slot for a short grace window and a new token is minted.
//! Presenting the previous token inside that window is treated as a replay
//! of a request that already rotated, and only re-issues an access token.
//! The previous slot is what lets a retried or concurrent refresh succeed
//! without forking the session or invalidating the token the winner got.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use framefast_shared::jwt::{AccessTokenSigner, SignedAccessToken};
use framefast_shared::types::{AccountId, SessionId};

use crate::error::DeviceAuthError;
use crate::policy::TokenPolicy;
use crate::store::{DeviceSession, RevokeOutcome, Rotation, SessionStore, TokenSlot};
use crate::token::{REFRESH_TOKEN_BYTES, TokenCodec};

/// Result of a successful refresh.
#[derive(Clone)]
pub struct RefreshGrant {
    /// Account the session belongs to.
    pub account_id: AccountId,
    /// The refreshed session.
    pub session_id: SessionId,
    /// Newly signed access token.
    pub access_token: SignedAccessToken,
    /// New raw refresh token, or `None` when the presented token was a replay
    /// inside the grace window and the current token stays as is.
    pub refresh_token: Option<String>,
    /// Absolute expiry of the session's current refresh token.
    pub refresh_token_expires_at: DateTime<Utc>,
}

impl RefreshGrant {
    /// Whether the client should keep the refresh token it already holds.
    #[must_use]
    pub const fn refresh_token_unchanged(&self) -> bool {
        self.refresh_token.is_none()
    }
}

impl std::fmt::Debug for RefreshGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshGrant")
            .field("account_id", &self.account_id)
            .field("session_id", &self.session_id)
            .field("access_token_expires_at", &self.access_token.expires_at)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[hidden]"))
            .field("refresh_token_expires_at", &self.refresh_token_expires_at)
            .finish()
    }
}

/// Rotates and revokes device session refresh tokens.
#[derive(Clone)]
pub struct RefreshService {
    sessions: Arc<dyn SessionStore>,
    codec: TokenCodec,
    signer: AccessTokenSigner,
    policy: TokenPolicy,
}

impl std::fmt::Debug for RefreshService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshService")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl RefreshService {
    /// Creates a refresh service.
    #[must_use]
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        codec: TokenCodec,
        signer: AccessTokenSigner,
        policy: TokenPolicy,
    ) -> Self {
        Self {
            sessions,
            codec,
            signer,
            policy,
        }
    }

    /// Exchanges a refresh token for a new access token, rotating it if it
    /// is the session's current token.
    ///
    /// # Errors
    ///
    /// Returns `DeviceAuthError::Unauthenticated` if the token matches no
    /// usable session.
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshGrant, DeviceAuthError> {
        self.refresh_at(refresh_token, Utc::now()).await
    }

    /// [`Self::refresh`] as of `now`.
    ///
    /// # Errors
    ///
    /// Returns `DeviceAuthError::Unauthenticated` if the token matches no
    /// usable session.
    pub async fn refresh_at(
        &self,
        refresh_token: &str,
        now: DateTime<Utc>,
    ) -> Result<RefreshGrant, DeviceAuthError> {
        let hash = self.codec.digest(refresh_token);

        let Some(found) = self.sessions.find_by_either_hash(&hash, now).await? else {
            warn!("Refresh token rejected");
            return Err(DeviceAuthError::Unauthenticated);
        };

        match found.slot {
            TokenSlot::Previous => self.replay(&found.session, now),
            TokenSlot::Current => self.rotate(found.session, hash, now).await,
        }
    }

    async fn rotate(
        &self,
        session: DeviceSession,
        expected_hash: String,
        now: DateTime<Utc>,
    ) -> Result<RefreshGrant, DeviceAuthError> {
        let (refresh_token, new_hash) = self.codec.issue(REFRESH_TOKEN_BYTES);
        let expires_at = now + self.policy.refresh_ttl;

        let rotated = self
            .sessions
            .rotate(Rotation {
                session_id: session.id,
                expected_hash: expected_hash.clone(),
                new_hash,
                now,
                prev_expires_at: now + self.policy.refresh_grace,
                expires_at,
            })
            .await?;

        if !rotated {
            // Another request rotated this token first. Re-read: if our token
            // now sits in the previous slot we are a replay, not a failure.
            warn!(session_id = %session.id, "Lost refresh rotation race");
            let reread = self.sessions.find_by_either_hash(&expected_hash, now).await?;
            return match reread {
                Some(found)
                    if found.slot == TokenSlot::Previous && found.session.id == session.id =>
                {
                    self.replay(&found.session, now)
                }
                _ => Err(DeviceAuthError::Unauthenticated),
            };
        }

        let access_token = self.signer.sign_at(session.account_id, session.id, now)?;
        info!(
            account_id = %session.account_id,
            session_id = %session.id,
            "Refresh token rotated"
        );

        Ok(RefreshGrant {
            account_id: session.account_id,
            session_id: session.id,
            access_token,
            refresh_token: Some(refresh_token),
            refresh_token_expires_at: expires_at,
        })
    }

    fn replay(
        &self,
        session: &DeviceSession,
        now: DateTime<Utc>,
    ) -> Result<RefreshGrant, DeviceAuthError> {
        let access_token = self.signer.sign_at(session.account_id, session.id, now)?;
        debug!(session_id = %session.id, "Refresh replay inside grace window");

        Ok(RefreshGrant {
            account_id: session.account_id,
            session_id: session.id,
            access_token,
            refresh_token: None,
            refresh_token_expires_at: session.expires_at,
        })
    }

    /// Revokes the session holding `refresh_token` as current token, or as
    /// previous token inside its grace window.
    ///
    /// Revoking a session that is already revoked or expired succeeds with
    /// `RevokeOutcome::AlreadyInactive`.
    ///
    /// # Errors
    ///
    /// Returns `DeviceAuthError::Unauthenticated` if the token names no
    /// session, including a previous token whose grace window has closed.
    pub async fn revoke(&self, refresh_token: &str) -> Result<RevokeOutcome, DeviceAuthError> {
        self.revoke_at(refresh_token, Utc::now()).await
    }

    /// [`Self::revoke`] as of `now`.
    ///
    /// # Errors
    ///
    /// Returns `DeviceAuthError::Unauthenticated` if the token names no
    /// session, including a previous token whose grace window has closed.
    pub async fn revoke_at(
        &self,
        refresh_token: &str,
        now: DateTime<Utc>,
    ) -> Result<RevokeOutcome, DeviceAuthError> {
        let hash = self.codec.digest(refresh_token);
        let outcome = self.sessions.revoke(&hash, now).await?;

        match outcome {
            RevokeOutcome::Revoked => info!("Device session revoked"),
            RevokeOutcome::AlreadyInactive => debug!("Revoke on inactive session"),
            RevokeOutcome::NotFound => {
                warn!("Revoke with unknown refresh token");
                return Err(DeviceAuthError::Unauthenticated);
            }
        }

        Ok(outcome)
    }
}
