//! Storage seams for pairing codes and device sessions.
//!
//! The services in this crate never read-then-write: every mutation that
//! needs cross-request serialization is a single conditional update, and the
//! number of rows it changed decides who won. Implementations must preserve
//! that: `redeem` and `rotate` are the two serialization points.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use framefast_shared::types::{AccountId, AuthCodeId, SessionId};

pub use memory::{MemoryAuthCodeStore, MemorySessionStore};

/// A storage failure. Always surfaced to clients as an internal error.
#[derive(Debug, Error)]
#[error("storage error: {0}")]
pub struct StoreError(pub String);

/// A stored pairing code. Holds the digest, never the code itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthCodeRecord {
    /// Row ID.
    pub id: AuthCodeId,
    /// Keyed digest of the code.
    pub code_hash: String,
    /// Account the code pairs a desktop with.
    pub account_id: AccountId,
    /// Device label given when the code was issued.
    pub device_name: Option<String>,
    /// End of the redemption window.
    pub expires_at: DateTime<Utc>,
    /// Set exactly once, on redemption.
    pub used_at: Option<DateTime<Utc>>,
}

impl AuthCodeRecord {
    /// Whether the code can still be redeemed at `now`.
    #[must_use]
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        self.used_at.is_none() && now < self.expires_at
    }
}

/// Input for storing a new pairing code.
#[derive(Debug, Clone)]
pub struct NewAuthCode {
    /// Keyed digest of the code.
    pub code_hash: String,
    /// Owning account.
    pub account_id: AccountId,
    /// Optional device label.
    pub device_name: Option<String>,
    /// End of the redemption window.
    pub expires_at: DateTime<Utc>,
}

/// Input for turning a pairing code into a session in one atomic step.
#[derive(Debug, Clone)]
pub struct Redemption {
    /// Keyed digest of the presented code.
    pub code_hash: String,
    /// Digest of the first refresh token.
    pub refresh_token_hash: String,
    /// Device label given at redemption. Falls back to the one stored with the code.
    pub device_name: Option<String>,
    /// Redemption time.
    pub now: DateTime<Utc>,
    /// Absolute expiry of the first refresh token.
    pub expires_at: DateTime<Utc>,
}

/// A paired desktop session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSession {
    /// Session ID, embedded in access tokens.
    pub id: SessionId,
    /// Owning account.
    pub account_id: AccountId,
    /// Digest of the current refresh token.
    pub refresh_token_hash: String,
    /// Digest of the refresh token superseded by the last rotation.
    pub refresh_token_hash_prev: Option<String>,
    /// End of the grace window for `refresh_token_hash_prev`.
    pub refresh_token_prev_expires_at: Option<DateTime<Utc>>,
    /// Device label.
    pub device_name: Option<String>,
    /// Last successful redeem or rotation.
    pub last_used_at: DateTime<Utc>,
    /// Absolute expiry of the current refresh token.
    pub expires_at: DateTime<Utc>,
    /// Set on explicit revocation.
    pub revoked_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl DeviceSession {
    /// Whether the session can be refreshed at `now`.
    #[must_use]
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && now < self.expires_at
    }

    /// Which slot, if any, `hash` occupies at `now`.
    ///
    /// The previous slot only counts inside its grace window.
    #[must_use]
    pub fn slot_for(&self, hash: &str, now: DateTime<Utc>) -> Option<TokenSlot> {
        if self.refresh_token_hash == hash {
            return Some(TokenSlot::Current);
        }
        let in_grace = self
            .refresh_token_prev_expires_at
            .is_some_and(|until| now < until);
        (in_grace && self.refresh_token_hash_prev.as_deref() == Some(hash))
            .then_some(TokenSlot::Previous)
    }
}

/// Input for creating a device session.
#[derive(Debug, Clone)]
pub struct NewSession {
    /// Owning account.
    pub account_id: AccountId,
    /// Digest of the first refresh token.
    pub refresh_token_hash: String,
    /// Device label.
    pub device_name: Option<String>,
    /// Creation time.
    pub now: DateTime<Utc>,
    /// Absolute expiry of the first refresh token.
    pub expires_at: DateTime<Utc>,
}

/// Which refresh token slot a lookup matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSlot {
    /// The live refresh token.
    Current,
    /// The token superseded by the last rotation, still inside its grace window.
    Previous,
}

/// A session found by refresh token digest.
#[derive(Debug, Clone)]
pub struct SessionMatch {
    /// The matched session.
    pub session: DeviceSession,
    /// Which slot matched.
    pub slot: TokenSlot,
}

/// A conditional rotation of a session's refresh token.
#[derive(Debug, Clone)]
pub struct Rotation {
    /// Session to rotate.
    pub session_id: SessionId,
    /// Digest that must still be current for the rotation to apply.
    pub expected_hash: String,
    /// Digest of the newly minted refresh token.
    pub new_hash: String,
    /// Rotation time, stored as `last_used_at`.
    pub now: DateTime<Utc>,
    /// End of the grace window for `expected_hash`.
    pub prev_expires_at: DateTime<Utc>,
    /// New absolute session expiry.
    pub expires_at: DateTime<Utc>,
}

/// Outcome of revoking by refresh token digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeOutcome {
    /// A live session was revoked by this call.
    Revoked,
    /// The digest belongs to a session that is already revoked or expired.
    AlreadyInactive,
    /// The digest names no session: it was never issued, or it is a
    /// previous token whose grace window closed on a still-live session.
    NotFound,
}

/// Persistence for one-time pairing codes.
#[async_trait]
pub trait AuthCodeStore: Send + Sync {
    /// Stores a new code.
    async fn insert(&self, input: NewAuthCode) -> Result<AuthCodeRecord, StoreError>;

    /// Marks the code used and creates its session as one unit.
    ///
    /// The code is consumed by a conditional update that only succeeds while
    /// it is unused and unexpired, so concurrent callers get at most one
    /// session. Either both writes happen or neither does: if the session
    /// cannot be stored the code stays redeemable. Returns `None` when the
    /// code is unknown, expired or already used.
    async fn redeem(&self, redemption: Redemption) -> Result<Option<DeviceSession>, StoreError>;

    /// Deletes codes that expired before `before`. Returns the number removed.
    async fn purge_expired(&self, before: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// Persistence for device sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Creates a session.
    async fn create(&self, input: NewSession) -> Result<DeviceSession, StoreError>;

    /// Finds the usable session holding `hash` as current token, or as
    /// previous token inside its grace window.
    async fn find_by_either_hash(
        &self,
        hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<SessionMatch>, StoreError>;

    /// Applies `rotation` if the session is live and `expected_hash` is still
    /// current. Returns whether this call performed the rotation.
    async fn rotate(&self, rotation: Rotation) -> Result<bool, StoreError>;

    /// Revokes the live session holding `hash` as current token, or as
    /// previous token inside its grace window.
    async fn revoke(&self, hash: &str, now: DateTime<Utc>) -> Result<RevokeOutcome, StoreError>;

    /// Deletes sessions that expired or were revoked before `before`.
    async fn purge_expired(&self, before: DateTime<Utc>) -> Result<u64, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(now: DateTime<Utc>) -> DeviceSession {
        DeviceSession {
            id: SessionId::new(),
            account_id: AccountId::new(),
            refresh_token_hash: "current".into(),
            refresh_token_hash_prev: Some("previous".into()),
            refresh_token_prev_expires_at: Some(now + Duration::seconds(60)),
            device_name: None,
            last_used_at: now,
            expires_at: now + Duration::days(30),
            revoked_at: None,
            created_at: now,
        }
    }

    #[test]
    fn test_slot_for_current_and_previous() {
        let now = Utc::now();
        let s = session(now);
        assert_eq!(s.slot_for("current", now), Some(TokenSlot::Current));
        assert_eq!(s.slot_for("previous", now), Some(TokenSlot::Previous));
        assert_eq!(s.slot_for("other", now), None);
    }

    #[test]
    fn test_previous_slot_closes_after_grace() {
        let now = Utc::now();
        let s = session(now);
        assert_eq!(s.slot_for("previous", now + Duration::seconds(60)), None);
        assert_eq!(
            s.slot_for("current", now + Duration::seconds(60)),
            Some(TokenSlot::Current)
        );
    }

    #[test]
    fn test_session_usability() {
        let now = Utc::now();
        let mut s = session(now);
        assert!(s.is_usable(now));
        assert!(!s.is_usable(now + Duration::days(30)));
        s.revoked_at = Some(now);
        assert!(!s.is_usable(now));
    }

    #[test]
    fn test_auth_code_redeemable() {
        let now = Utc::now();
        let mut code = AuthCodeRecord {
            id: AuthCodeId::new(),
            code_hash: "h".into(),
            account_id: AccountId::new(),
            device_name: None,
            expires_at: now + Duration::seconds(120),
            used_at: None,
        };
        assert!(code.is_redeemable(now));
        assert!(!code.is_redeemable(now + Duration::seconds(120)));
        code.used_at = Some(now);
        assert!(!code.is_redeemable(now));
    }
}
