//! In-process stores for tests and local development.
//!
//! Each operation takes the lock, mutates, and releases it before returning,
//! so the lock is never held across an `.await`. The lock plays the role of
//! the row-level atomicity a database gives the conditional updates.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use framefast_shared::types::{AuthCodeId, SessionId};

use super::{
    AuthCodeRecord, AuthCodeStore, DeviceSession, NewAuthCode, NewSession, Redemption,
    RevokeOutcome, Rotation, SessionMatch, SessionStore, StoreError,
};

fn poisoned(name: &str) -> StoreError {
    StoreError(format!("{name} lock poisoned"))
}

/// Pairing codes keyed by digest.
///
/// Redemption writes into the paired session store. Locks are always taken
/// codes first, then sessions.
#[derive(Debug)]
pub struct MemoryAuthCodeStore {
    codes: Mutex<HashMap<String, AuthCodeRecord>>,
    sessions: Arc<MemorySessionStore>,
}

impl MemoryAuthCodeStore {
    /// Creates an empty store that redeems codes into `sessions`.
    #[must_use]
    pub fn new(sessions: Arc<MemorySessionStore>) -> Self {
        Self {
            codes: Mutex::default(),
            sessions,
        }
    }

    fn codes(&self) -> Result<MutexGuard<'_, HashMap<String, AuthCodeRecord>>, StoreError> {
        self.codes.lock().map_err(|_| poisoned("auth code store"))
    }

    /// Returns the stored record for a digest, whatever its state.
    pub fn get(&self, code_hash: &str) -> Result<Option<AuthCodeRecord>, StoreError> {
        Ok(self.codes()?.get(code_hash).cloned())
    }

    /// Returns every stored digest.
    pub fn hashes(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.codes()?.keys().cloned().collect())
    }
}

#[async_trait]
impl AuthCodeStore for MemoryAuthCodeStore {
    async fn insert(&self, input: NewAuthCode) -> Result<AuthCodeRecord, StoreError> {
        let mut codes = self.codes()?;
        if codes.contains_key(&input.code_hash) {
            return Err(StoreError("duplicate code hash".to_string()));
        }
        let record = AuthCodeRecord {
            id: AuthCodeId::new(),
            code_hash: input.code_hash,
            account_id: input.account_id,
            device_name: input.device_name,
            expires_at: input.expires_at,
            used_at: None,
        };
        codes.insert(record.code_hash.clone(), record.clone());
        Ok(record)
    }

    async fn redeem(&self, redemption: Redemption) -> Result<Option<DeviceSession>, StoreError> {
        let mut codes = self.codes()?;
        let Some(record) = codes
            .get_mut(&redemption.code_hash)
            .filter(|record| record.is_redeemable(redemption.now))
        else {
            return Ok(None);
        };

        let session = insert_session(
            &mut *self.sessions.sessions()?,
            NewSession {
                account_id: record.account_id,
                refresh_token_hash: redemption.refresh_token_hash,
                device_name: redemption.device_name.or_else(|| record.device_name.clone()),
                now: redemption.now,
                expires_at: redemption.expires_at,
            },
        )?;
        record.used_at = Some(redemption.now);
        Ok(Some(session))
    }

    async fn purge_expired(&self, before: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut codes = self.codes()?;
        let initial = codes.len();
        codes.retain(|_, record| record.expires_at >= before);
        Ok((initial - codes.len()) as u64)
    }
}

/// Device sessions keyed by ID.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<SessionId, DeviceSession>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> Result<MutexGuard<'_, HashMap<SessionId, DeviceSession>>, StoreError> {
        self.sessions.lock().map_err(|_| poisoned("session store"))
    }

    /// Returns a session by ID, whatever its state.
    pub fn get(&self, id: SessionId) -> Result<Option<DeviceSession>, StoreError> {
        Ok(self.sessions()?.get(&id).cloned())
    }

    /// Returns every stored session.
    pub fn all(&self) -> Result<Vec<DeviceSession>, StoreError> {
        Ok(self.sessions()?.values().cloned().collect())
    }
}

fn insert_session(
    sessions: &mut HashMap<SessionId, DeviceSession>,
    input: NewSession,
) -> Result<DeviceSession, StoreError> {
    if sessions
        .values()
        .any(|s| s.refresh_token_hash == input.refresh_token_hash)
    {
        return Err(StoreError("duplicate refresh token hash".to_string()));
    }
    let session = DeviceSession {
        id: SessionId::new(),
        account_id: input.account_id,
        refresh_token_hash: input.refresh_token_hash,
        refresh_token_hash_prev: None,
        refresh_token_prev_expires_at: None,
        device_name: input.device_name,
        last_used_at: input.now,
        expires_at: input.expires_at,
        revoked_at: None,
        created_at: input.now,
    };
    sessions.insert(session.id, session.clone());
    Ok(session)
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, input: NewSession) -> Result<DeviceSession, StoreError> {
        insert_session(&mut *self.sessions()?, input)
    }

    async fn find_by_either_hash(
        &self,
        hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<SessionMatch>, StoreError> {
        let sessions = self.sessions()?;
        Ok(sessions
            .values()
            .filter(|s| s.is_usable(now))
            .find_map(|s| {
                s.slot_for(hash, now).map(|slot| SessionMatch {
                    session: s.clone(),
                    slot,
                })
            }))
    }

    async fn rotate(&self, rotation: Rotation) -> Result<bool, StoreError> {
        let mut sessions = self.sessions()?;
        let Some(session) = sessions.get_mut(&rotation.session_id).filter(|s| {
            s.is_usable(rotation.now) && s.refresh_token_hash == rotation.expected_hash
        }) else {
            return Ok(false);
        };
        session.refresh_token_hash_prev = Some(rotation.expected_hash);
        session.refresh_token_prev_expires_at = Some(rotation.prev_expires_at);
        session.refresh_token_hash = rotation.new_hash;
        session.expires_at = rotation.expires_at;
        session.last_used_at = rotation.now;
        Ok(true)
    }

    async fn revoke(&self, hash: &str, now: DateTime<Utc>) -> Result<RevokeOutcome, StoreError> {
        let mut sessions = self.sessions()?;
        if let Some(session) = sessions
            .values_mut()
            .find(|s| s.revoked_at.is_none() && s.slot_for(hash, now).is_some())
        {
            session.revoked_at = Some(now);
            return Ok(RevokeOutcome::Revoked);
        }
        let inactive = sessions.values().any(|s| {
            !s.is_usable(now)
                && (s.refresh_token_hash == hash
                    || s.refresh_token_hash_prev.as_deref() == Some(hash))
        });
        Ok(if inactive {
            RevokeOutcome::AlreadyInactive
        } else {
            RevokeOutcome::NotFound
        })
    }

    async fn purge_expired(&self, before: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut sessions = self.sessions()?;
        let initial = sessions.len();
        sessions.retain(|_, s| {
            s.expires_at >= before && s.revoked_at.is_none_or(|revoked| revoked >= before)
        });
        Ok((initial - sessions.len()) as u64)
    }
}
