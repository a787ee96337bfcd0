//! One-time pairing codes.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use framefast_shared::types::AccountId;

use crate::store::{AuthCodeStore, DeviceSession, NewAuthCode, Redemption, StoreError};
use crate::token::{AUTH_CODE_BYTES, TokenCodec};

/// A freshly issued code. The only place the raw code ever exists server side.
#[derive(Clone)]
pub struct IssuedCode {
    /// Raw code, handed to the browser once.
    pub code: String,
    /// End of the redemption window.
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for IssuedCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedCode")
            .field("code", &"[hidden]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Issues and redeems pairing codes on top of an [`AuthCodeStore`].
#[derive(Clone)]
pub struct AuthCodes {
    store: Arc<dyn AuthCodeStore>,
    codec: TokenCodec,
    ttl: Duration,
}

impl AuthCodes {
    /// Creates a code issuer.
    #[must_use]
    pub fn new(store: Arc<dyn AuthCodeStore>, codec: TokenCodec, ttl: Duration) -> Self {
        Self { store, codec, ttl }
    }

    /// Mints a code for `account_id` and stores its digest.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the code cannot be stored.
    pub async fn issue(
        &self,
        account_id: AccountId,
        device_name: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<IssuedCode, StoreError> {
        let (code, code_hash) = self.codec.issue(AUTH_CODE_BYTES);
        let record = self
            .store
            .insert(NewAuthCode {
                code_hash,
                account_id,
                device_name,
                expires_at: now + self.ttl,
            })
            .await?;

        Ok(IssuedCode {
            code,
            expires_at: record.expires_at,
        })
    }

    /// Consumes `code` and opens its session, if the code is unused and
    /// unexpired at `now`.
    ///
    /// Missing, expired and already used codes all yield `None`. A store
    /// failure leaves the code redeemable.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store fails.
    pub async fn redeem(
        &self,
        code: &str,
        refresh_token_hash: String,
        device_name: Option<String>,
        session_expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<DeviceSession>, StoreError> {
        self.store
            .redeem(Redemption {
                code_hash: self.codec.digest(code),
                refresh_token_hash,
                device_name,
                now,
                expires_at: session_expires_at,
            })
            .await
    }
}

impl std::fmt::Debug for AuthCodes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthCodes")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryAuthCodeStore, MemorySessionStore};

    fn memory_store() -> Arc<MemoryAuthCodeStore> {
        Arc::new(MemoryAuthCodeStore::new(Arc::new(MemorySessionStore::new())))
    }

    fn codes(store: Arc<MemoryAuthCodeStore>) -> AuthCodes {
        AuthCodes::new(
            store,
            TokenCodec::new(b"pepper").unwrap(),
            Duration::seconds(120),
        )
    }

    #[tokio::test]
    async fn test_issue_stores_digest_only() {
        let store = memory_store();
        let now = Utc::now();
        let issued = codes(store.clone())
            .issue(AccountId::new(), None, now)
            .await
            .unwrap();

        assert_eq!(issued.expires_at, now + Duration::seconds(120));
        let hashes = store.hashes().unwrap();
        assert_eq!(hashes.len(), 1);
        assert_ne!(hashes[0], issued.code);
    }

    #[tokio::test]
    async fn test_redeem_is_single_use() {
        let store = memory_store();
        let codes = codes(store);
        let now = Utc::now();
        let account = AccountId::new();
        let issued = codes
            .issue(account, Some("Edit bay".into()), now)
            .await
            .unwrap();

        let expires_at = now + Duration::days(30);
        let session = codes
            .redeem(&issued.code, "r1".into(), None, expires_at, now)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.account_id, account);
        assert_eq!(session.device_name.as_deref(), Some("Edit bay"));
        assert_eq!(session.expires_at, expires_at);
        assert!(
            codes
                .redeem(&issued.code, "r2".into(), None, expires_at, now)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_issued_code_debug_hides_code() {
        let issued = IssuedCode {
            code: "super-secret-code".into(),
            expires_at: Utc::now(),
        };
        assert!(!format!("{issued:?}").contains("super-secret-code"));
    }
}
