//! Device session repository for database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, Set, sea_query::Expr,
};

use framefast_core::store::{
    DeviceSession, NewSession, RevokeOutcome, Rotation, SessionMatch, SessionStore, StoreError,
};
use framefast_shared::types::{AccountId, SessionId};

use super::store_error;
use crate::entities::desktop_sessions;

impl From<desktop_sessions::Model> for DeviceSession {
    fn from(model: desktop_sessions::Model) -> Self {
        Self {
            id: SessionId::from_uuid(model.id),
            account_id: AccountId::from_uuid(model.account_id),
            refresh_token_hash: model.refresh_token_hash,
            refresh_token_hash_prev: model.refresh_token_hash_prev,
            refresh_token_prev_expires_at: model
                .refresh_token_prev_expires_at
                .map(|t| t.with_timezone(&Utc)),
            device_name: model.device_name,
            last_used_at: model.last_used_at.with_timezone(&Utc),
            expires_at: model.expires_at.with_timezone(&Utc),
            revoked_at: model.revoked_at.map(|t| t.with_timezone(&Utc)),
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

/// Matches `hash` as the current token, or as the previous token inside its
/// grace window.
fn either_hash(hash: &str, now: DateTime<Utc>) -> Condition {
    Condition::any()
        .add(desktop_sessions::Column::RefreshTokenHash.eq(hash))
        .add(
            Condition::all()
                .add(desktop_sessions::Column::RefreshTokenHashPrev.eq(hash))
                .add(desktop_sessions::Column::RefreshTokenPrevExpiresAt.gt(now)),
        )
}

/// Builds the row for a new session, shared with code redemption.
pub(crate) fn new_session_model(input: NewSession) -> desktop_sessions::ActiveModel {
    let now = input.now.into();

    desktop_sessions::ActiveModel {
        id: Set(SessionId::new().into_inner()),
        account_id: Set(input.account_id.into_inner()),
        refresh_token_hash: Set(input.refresh_token_hash),
        refresh_token_hash_prev: Set(None),
        refresh_token_prev_expires_at: Set(None),
        device_name: Set(input.device_name),
        last_used_at: Set(now),
        expires_at: Set(input.expires_at.into()),
        revoked_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

/// Device session repository.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    db: DatabaseConnection,
}

impl SessionRepository {
    /// Creates a new session repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a new session.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create_session(
        &self,
        input: NewSession,
    ) -> Result<desktop_sessions::Model, DbErr> {
        new_session_model(input).insert(&self.db).await
    }

    /// Finds a session by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(
        &self,
        id: SessionId,
    ) -> Result<Option<desktop_sessions::Model>, DbErr> {
        desktop_sessions::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
    }

    /// Finds the usable session holding `hash` in either slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_active_by_hash(
        &self,
        hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<desktop_sessions::Model>, DbErr> {
        desktop_sessions::Entity::find()
            .filter(desktop_sessions::Column::RevokedAt.is_null())
            .filter(desktop_sessions::Column::ExpiresAt.gt(now))
            .filter(either_hash(hash, now))
            .one(&self.db)
            .await
    }

    /// Rotates the refresh token if `expected_hash` is still current.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn rotate_token(&self, rotation: Rotation) -> Result<bool, DbErr> {
        let result = desktop_sessions::Entity::update_many()
            .col_expr(
                desktop_sessions::Column::RefreshTokenHashPrev,
                Expr::value(rotation.expected_hash.clone()),
            )
            .col_expr(
                desktop_sessions::Column::RefreshTokenPrevExpiresAt,
                Expr::value(rotation.prev_expires_at),
            )
            .col_expr(
                desktop_sessions::Column::RefreshTokenHash,
                Expr::value(rotation.new_hash),
            )
            .col_expr(
                desktop_sessions::Column::ExpiresAt,
                Expr::value(rotation.expires_at),
            )
            .col_expr(
                desktop_sessions::Column::LastUsedAt,
                Expr::value(rotation.now),
            )
            .col_expr(
                desktop_sessions::Column::UpdatedAt,
                Expr::value(rotation.now),
            )
            .filter(desktop_sessions::Column::Id.eq(rotation.session_id.into_inner()))
            .filter(desktop_sessions::Column::RefreshTokenHash.eq(rotation.expected_hash))
            .filter(desktop_sessions::Column::RevokedAt.is_null())
            .filter(desktop_sessions::Column::ExpiresAt.gt(rotation.now))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected == 1)
    }

    /// Revokes the live session holding `hash` as current token, or as
    /// previous token inside its grace window.
    ///
    /// A digest held only by revoked or expired sessions is already
    /// inactive. A previous token past its grace window on a live session
    /// names nothing and is reported as not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn revoke_by_hash(
        &self,
        hash: &str,
        now: DateTime<Utc>,
    ) -> Result<RevokeOutcome, DbErr> {
        let result = desktop_sessions::Entity::update_many()
            .col_expr(desktop_sessions::Column::RevokedAt, Expr::value(now))
            .col_expr(desktop_sessions::Column::UpdatedAt, Expr::value(now))
            .filter(desktop_sessions::Column::RevokedAt.is_null())
            .filter(either_hash(hash, now))
            .exec(&self.db)
            .await?;

        if result.rows_affected > 0 {
            return Ok(RevokeOutcome::Revoked);
        }

        let inactive = desktop_sessions::Entity::find()
            .filter(
                Condition::any()
                    .add(desktop_sessions::Column::RefreshTokenHash.eq(hash))
                    .add(desktop_sessions::Column::RefreshTokenHashPrev.eq(hash)),
            )
            .filter(
                Condition::any()
                    .add(desktop_sessions::Column::RevokedAt.is_not_null())
                    .add(desktop_sessions::Column::ExpiresAt.lte(now)),
            )
            .count(&self.db)
            .await?;

        Ok(if inactive > 0 {
            RevokeOutcome::AlreadyInactive
        } else {
            RevokeOutcome::NotFound
        })
    }

    /// Deletes sessions that expired or were revoked before `before`
    /// (for maintenance).
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails.
    pub async fn cleanup_expired(&self, before: DateTime<Utc>) -> Result<u64, DbErr> {
        let result = desktop_sessions::Entity::delete_many()
            .filter(
                Condition::any()
                    .add(desktop_sessions::Column::ExpiresAt.lt(before))
                    .add(desktop_sessions::Column::RevokedAt.lt(before)),
            )
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }
}

#[async_trait]
impl SessionStore for SessionRepository {
    async fn create(&self, input: NewSession) -> Result<DeviceSession, StoreError> {
        self.create_session(input)
            .await
            .map(Into::into)
            .map_err(store_error)
    }

    async fn find_by_either_hash(
        &self,
        hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<SessionMatch>, StoreError> {
        let session: Option<DeviceSession> = self
            .find_active_by_hash(hash, now)
            .await
            .map_err(store_error)?
            .map(Into::into);

        Ok(session.and_then(|session| {
            session
                .slot_for(hash, now)
                .map(|slot| SessionMatch { session, slot })
        }))
    }

    async fn rotate(&self, rotation: Rotation) -> Result<bool, StoreError> {
        self.rotate_token(rotation).await.map_err(store_error)
    }

    async fn revoke(&self, hash: &str, now: DateTime<Utc>) -> Result<RevokeOutcome, StoreError> {
        self.revoke_by_hash(hash, now).await.map_err(store_error)
    }

    async fn purge_expired(&self, before: DateTime<Utc>) -> Result<u64, StoreError> {
        self.cleanup_expired(before).await.map_err(store_error)
    }
}
