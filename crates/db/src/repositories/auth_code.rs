//! Pairing code repository for database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    TransactionTrait, sea_query::Expr,
};

use framefast_core::store::{
    AuthCodeRecord, AuthCodeStore, DeviceSession, NewAuthCode, NewSession, Redemption, StoreError,
};
use framefast_shared::types::{AccountId, AuthCodeId};

use super::session::new_session_model;
use super::store_error;
use crate::entities::{desktop_auth_codes, desktop_sessions};

impl From<desktop_auth_codes::Model> for AuthCodeRecord {
    fn from(model: desktop_auth_codes::Model) -> Self {
        Self {
            id: AuthCodeId::from_uuid(model.id),
            code_hash: model.code_hash,
            account_id: AccountId::from_uuid(model.account_id),
            device_name: model.device_name,
            expires_at: model.expires_at.with_timezone(&Utc),
            used_at: model.used_at.map(|t| t.with_timezone(&Utc)),
        }
    }
}

/// Pairing code repository.
#[derive(Debug, Clone)]
pub struct AuthCodeRepository {
    db: DatabaseConnection,
}

impl AuthCodeRepository {
    /// Creates a new pairing code repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Inserts a code digest.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails, including on a
    /// duplicate digest.
    pub async fn create(&self, input: NewAuthCode) -> Result<desktop_auth_codes::Model, DbErr> {
        desktop_auth_codes::ActiveModel {
            id: Set(AuthCodeId::new().into_inner()),
            code_hash: Set(input.code_hash),
            account_id: Set(input.account_id.into_inner()),
            device_name: Set(input.device_name),
            expires_at: Set(input.expires_at.into()),
            used_at: Set(None),
            ..Default::default()
        }
        .insert(&self.db)
        .await
    }

    /// Marks a code used and inserts its session in one transaction.
    ///
    /// The conditional update on the code row is the serialization point:
    /// only the caller whose update changed the row goes on to insert a
    /// session. If that insert fails the transaction is dropped unfinished,
    /// which rolls the code back to unused.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update or insert fails.
    pub async fn redeem_code(
        &self,
        redemption: Redemption,
    ) -> Result<Option<desktop_sessions::Model>, DbErr> {
        let txn = self.db.begin().await?;

        let result = desktop_auth_codes::Entity::update_many()
            .col_expr(desktop_auth_codes::Column::UsedAt, Expr::value(redemption.now))
            .filter(desktop_auth_codes::Column::CodeHash.eq(redemption.code_hash.as_str()))
            .filter(desktop_auth_codes::Column::UsedAt.is_null())
            .filter(desktop_auth_codes::Column::ExpiresAt.gt(redemption.now))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(None);
        }

        let Some(code) = desktop_auth_codes::Entity::find()
            .filter(desktop_auth_codes::Column::CodeHash.eq(redemption.code_hash.as_str()))
            .one(&txn)
            .await?
        else {
            txn.rollback().await?;
            return Ok(None);
        };

        let session = new_session_model(NewSession {
            account_id: AccountId::from_uuid(code.account_id),
            refresh_token_hash: redemption.refresh_token_hash,
            device_name: redemption.device_name.or(code.device_name),
            now: redemption.now,
            expires_at: redemption.expires_at,
        })
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok(Some(session))
    }

    /// Finds a code by digest, whatever its state.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_hash(
        &self,
        code_hash: &str,
    ) -> Result<Option<desktop_auth_codes::Model>, DbErr> {
        desktop_auth_codes::Entity::find()
            .filter(desktop_auth_codes::Column::CodeHash.eq(code_hash))
            .one(&self.db)
            .await
    }

    /// Deletes codes that expired before `before` (for maintenance).
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails.
    pub async fn cleanup_expired(&self, before: DateTime<Utc>) -> Result<u64, DbErr> {
        let result = desktop_auth_codes::Entity::delete_many()
            .filter(desktop_auth_codes::Column::ExpiresAt.lt(before))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }
}

#[async_trait]
impl AuthCodeStore for AuthCodeRepository {
    async fn insert(&self, input: NewAuthCode) -> Result<AuthCodeRecord, StoreError> {
        self.create(input).await.map(Into::into).map_err(store_error)
    }

    async fn redeem(&self, redemption: Redemption) -> Result<Option<DeviceSession>, StoreError> {
        self.redeem_code(redemption)
            .await
            .map(|session| session.map(Into::into))
            .map_err(store_error)
    }

    async fn purge_expired(&self, before: DateTime<Utc>) -> Result<u64, StoreError> {
        self.cleanup_expired(before).await.map_err(store_error)
    }
}
