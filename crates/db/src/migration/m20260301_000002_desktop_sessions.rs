//! Desktop sessions with a current and a grace-period previous refresh token.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(SESSIONS_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared("DROP TABLE IF EXISTS desktop_sessions CASCADE;")
            .await?;
        Ok(())
    }
}

const SESSIONS_SQL: &str = r"
CREATE TABLE desktop_sessions (
    id UUID PRIMARY KEY,
    account_id UUID NOT NULL,
    refresh_token_hash VARCHAR(64) NOT NULL,
    refresh_token_hash_prev VARCHAR(64),
    refresh_token_prev_expires_at TIMESTAMPTZ,
    device_name VARCHAR(100),
    last_used_at TIMESTAMPTZ NOT NULL,
    expires_at TIMESTAMPTZ NOT NULL,
    revoked_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_session_expires_future CHECK (expires_at > created_at),
    CONSTRAINT chk_prev_hash_has_window CHECK (
        (refresh_token_hash_prev IS NULL) = (refresh_token_prev_expires_at IS NULL)
    )
);

-- A digest reaches at most one row, in either slot
CREATE UNIQUE INDEX uq_desktop_sessions_hash ON desktop_sessions(refresh_token_hash);
CREATE UNIQUE INDEX uq_desktop_sessions_prev_hash ON desktop_sessions(refresh_token_hash_prev)
    WHERE refresh_token_hash_prev IS NOT NULL;

-- Account's live devices
CREATE INDEX idx_desktop_sessions_account ON desktop_sessions(account_id, created_at DESC)
    WHERE revoked_at IS NULL;

-- Purge of expired and revoked sessions
CREATE INDEX idx_desktop_sessions_expires ON desktop_sessions(expires_at);
CREATE INDEX idx_desktop_sessions_revoked ON desktop_sessions(revoked_at)
    WHERE revoked_at IS NOT NULL;
";
