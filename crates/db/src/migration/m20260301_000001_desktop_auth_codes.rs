//! One-time desktop pairing codes.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(AUTH_CODES_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared("DROP TABLE IF EXISTS desktop_auth_codes CASCADE;")
            .await?;
        Ok(())
    }
}

const AUTH_CODES_SQL: &str = r"
-- Only the keyed digest of a code is stored, never the code itself
CREATE TABLE desktop_auth_codes (
    id UUID PRIMARY KEY,
    code_hash VARCHAR(64) NOT NULL,
    account_id UUID NOT NULL,
    device_name VARCHAR(100),
    expires_at TIMESTAMPTZ NOT NULL,
    used_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

-- Redemption looks up by digest
CREATE UNIQUE INDEX uq_desktop_auth_codes_hash ON desktop_auth_codes(code_hash);

-- Purge of expired codes
CREATE INDEX idx_desktop_auth_codes_expires ON desktop_auth_codes(expires_at);
";
