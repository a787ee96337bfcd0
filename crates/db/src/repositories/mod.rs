//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.
//! Each one also implements the matching store trait from `framefast-core`.

pub mod auth_code;
pub mod session;

pub use auth_code::AuthCodeRepository;
pub use session::SessionRepository;

use framefast_core::store::StoreError;
use sea_orm::DbErr;

pub(crate) fn store_error(err: DbErr) -> StoreError {
    tracing::error!(error = %err, "Database operation failed");
    StoreError(err.to_string())
}
