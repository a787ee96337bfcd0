//! `SeaORM` entity definitions.

pub mod desktop_auth_codes;
pub mod desktop_sessions;
