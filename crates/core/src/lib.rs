//! Desktop pairing and session refresh for FrameFast.
//!
//! This crate contains the pairing and refresh logic with ZERO web or
//! database dependencies. Storage is reached through the traits in [`store`].
//!
//! # Modules
//!
//! - `token` - Opaque token generation and keyed digests
//! - `store` - Storage traits, records and in-memory stores
//! - `pairing` - One-time code issue and redemption
//! - `refresh` - Refresh token rotation with a grace window, revocation
//! - `auth` - Caller resolution by authentication strategy

pub mod auth;
pub mod error;
pub mod pairing;
pub mod policy;
pub mod refresh;
pub mod store;
pub mod token;

#[cfg(test)]
mod token_props;

pub use error::DeviceAuthError;
pub use policy::TokenPolicy;
pub use token::TokenCodec;
