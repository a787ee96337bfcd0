//! Refresh token rotation with a grace window, and revocation.

pub mod service;


pub use service::{RefreshGrant, RefreshService};
