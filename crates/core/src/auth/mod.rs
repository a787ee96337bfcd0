//! Caller authentication.
//!
//! Every request resolves its credentials to a [`Caller`] exactly once,
//! following a fixed decision table, and each route states which
//! [`AuthStrategy`] it requires.

mod browser;
mod strategy;

#[cfg(test)]
mod strategy_props;

pub use browser::{
    BrowserSessionClaims, BrowserSessionError, BrowserSessionVerifier, JwtBrowserSessionVerifier,
};
pub use strategy::{Attempt, AuthStrategy, Caller, CallerResolver, Credentials, attempt_order};
