//! Shared types, errors, and configuration for FrameFast.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for accounts, device sessions and pairing codes
//! - Access token claims and the stateless access token signer
//! - Request/response payloads of the desktop auth endpoints
//! - Application-wide error types
//! - Configuration management

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;
pub mod types;

pub use auth::Claims;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use jwt::{AccessTokenSigner, JwtConfig, JwtError, SignedAccessToken};
