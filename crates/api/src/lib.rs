//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - Desktop pairing and refresh routes
//! - Caller resolution extractors
//! - Validated JSON extraction
//! - The JSON error envelope

pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::http::header::{AUTHORIZATION, COOKIE};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveRequestHeadersLayer;
use tower_http::trace::TraceLayer;

use framefast_core::auth::CallerResolver;
use framefast_core::pairing::PairingService;
use framefast_core::refresh::RefreshService;

/// Which store implementation backs the services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// `PostgreSQL` through `SeaORM`.
    Postgres,
    /// Process memory. Lost on restart.
    Memory,
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Code issue and redemption.
    pub pairing: Arc<PairingService>,
    /// Refresh token rotation and revocation.
    pub refresh: Arc<RefreshService>,
    /// Credential to caller resolution.
    pub resolver: Arc<CallerResolver>,
    /// Backing store, reported by the health check.
    pub store_backend: StoreBackend,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        // Keep credentials out of request traces
        .layer(SetSensitiveRequestHeadersLayer::new([AUTHORIZATION, COOKIE]))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
