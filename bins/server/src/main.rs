//! FrameFast desktop auth server
//!
//! Main entry point for the desktop pairing and session refresh service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use framefast_api::{AppState, StoreBackend, create_router};
use framefast_core::auth::{CallerResolver, JwtBrowserSessionVerifier};
use framefast_core::pairing::PairingService;
use framefast_core::refresh::RefreshService;
use framefast_core::store::{
    AuthCodeStore, MemoryAuthCodeStore, MemorySessionStore, SessionStore,
};
use framefast_core::{TokenCodec, TokenPolicy};
use framefast_db::{AuthCodeRepository, SessionRepository, connect};
use framefast_shared::{AccessTokenSigner, AppConfig};
use framefast_shared::config::MaintenanceConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "framefast=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Pick the store backend
    let (codes, sessions, store_backend): (Arc<dyn AuthCodeStore>, Arc<dyn SessionStore>, _) =
        match &config.database.url {
            Some(url) => {
                let db = connect(
                    url,
                    config.database.max_connections,
                    config.database.min_connections,
                )
                .await?;
                info!("Connected to database");
                (
                    Arc::new(AuthCodeRepository::new(db.clone())),
                    Arc::new(SessionRepository::new(db)),
                    StoreBackend::Postgres,
                )
            }
            None => {
                warn!("No database configured, keeping codes and sessions in memory");
                let sessions = Arc::new(MemorySessionStore::new());
                (
                    Arc::new(MemoryAuthCodeStore::new(sessions.clone())),
                    sessions,
                    StoreBackend::Memory,
                )
            }
        };

    // Secrets go to constructors, never to globals
    let codec = TokenCodec::new(config.auth.token_pepper.as_bytes())?;
    let signer = AccessTokenSigner::new(&config.auth.jwt());
    let policy = TokenPolicy::from_config(&config.auth);
    info!(?policy, "Token policy loaded");

    let state = AppState {
        pairing: Arc::new(PairingService::new(
            codes.clone(),
            codec.clone(),
            signer.clone(),
            policy,
        )),
        refresh: Arc::new(RefreshService::new(
            sessions.clone(),
            codec,
            signer.clone(),
            policy,
        )),
        resolver: Arc::new(CallerResolver::new(
            signer,
            Arc::new(JwtBrowserSessionVerifier::new(
                config.auth.browser_session_secret.as_bytes(),
            )),
        )),
        store_backend,
    };

    spawn_purge(codes, sessions, &config.maintenance);

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically deletes dead codes and sessions.
fn spawn_purge(
    codes: Arc<dyn AuthCodeStore>,
    sessions: Arc<dyn SessionStore>,
    maintenance: &MaintenanceConfig,
) {
    if maintenance.purge_interval_secs == 0 {
        info!("Purge sweeper disabled");
        return;
    }

    let period = Duration::from_secs(maintenance.purge_interval_secs);
    let retention = maintenance.retention();

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let before = chrono::Utc::now() - retention;

            match codes.purge_expired(before).await {
                Ok(purged) => info!(purged, "Purged expired pairing codes"),
                Err(e) => error!(error = %e, "Failed to purge pairing codes"),
            }
            match sessions.purge_expired(before).await {
                Ok(purged) => info!(purged, "Purged dead desktop sessions"),
                Err(e) => error!(error = %e, "Failed to purge desktop sessions"),
            }
        }
    });
}
