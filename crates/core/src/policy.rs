//! Lifetimes governing codes and tokens.

use chrono::Duration;

use framefast_shared::config::AuthConfig;

/// How long each credential lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPolicy {
    /// Pairing code redemption window.
    pub auth_code_ttl: Duration,
    /// Refresh token lifetime, restarted on every rotation.
    pub refresh_ttl: Duration,
    /// How long a superseded refresh token is still accepted.
    pub refresh_grace: Duration,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            auth_code_ttl: Duration::seconds(120),
            refresh_ttl: Duration::days(30),
            refresh_grace: Duration::seconds(60),
        }
    }
}

impl TokenPolicy {
    /// Builds the policy from auth configuration.
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            auth_code_ttl: config.auth_code_ttl(),
            refresh_ttl: config.refresh_token_ttl(),
            refresh_grace: config.refresh_grace(),
        }
    }
}
