//! Application configuration management.

use chrono::Duration;
use config::ConfigError;
use serde::Deserialize;

use crate::jwt::JwtConfig;

/// Longest lifetime any credential or retention window may be given.
pub const MAX_LIFETIME_SECS: i64 = 10 * 365 * 24 * 3600;

/// Converts a configured number of seconds into a duration.
///
/// Values outside `0..=MAX_LIFETIME_SECS` are clamped, so this never
/// overflows. `AppConfig::load` rejects them before they get here.
#[must_use]
pub fn lifetime(secs: i64) -> Duration {
    Duration::try_seconds(secs.clamp(0, MAX_LIFETIME_SECS)).unwrap_or_default()
}

fn check_lifetime(key: &str, secs: i64, min: i64) -> Result<(), ConfigError> {
    if (min..=MAX_LIFETIME_SECS).contains(&secs) {
        Ok(())
    } else {
        Err(ConfigError::Message(format!(
            "{key} must be between {min} and {MAX_LIFETIME_SECS} seconds, got {secs}"
        )))
    }
}

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Desktop auth secrets and lifetimes.
    pub auth: AuthConfig,
    /// Background maintenance.
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL. When absent the server keeps its state in memory.
    pub url: Option<String>,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Desktop auth configuration.
#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    /// Secret used to sign access tokens.
    pub access_token_secret: String,
    /// Pepper keying the digest of pairing codes and refresh tokens.
    pub token_pepper: String,
    /// Secret shared with the web identity layer for browser session tokens.
    pub browser_session_secret: String,
    /// Access token lifetime in seconds.
    #[serde(default = "default_access_token_ttl")]
    pub access_token_ttl_secs: i64,
    /// Refresh token lifetime in seconds.
    #[serde(default = "default_refresh_token_ttl")]
    pub refresh_token_ttl_secs: i64,
    /// How long a superseded refresh token is still accepted.
    #[serde(default = "default_refresh_grace")]
    pub refresh_grace_secs: i64,
    /// Pairing code lifetime in seconds.
    #[serde(default = "default_auth_code_ttl")]
    pub auth_code_ttl_secs: i64,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("access_token_secret", &"[hidden]")
            .field("token_pepper", &"[hidden]")
            .field("browser_session_secret", &"[hidden]")
            .field("access_token_ttl_secs", &self.access_token_ttl_secs)
            .field("refresh_token_ttl_secs", &self.refresh_token_ttl_secs)
            .field("refresh_grace_secs", &self.refresh_grace_secs)
            .field("auth_code_ttl_secs", &self.auth_code_ttl_secs)
            .finish()
    }
}

impl AuthConfig {
    /// Pairing code lifetime.
    #[must_use]
    pub fn auth_code_ttl(&self) -> Duration {
        lifetime(self.auth_code_ttl_secs)
    }

    /// Refresh token lifetime.
    #[must_use]
    pub fn refresh_token_ttl(&self) -> Duration {
        lifetime(self.refresh_token_ttl_secs)
    }

    /// Grace window for a superseded refresh token.
    #[must_use]
    pub fn refresh_grace(&self) -> Duration {
        lifetime(self.refresh_grace_secs)
    }

    /// Rejects lifetimes that are non-positive or too large to add to a timestamp.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Message` naming the offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_lifetime("auth.access_token_ttl_secs", self.access_token_ttl_secs, 1)?;
        check_lifetime("auth.refresh_token_ttl_secs", self.refresh_token_ttl_secs, 1)?;
        check_lifetime("auth.refresh_grace_secs", self.refresh_grace_secs, 0)?;
        check_lifetime("auth.auth_code_ttl_secs", self.auth_code_ttl_secs, 1)
    }

    /// Returns the access token signer configuration.
    #[must_use]
    pub fn jwt(&self) -> JwtConfig {
        JwtConfig {
            secret: self.access_token_secret.clone(),
            access_token_ttl_secs: self.access_token_ttl_secs,
        }
    }
}

fn default_access_token_ttl() -> i64 {
    900 // 15 minutes
}

fn default_refresh_token_ttl() -> i64 {
    2_592_000 // 30 days
}

fn default_refresh_grace() -> i64 {
    60
}

fn default_auth_code_ttl() -> i64 {
    120
}

/// Background maintenance configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MaintenanceConfig {
    /// Seconds between purges of dead codes and sessions. `0` disables the sweeper.
    #[serde(default = "default_purge_interval")]
    pub purge_interval_secs: u64,
    /// How long revoked or expired rows are kept before being purged.
    #[serde(default = "default_retention")]
    pub retention_secs: i64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            purge_interval_secs: default_purge_interval(),
            retention_secs: default_retention(),
        }
    }
}

impl MaintenanceConfig {
    /// How long dead rows are kept.
    #[must_use]
    pub fn retention(&self) -> Duration {
        lifetime(self.retention_secs)
    }
}

fn default_purge_interval() -> u64 {
    3600
}

fn default_retention() -> i64 {
    86_400
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded, or if a lifetime
    /// is out of range.
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("FRAMEFAST").separator("__"))
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.auth.validate()?;
        check_lifetime("maintenance.retention_secs", config.maintenance.retention_secs, 0)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_load_from_env_with_defaults() {
        temp_env::with_vars(
            [
                ("FRAMEFAST__AUTH__ACCESS_TOKEN_SECRET", Some("access")),
                ("FRAMEFAST__AUTH__TOKEN_PEPPER", Some("pepper")),
                ("FRAMEFAST__AUTH__BROWSER_SESSION_SECRET", Some("browser")),
                ("FRAMEFAST__DATABASE__URL", None),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.server.port, 8080);
                assert!(config.database.url.is_none());
                assert_eq!(config.auth.access_token_ttl_secs, 900);
                assert_eq!(config.auth.refresh_token_ttl_secs, 30 * 24 * 3600);
                assert_eq!(config.auth.refresh_grace_secs, 60);
                assert_eq!(config.auth.auth_code_ttl_secs, 120);
                assert_eq!(config.maintenance.purge_interval_secs, 3600);
            },
        );
    }

    #[test]
    fn test_load_fails_without_secrets() {
        temp_env::with_vars(
            [
                ("FRAMEFAST__AUTH__ACCESS_TOKEN_SECRET", None::<&str>),
                ("FRAMEFAST__AUTH__TOKEN_PEPPER", None),
                ("FRAMEFAST__AUTH__BROWSER_SESSION_SECRET", None),
            ],
            || {
                assert!(AppConfig::load().is_err());
            },
        );
    }

    #[rstest]
    #[case("FRAMEFAST__AUTH__REFRESH_GRACE_SECS", "-5")]
    #[case("FRAMEFAST__AUTH__AUTH_CODE_TTL_SECS", "0")]
    #[case("FRAMEFAST__AUTH__REFRESH_TOKEN_TTL_SECS", "9223372036854775807")]
    #[case("FRAMEFAST__AUTH__ACCESS_TOKEN_TTL_SECS", "-900")]
    #[case("FRAMEFAST__MAINTENANCE__RETENTION_SECS", "-1")]
    fn test_load_rejects_out_of_range_lifetimes(#[case] key: &str, #[case] value: &str) {
        temp_env::with_vars(
            [
                ("FRAMEFAST__AUTH__ACCESS_TOKEN_SECRET", Some("access")),
                ("FRAMEFAST__AUTH__TOKEN_PEPPER", Some("pepper")),
                ("FRAMEFAST__AUTH__BROWSER_SESSION_SECRET", Some("browser")),
                (key, Some(value)),
            ],
            || {
                let err = AppConfig::load().unwrap_err();
                assert!(matches!(err, ConfigError::Message(_)), "{err}");
            },
        );
    }

    #[test]
    fn test_lifetime_clamps_instead_of_overflowing() {
        assert_eq!(lifetime(60), Duration::seconds(60));
        assert_eq!(lifetime(-1), Duration::zero());
        assert_eq!(lifetime(i64::MAX), Duration::seconds(MAX_LIFETIME_SECS));
    }

    #[test]
    fn test_auth_config_debug_hides_secrets() {
        let auth = AuthConfig {
            access_token_secret: "s1".repeat(8),
            token_pepper: "p1".repeat(8),
            browser_session_secret: "b1".repeat(8),
            access_token_ttl_secs: 900,
            refresh_token_ttl_secs: 60,
            refresh_grace_secs: 60,
            auth_code_ttl_secs: 120,
        };
        let rendered = format!("{auth:?}");
        assert!(!rendered.contains("s1s1"));
        assert!(!rendered.contains("p1p1"));
        assert!(!rendered.contains("b1b1"));
        assert_eq!(auth.jwt().access_token_ttl_secs, 900);
        assert_eq!(auth.refresh_grace(), Duration::seconds(60));
    }
}
