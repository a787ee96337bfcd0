//! Authentication strategy resolution.
//!
//! Decision table, first hit wins:
//!
//! | # | Credential            | Verified as            | Caller      |
//! |---|-----------------------|------------------------|-------------|
//! | 1 | `Authorization` bearer | desktop access token  | `Desktop`   |
//! | 2 | `Authorization` bearer | browser session       | `Browser`   |
//! | 3 | `__session` cookie     | browser session       | `Browser`   |
//! | 4 | none of the above      |                       | `Anonymous` |

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use framefast_shared::jwt::AccessTokenSigner;
use framefast_shared::types::{AccountId, SessionId};

use super::browser::BrowserSessionVerifier;

/// What a route requires of its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStrategy {
    /// A desktop access token.
    DesktopToken,
    /// A verified browser session.
    BrowserSession,
    /// Nothing, but whoever calls is logged.
    NoneRequiredButLogged,
}

impl std::fmt::Display for AuthStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DesktopToken => write!(f, "desktop_token"),
            Self::BrowserSession => write!(f, "browser_session"),
            Self::NoneRequiredButLogged => write!(f, "none_required_but_logged"),
        }
    }
}

/// The resolved identity of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    /// A paired desktop app.
    Desktop {
        /// Account the session belongs to.
        account_id: AccountId,
        /// Device session embedded in the access token.
        session_id: SessionId,
    },
    /// A signed-in browser.
    Browser {
        /// Signed-in account.
        account_id: AccountId,
    },
    /// No credential verified.
    Anonymous,
}

impl Caller {
    /// The strategy that produced this caller.
    #[must_use]
    pub const fn strategy(&self) -> AuthStrategy {
        match self {
            Self::Desktop { .. } => AuthStrategy::DesktopToken,
            Self::Browser { .. } => AuthStrategy::BrowserSession,
            Self::Anonymous => AuthStrategy::NoneRequiredButLogged,
        }
    }

    /// The caller's account, if any.
    #[must_use]
    pub const fn account_id(&self) -> Option<AccountId> {
        match self {
            Self::Desktop { account_id, .. } | Self::Browser { account_id } => Some(*account_id),
            Self::Anonymous => None,
        }
    }

    /// The caller's device session, if any.
    #[must_use]
    pub const fn session_id(&self) -> Option<SessionId> {
        match self {
            Self::Desktop { session_id, .. } => Some(*session_id),
            Self::Browser { .. } | Self::Anonymous => None,
        }
    }

    /// Whether this caller satisfies `required`.
    #[must_use]
    pub const fn satisfies(&self, required: AuthStrategy) -> bool {
        match required {
            AuthStrategy::DesktopToken => matches!(self, Self::Desktop { .. }),
            AuthStrategy::BrowserSession => matches!(self, Self::Browser { .. }),
            AuthStrategy::NoneRequiredButLogged => true,
        }
    }
}

/// Raw credentials pulled off a request.
#[derive(Clone, Default)]
pub struct Credentials {
    /// Token from `Authorization: Bearer`.
    pub bearer: Option<String>,
    /// Value of the `__session` cookie.
    pub session_cookie: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("bearer", &self.bearer.as_ref().map(|_| "[hidden]"))
            .field("session_cookie", &self.session_cookie.as_ref().map(|_| "[hidden]"))
            .finish()
    }
}

/// One row of the decision table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// Bearer as desktop access token.
    DesktopBearer,
    /// Bearer as browser session.
    BrowserBearer,
    /// Cookie as browser session.
    BrowserCookie,
}

/// Verification attempts for `credentials`, in precedence order.
#[must_use]
pub fn attempt_order(credentials: &Credentials) -> Vec<Attempt> {
    let mut attempts = Vec::with_capacity(3);
    if credentials.bearer.is_some() {
        attempts.push(Attempt::DesktopBearer);
        attempts.push(Attempt::BrowserBearer);
    }
    if credentials.session_cookie.is_some() {
        attempts.push(Attempt::BrowserCookie);
    }
    attempts
}

/// Resolves credentials to a [`Caller`].
#[derive(Clone)]
pub struct CallerResolver {
    signer: AccessTokenSigner,
    browser: Arc<dyn BrowserSessionVerifier>,
}

impl std::fmt::Debug for CallerResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallerResolver")
            .field("signer", &self.signer)
            .finish_non_exhaustive()
    }
}

impl CallerResolver {
    /// Creates a resolver.
    #[must_use]
    pub fn new(signer: AccessTokenSigner, browser: Arc<dyn BrowserSessionVerifier>) -> Self {
        Self { signer, browser }
    }

    /// Resolves `credentials` against the current time.
    pub async fn resolve(&self, credentials: &Credentials) -> Caller {
        self.resolve_at(credentials, Utc::now()).await
    }

    /// Resolves `credentials` as of `now`.
    pub async fn resolve_at(&self, credentials: &Credentials, now: DateTime<Utc>) -> Caller {
        for attempt in attempt_order(credentials) {
            if let Some(caller) = self.try_attempt(attempt, credentials, now).await {
                debug!(strategy = %caller.strategy(), ?attempt, "Caller resolved");
                return caller;
            }
        }

        debug!(
            has_bearer = credentials.bearer.is_some(),
            has_cookie = credentials.session_cookie.is_some(),
            "Anonymous caller"
        );
        Caller::Anonymous
    }

    async fn try_attempt(
        &self,
        attempt: Attempt,
        credentials: &Credentials,
        now: DateTime<Utc>,
    ) -> Option<Caller> {
        match attempt {
            Attempt::DesktopBearer => {
                let token = credentials.bearer.as_deref()?;
                let claims = self.signer.verify_at(token, now).ok()?;
                Some(Caller::Desktop {
                    account_id: claims.account_id(),
                    session_id: claims.session_id(),
                })
            }
            Attempt::BrowserBearer => {
                let token = credentials.bearer.as_deref()?;
                self.browser_caller(token, now).await
            }
            Attempt::BrowserCookie => {
                let token = credentials.session_cookie.as_deref()?;
                self.browser_caller(token, now).await
            }
        }
    }

    async fn browser_caller(&self, token: &str, now: DateTime<Utc>) -> Option<Caller> {
        let account_id = self.browser.verify(token, now).await.ok()?;
        Some(Caller::Browser { account_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{BrowserSessionClaims, JwtBrowserSessionVerifier};
    use chrono::Duration;
    use framefast_shared::jwt::JwtConfig;
    use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};

    const BROWSER_SECRET: &[u8] = b"browser-secret";

    fn signer() -> AccessTokenSigner {
        AccessTokenSigner::new(&JwtConfig {
            secret: "desktop-secret".into(),
            access_token_ttl_secs: 900,
        })
    }

    fn resolver() -> CallerResolver {
        CallerResolver::new(
            signer(),
            Arc::new(JwtBrowserSessionVerifier::new(BROWSER_SECRET)),
        )
    }

    fn browser_token(account: AccountId, now: DateTime<Utc>) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &BrowserSessionClaims {
                sub: account.into_inner(),
                exp: (now + Duration::hours(1)).timestamp(),
            },
            &EncodingKey::from_secret(BROWSER_SECRET),
        )
        .unwrap()
    }

    #[test]
    fn test_attempt_order_table() {
        let both = Credentials {
            bearer: Some("b".into()),
            session_cookie: Some("c".into()),
        };
        assert_eq!(
            attempt_order(&both),
            vec![
                Attempt::DesktopBearer,
                Attempt::BrowserBearer,
                Attempt::BrowserCookie
            ]
        );
        assert!(attempt_order(&Credentials::default()).is_empty());
    }

    #[test]
    fn test_satisfies() {
        let desktop = Caller::Desktop {
            account_id: AccountId::new(),
            session_id: SessionId::new(),
        };
        let browser = Caller::Browser {
            account_id: AccountId::new(),
        };
        assert!(desktop.satisfies(AuthStrategy::DesktopToken));
        assert!(!desktop.satisfies(AuthStrategy::BrowserSession));
        assert!(browser.satisfies(AuthStrategy::BrowserSession));
        assert!(!Caller::Anonymous.satisfies(AuthStrategy::BrowserSession));
        assert!(Caller::Anonymous.satisfies(AuthStrategy::NoneRequiredButLogged));
    }

    #[tokio::test]
    async fn test_desktop_token_wins_over_cookie() {
        let now = Utc::now();
        let account = AccountId::new();
        let session = SessionId::new();
        let access = signer().sign_at(account, session, now).unwrap();

        let caller = resolver()
            .resolve_at(
                &Credentials {
                    bearer: Some(access.token),
                    session_cookie: Some(browser_token(AccountId::new(), now)),
                },
                now,
            )
            .await;

        assert_eq!(
            caller,
            Caller::Desktop {
                account_id: account,
                session_id: session
            }
        );
    }

    #[tokio::test]
    async fn test_bearer_browser_session() {
        let now = Utc::now();
        let account = AccountId::new();
        let caller = resolver()
            .resolve_at(
                &Credentials {
                    bearer: Some(browser_token(account, now)),
                    session_cookie: None,
                },
                now,
            )
            .await;
        assert_eq!(caller, Caller::Browser { account_id: account });
    }

    #[tokio::test]
    async fn test_falls_through_to_cookie() {
        let now = Utc::now();
        let account = AccountId::new();
        let caller = resolver()
            .resolve_at(
                &Credentials {
                    bearer: Some("garbage".into()),
                    session_cookie: Some(browser_token(account, now)),
                },
                now,
            )
            .await;
        assert_eq!(caller, Caller::Browser { account_id: account });
    }

    #[tokio::test]
    async fn test_expired_access_token_is_anonymous() {
        let now = Utc::now();
        let access = signer()
            .sign_at(AccountId::new(), SessionId::new(), now)
            .unwrap();
        let caller = resolver()
            .resolve_at(
                &Credentials {
                    bearer: Some(access.token),
                    session_cookie: None,
                },
                now + Duration::seconds(900),
            )
            .await;
        assert_eq!(caller, Caller::Anonymous);
    }
}
