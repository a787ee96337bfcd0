//! Property-based tests for the strategy decision table.

use proptest::prelude::*;

use super::strategy::{Attempt, Credentials, attempt_order};

fn arb_credentials() -> impl Strategy<Value = Credentials> {
    (
        proptest::option::of("[A-Za-z0-9._-]{1,64}"),
        proptest::option::of("[A-Za-z0-9._-]{1,64}"),
    )
        .prop_map(|(bearer, session_cookie)| Credentials {
            bearer,
            session_cookie,
        })
}

proptest! {
    /// A bearer is always tried as a desktop token before anything else.
    #[test]
    fn prop_desktop_token_tried_first(credentials in arb_credentials()) {
        let order = attempt_order(&credentials);
        prop_assert_eq!(
            order.first() == Some(&Attempt::DesktopBearer),
            credentials.bearer.is_some()
        );
    }

    /// The cookie is only ever the last resort.
    #[test]
    fn prop_cookie_tried_last(credentials in arb_credentials()) {
        let order = attempt_order(&credentials);
        if let Some(pos) = order.iter().position(|a| *a == Attempt::BrowserCookie) {
            prop_assert_eq!(pos, order.len() - 1);
        }
        prop_assert_eq!(
            order.contains(&Attempt::BrowserCookie),
            credentials.session_cookie.is_some()
        );
    }

    /// No credentials, no attempts.
    #[test]
    fn prop_attempts_require_credentials(credentials in arb_credentials()) {
        let order = attempt_order(&credentials);
        let expected = usize::from(credentials.bearer.is_some()) * 2
            + usize::from(credentials.session_cookie.is_some());
        prop_assert_eq!(order.len(), expected);
    }
}
