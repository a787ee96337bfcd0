//! Property-based tests for the token codec.

use proptest::prelude::*;

use crate::token::{REFRESH_TOKEN_BYTES, TokenCodec};

fn arb_pepper() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..64)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// The stored representation never equals the raw token.
    #[test]
    fn prop_digest_never_equals_token(pepper in arb_pepper(), token in "[A-Za-z0-9_-]{1,96}") {
        let codec = TokenCodec::new(&pepper).unwrap();
        prop_assert_ne!(codec.digest(&token), token);
    }

    /// Same pepper and token always give the same digest.
    #[test]
    fn prop_digest_stable(pepper in arb_pepper(), token in ".{0,128}") {
        let a = TokenCodec::new(&pepper).unwrap();
        let b = TokenCodec::new(&pepper).unwrap();
        prop_assert_eq!(a.digest(&token), b.digest(&token));
    }

    /// Issued refresh tokens decode back to the requested number of bytes.
    #[test]
    fn prop_issued_token_round_trips_length(pepper in arb_pepper()) {
        let codec = TokenCodec::new(&pepper).unwrap();
        let (token, digest) = codec.issue(REFRESH_TOKEN_BYTES);
        let raw = base64_url::decode(&token).unwrap();
        prop_assert_eq!(raw.len(), REFRESH_TOKEN_BYTES);
        prop_assert_eq!(codec.digest(&token), digest);
    }
}
