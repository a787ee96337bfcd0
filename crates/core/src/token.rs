//! Opaque token generation and keyed digests.
//!
//! Pairing codes and refresh tokens are random bytes encoded as base64url
//! without padding. Only their HMAC-SHA256 digest, keyed with a server-held
//! pepper, is ever stored. The digest is deterministic so it can be used as an
//! equality lookup key, and it cannot be inverted without the pepper.

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Random bytes in a pairing code.
pub const AUTH_CODE_BYTES: usize = 32;

/// Random bytes in a refresh token.
pub const REFRESH_TOKEN_BYTES: usize = 48;

/// Errors raised when building a codec.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The pepper is empty.
    #[error("token pepper must not be empty")]
    EmptyPepper,

    /// The pepper was rejected by the MAC.
    #[error("invalid token pepper: {0}")]
    InvalidPepper(String),
}

/// Generates tokens and computes their storage digests.
#[derive(Clone)]
pub struct TokenCodec {
    mac: HmacSha256,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("pepper", &"[hidden]")
            .finish()
    }
}

impl TokenCodec {
    /// Creates a codec keyed with `pepper`.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::EmptyPepper` if the pepper is empty.
    pub fn new(pepper: &[u8]) -> Result<Self, CodecError> {
        if pepper.is_empty() {
            return Err(CodecError::EmptyPepper);
        }
        let mac = HmacSha256::new_from_slice(pepper)
            .map_err(|e| CodecError::InvalidPepper(e.to_string()))?;
        Ok(Self { mac })
    }

    /// Generates `byte_len` bytes from the OS-seeded CSPRNG, base64url encoded.
    #[must_use]
    pub fn new_token(byte_len: usize) -> String {
        let mut bytes = vec![0u8; byte_len];
        rand::rng().fill_bytes(&mut bytes);
        base64_url::encode(&bytes)
    }

    /// Computes the keyed digest stored in place of `token`.
    #[must_use]
    pub fn digest(&self, token: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(token.as_bytes());
        base64_url::encode(&mac.finalize().into_bytes())
    }

    /// Generates a token and returns it together with its digest.
    #[must_use]
    pub fn issue(&self, byte_len: usize) -> (String, String) {
        let token = Self::new_token(byte_len);
        let digest = self.digest(&token);
        (token, digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn codec() -> TokenCodec {
        TokenCodec::new(b"test-pepper").unwrap()
    }

    #[rstest]
    #[case(AUTH_CODE_BYTES, 43)]
    #[case(REFRESH_TOKEN_BYTES, 64)]
    fn test_new_token_length_without_padding(#[case] bytes: usize, #[case] chars: usize) {
        let token = TokenCodec::new_token(bytes);
        assert_eq!(token.len(), chars);
        assert!(!token.contains('='));
        assert!(!token.contains('+'));
        assert!(!token.contains('/'));
    }

    #[test]
    fn test_new_tokens_differ() {
        assert_ne!(
            TokenCodec::new_token(AUTH_CODE_BYTES),
            TokenCodec::new_token(AUTH_CODE_BYTES)
        );
    }

    #[test]
    fn test_digest_is_deterministic() {
        let codec = codec();
        assert_eq!(codec.digest("abc"), codec.digest("abc"));
        assert_ne!(codec.digest("abc"), codec.digest("abd"));
    }

    #[test]
    fn test_digest_depends_on_pepper() {
        let other = TokenCodec::new(b"other-pepper").unwrap();
        assert_ne!(codec().digest("abc"), other.digest("abc"));
    }

    #[test]
    fn test_digest_is_base64url_sha256() {
        // 32-byte MAC output, unpadded base64url.
        assert_eq!(codec().digest("abc").len(), 43);
    }

    #[test]
    fn test_issue_returns_matching_digest() {
        let codec = codec();
        let (token, digest) = codec.issue(REFRESH_TOKEN_BYTES);
        assert_ne!(token, digest);
        assert_eq!(codec.digest(&token), digest);
    }

    #[test]
    fn test_empty_pepper_rejected() {
        assert!(matches!(TokenCodec::new(b""), Err(CodecError::EmptyPepper)));
    }

    #[test]
    fn test_debug_hides_pepper() {
        assert!(!format!("{:?}", codec()).contains("test-pepper"));
    }
}
