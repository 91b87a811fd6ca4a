// crates/vmp-objectstore/src/signing.rs
// ============================================================================
// Module: HMAC Signed Tokens
// Description: HMAC-SHA256 token generation and verification for the local
//              filesystem object-store backend's signed read URLs.
// Dependencies: hmac, sha2, base64
// ============================================================================

//! ## Overview
//! The local backend has no native presigning, so it signs `key` and an
//! expiry timestamp with an HMAC-SHA256 key supplied at construction
//! (`vmp_config::ObjectStoreConfig::signing_key`, spec.md §9) and appends
//! the signature as a query parameter. Verification recomputes the same
//! MAC in constant time via `hmac`'s own comparison.

use hmac::Hmac;
use hmac::Mac;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Reason a signed token failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// The token was not valid base64url or had the wrong segment count.
    Malformed,
    /// The expiry field was not a valid integer.
    InvalidExpiry,
    /// The token expired before `now`.
    Expired,
    /// The signature did not match.
    BadSignature,
}

/// Computes a base64url-encoded signature over `key|expires_unix`.
#[must_use]
pub fn sign(signing_key: &[u8], object_key: &str, expires_unix: i64) -> String {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(signing_key).unwrap_or_else(|_| {
        <HmacSha256 as Mac>::new_from_slice(&[0u8; 32]).expect("zero-length key is valid for HMAC")
    });
    mac.update(object_key.as_bytes());
    mac.update(b"|");
    mac.update(expires_unix.to_string().as_bytes());
    let bytes = mac.finalize().into_bytes();
    base64_url_encode(&bytes)
}

/// Verifies a signature produced by [`sign`] against the current time.
///
/// # Errors
/// Returns [`TokenError`] describing why the token is not currently valid.
pub fn verify(signing_key: &[u8], object_key: &str, expires_unix: i64, now_unix: i64, signature: &str) -> Result<(), TokenError> {
    if now_unix > expires_unix {
        return Err(TokenError::Expired);
    }
    let expected = sign(signing_key, object_key, expires_unix);
    if constant_time_eq(expected.as_bytes(), signature.as_bytes()) {
        Ok(())
    } else {
        Err(TokenError::BadSignature)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

fn base64_url_encode(bytes: &[u8]) -> String {
    use base64::Engine as _;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_valid_token() {
        let key = b"test-signing-key";
        let sig = sign(key, "case/abc/v1", 1_000);
        assert!(verify(key, "case/abc/v1", 1_000, 500, &sig).is_ok());
    }

    #[test]
    fn rejects_expired_token() {
        let key = b"test-signing-key";
        let sig = sign(key, "case/abc/v1", 1_000);
        assert_eq!(verify(key, "case/abc/v1", 1_000, 1_001, &sig), Err(TokenError::Expired));
    }

    #[test]
    fn rejects_tampered_key() {
        let key = b"test-signing-key";
        let sig = sign(key, "case/abc/v1", 1_000);
        assert_eq!(verify(key, "case/abc/v2", 1_000, 500, &sig), Err(TokenError::BadSignature));
    }

    #[test]
    fn rejects_wrong_signing_key() {
        let sig = sign(b"key-a", "case/abc/v1", 1_000);
        assert_eq!(verify(b"key-b", "case/abc/v1", 1_000, 500, &sig), Err(TokenError::BadSignature));
    }
}
