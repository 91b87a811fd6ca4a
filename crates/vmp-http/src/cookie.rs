// crates/vmp-http/src/cookie.rs
// ============================================================================
// Module: Session Cookie Signing
// Description: HMAC-SHA256 signing for the opaque session-id cookie value
//              (SPEC_FULL.md §4 "Session cookie signing").
// Dependencies: hmac, sha2, base64
// ============================================================================

//! ## Overview
//! The session row itself lives in [`vmp_core::interfaces::IdentityStore`];
//! a session id is already an unguessable v4 UUID. The cookie value adds a
//! second, independent check so a client cannot even attempt to probe
//! session ids it doesn't hold: the cookie carries `{session_id}.{sig}`,
//! and a forged or truncated value is rejected before the store is ever
//! queried. This mirrors `vmp_objectstore::signing`'s HMAC approach without
//! reusing it, since that module signs object keys and expiries, not
//! session ids.

use hmac::Hmac;
use hmac::Mac;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const SEPARATOR: char = '.';

/// Builds the signed cookie value for a session id.
#[must_use]
pub fn encode(cookie_secret: &[u8], session_id: &str) -> String {
    let signature = sign(cookie_secret, session_id);
    format!("{session_id}{SEPARATOR}{signature}")
}

/// Recovers the session id from a signed cookie value.
///
/// Verification goes through [`Mac::verify_slice`], which compares tags in
/// constant time; this module never reconstructs the expected signature as
/// a string to compare byte-by-byte itself (SPEC_FULL.md §4 "Session
/// cookie signing").
///
/// # Errors
///
/// Returns `None` if the value is malformed, the signature doesn't
/// base64-decode, or the tag does not verify.
#[must_use]
pub fn decode<'a>(cookie_secret: &[u8], value: &'a str) -> Option<&'a str> {
    let (session_id, signature) = value.rsplit_once(SEPARATOR)?;
    let signature_bytes = base64_url_decode(signature)?;
    let mut mac = mac_for(cookie_secret);
    mac.update(session_id.as_bytes());
    mac.verify_slice(&signature_bytes).ok()?;
    Some(session_id)
}

fn mac_for(cookie_secret: &[u8]) -> HmacSha256 {
    <HmacSha256 as Mac>::new_from_slice(cookie_secret)
        .unwrap_or_else(|_| <HmacSha256 as Mac>::new_from_slice(&[0u8; 32]).expect("zero-length key is valid for HMAC"))
}

fn sign(cookie_secret: &[u8], session_id: &str) -> String {
    let mut mac = mac_for(cookie_secret);
    mac.update(session_id.as_bytes());
    let bytes = mac.finalize().into_bytes();
    base64_url_encode(&bytes)
}

fn base64_url_encode(bytes: &[u8]) -> String {
    use base64::Engine as _;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn base64_url_decode(text: &str) -> Option<Vec<u8>> {
    use base64::Engine as _;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(text).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_session_id() {
        let cookie = encode(b"secret", "session-123");
        assert_eq!(decode(b"secret", &cookie), Some("session-123"));
    }

    #[test]
    fn rejects_tampered_session_id() {
        let cookie = encode(b"secret", "session-123");
        let tampered = cookie.replace("session-123", "session-456");
        assert_eq!(decode(b"secret", &tampered), None);
    }

    #[test]
    fn rejects_wrong_secret() {
        let cookie = encode(b"secret-a", "session-123");
        assert_eq!(decode(b"secret-b", &cookie), None);
    }

    #[test]
    fn rejects_malformed_value() {
        assert_eq!(decode(b"secret", "no-separator-here"), None);
    }
}
