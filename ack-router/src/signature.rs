//! Slack request signature verification.
//!
//! Slack signs every request with HMAC-SHA256 over `v0:<timestamp>:<body>`
//! and sends the hex digest as `v0=<hex>`.
//! Reference: https://api.slack.com/authentication/verifying-requests-from-slack

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

use crate::error::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// The only signature scheme Slack currently uses.
pub const SIGNATURE_VERSION: &str = "v0";

/// Default maximum distance between the request timestamp and now.
pub const DEFAULT_MAX_AGE_SECONDS: u64 = 300;

/// Shared secret used to sign requests.
///
/// The key is never printed; `Debug` is redacted.
#[derive(Clone)]
pub struct SigningKey(Vec<u8>);

impl SigningKey {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self(key.into())
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}

/// Compute the `v0=<hex>` signature header for a timestamp and raw body.
pub fn sign(key: &SigningKey, timestamp: i64, body: impl AsRef<[u8]>) -> String {
    let mut mac =
        HmacSha256::new_from_slice(key.as_bytes()).expect("HMAC accepts keys of any length");

    mac.update(format!("{}:{}:", SIGNATURE_VERSION, timestamp).as_bytes());
    mac.update(body.as_ref());

    format!(
        "{}={}",
        SIGNATURE_VERSION,
        hex::encode(mac.finalize().into_bytes())
    )
}

/// Verify a request signature against the current time.
pub fn validate(
    key: &SigningKey,
    signature: &str,
    timestamp: i64,
    body: impl AsRef<[u8]>,
) -> Result<(), AuthError> {
    validate_at(
        key,
        signature,
        timestamp,
        body,
        unix_now(),
        DEFAULT_MAX_AGE_SECONDS,
    )
}

/// Verify a request signature against an explicit clock reading.
///
/// Checks, in order: the timestamp is within `max_age_seconds` of `now`, the
/// signature uses the `v0=` scheme, and the HMAC matches.
pub fn validate_at(
    key: &SigningKey,
    signature: &str,
    timestamp: i64,
    body: impl AsRef<[u8]>,
    now: i64,
    max_age_seconds: u64,
) -> Result<(), AuthError> {
    let age = now.abs_diff(timestamp);

    if age > max_age_seconds {
        warn!(
            request_time = timestamp,
            current_time = now,
            age_seconds = age,
            max_age_seconds = max_age_seconds,
            "signature_stale"
        );
        return Err(AuthError::Expired {
            age,
            max_age: max_age_seconds,
        });
    }

    if !signature.starts_with("v0=") {
        warn!("signature_unsupported_scheme");
        return Err(AuthError::UnsupportedScheme);
    }

    let expected = sign(key, timestamp, body);

    if !constant_time_compare(&expected, signature) {
        warn!(
            expected_length = expected.len(),
            actual_length = signature.len(),
            "signature_mismatch"
        );
        return Err(AuthError::Mismatch);
    }

    Ok(())
}

/// Current UNIX time in seconds.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// Constant-time string comparison to prevent timing attacks.
///
/// Only the length is allowed to leak.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn key() -> SigningKey {
        SigningKey::new("8f742231b10e8888abcd99yyyzzz85a5")
    }

    #[test]
    fn test_sign_known_vector() {
        // Example request from Slack's signing documentation
        let key = SigningKey::new("8f742231b10e8888abcd99yyyzzz85a5");
        let body = "token=xyzz0WbapA4vBCDEFasx0q6G&team_id=T1DC2JH3J&team_domain=testteamnow&channel_id=G8PSS9T3V&channel_name=foobar&user_id=U2CERLKJA&user_name=roadrunner&command=%2Fwebhook-collect&text=&response_url=https%3A%2F%2Fhooks.slack.com%2Fcommands%2FT1DC2JH3J%2F397700885554%2F96rGlfmibIGlgcZRskXaIFfN&trigger_id=398738663015.47445629121.803a0bc887a14d10d2c447fce8b6703c";

        let signature = sign(&key, 1531420618, body);

        assert_eq!(
            signature,
            "v0=a2114d57b48eac39b9ad189dd8316235a7b4a8d21a10bd27519666489c69b503"
        );
    }

    #[test]
    fn test_validate_round_trip() {
        let body = r#"{"type":"event_callback"}"#;
        let signature = sign(&key(), NOW, body);

        assert!(validate_at(&key(), &signature, NOW, body, NOW, 300).is_ok());
        assert!(validate_at(&key(), &signature, NOW, body, NOW + 300, 300).is_ok());
        assert!(validate_at(&key(), &signature, NOW, body, NOW - 300, 300).is_ok());
    }

    #[test]
    fn test_validate_with_current_clock() {
        let timestamp = unix_now();
        let signature = sign(&key(), timestamp, "command=%2Ffoo");

        assert!(validate(&key(), &signature, timestamp, "command=%2Ffoo").is_ok());
    }

    #[test]
    fn test_validate_stale_timestamp() {
        let body = "{}";
        let past = NOW - 301;
        let future = NOW + 301;

        let err = validate_at(&key(), &sign(&key(), past, body), past, body, NOW, 300);
        assert!(matches!(err, Err(AuthError::Expired { age: 301, .. })));

        let err = validate_at(&key(), &sign(&key(), future, body), future, body, NOW, 300);
        assert!(matches!(err, Err(AuthError::Expired { .. })));
    }

    #[test]
    fn test_validate_rejects_other_schemes() {
        let signature = sign(&key(), NOW, "{}").replacen("v0=", "v1=", 1);

        let err = validate_at(&key(), &signature, NOW, "{}", NOW, 300);

        assert!(matches!(err, Err(AuthError::UnsupportedScheme)));
        assert!(matches!(
            validate_at(&key(), "", NOW, "{}", NOW, 300),
            Err(AuthError::UnsupportedScheme)
        ));
    }

    #[test]
    fn test_validate_mismatch() {
        let signature = sign(&key(), NOW, "{\"a\":1}");

        assert!(matches!(
            validate_at(&key(), &signature, NOW, "{\"a\":2}", NOW, 300),
            Err(AuthError::Mismatch)
        ));
        assert!(matches!(
            validate_at(&SigningKey::new("other"), &signature, NOW, "{\"a\":1}", NOW, 300),
            Err(AuthError::Mismatch)
        ));
        assert!(matches!(
            validate_at(&key(), &signature, NOW + 1, "{\"a\":1}", NOW, 300),
            Err(AuthError::Mismatch)
        ));
    }

    #[test]
    fn test_sign_covers_raw_bytes() {
        let body: &[u8] = &[0xff, 0xfe, b'{'];
        let signature = sign(&key(), NOW, body);

        assert!(validate_at(&key(), &signature, NOW, body, NOW, 300).is_ok());
        assert!(matches!(
            validate_at(&key(), &signature, NOW, &[0xffu8, 0xfe][..], NOW, 300),
            Err(AuthError::Mismatch)
        ));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }

    #[test]
    fn test_signing_key_debug_is_redacted() {
        let debug = format!("{:?}", SigningKey::new("super-secret"));

        assert!(!debug.contains("super-secret"));
    }
}
