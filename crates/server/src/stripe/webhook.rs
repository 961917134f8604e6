//! `Stripe-Signature` verification.
//!
//! The header looks like `t=1700000000,v1=5257a8...,v0=...`. The `v1`
//! signature is an HMAC-SHA256 of `"{t}.{payload}"` keyed with the endpoint's
//! signing secret. Several `v1` entries may appear while a secret is rolled.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::error::SignatureError;

/// Maximum age of a signed payload, in seconds.
pub const TOLERANCE_SECS: i64 = 300;

/// Verify a webhook payload against its `Stripe-Signature` header.
///
/// `now` is the current Unix time in seconds.
///
/// # Errors
///
/// Returns a `SignatureError` describing why the header was rejected.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MissingTimestamp)?;
    if signatures.is_empty() {
        return Err(SignatureError::MissingSignature);
    }
    if (now - timestamp).abs() > TOLERANCE_SECS {
        return Err(SignatureError::Expired);
    }

    let expected =
        compute_signature(timestamp, payload, secret).ok_or(SignatureError::Mismatch)?;
    if signatures
        .iter()
        .any(|candidate| constant_time_compare(&expected, candidate))
    {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Hex-encoded `v1` signature for a payload signed at `timestamp`.
#[must_use]
pub fn compute_signature(timestamp: i64, payload: &[u8], secret: &str) -> Option<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Some(hex::encode(mac.finalize().into_bytes()))
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}
