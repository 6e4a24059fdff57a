//! Payment gateway signature verification.
//!
//! The gateway signs its redirect callback with
//! `HMAC-SHA256(secret, "{order_id}|{payment_id}")` and its webhooks with
//! `HMAC-SHA256(secret, raw_body)`, both rendered as lowercase hex. We
//! recompute and compare in constant time; no payload field is trusted
//! before the comparison passes.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::observability::metrics;

type HmacSha256 = Hmac<Sha256>;

/// Verify a payment-completion callback.
///
/// Missing configuration is a verification failure, never a pass-through:
/// an empty `secret` rejects everything and logs the misconfiguration.
pub fn verify_payment(order_id: &str, payment_id: &str, signature: &str, secret: &str) -> bool {
    if secret.is_empty() {
        tracing::warn!("Payment secret not configured, rejecting signature");
        metrics::record_signature_failure("missing_secret");
        return false;
    }
    if order_id.is_empty() || payment_id.is_empty() || signature.is_empty() {
        metrics::record_signature_failure("missing_input");
        return false;
    }

    let payload = format!("{order_id}|{payment_id}");
    let valid = verify_hmac(payload.as_bytes(), signature, secret);
    if !valid {
        tracing::warn!(order_id, payment_id, "Payment signature mismatch");
        metrics::record_signature_failure("payment_mismatch");
    }
    valid
}

/// Verify a gateway webhook over the raw, unparsed request body.
///
/// The body must be hashed exactly as received. Re-encoding parsed JSON
/// changes key order and whitespace and desynchronizes the signature.
pub fn verify_webhook(raw_body: &[u8], signature: &str, secret: &str) -> bool {
    if secret.is_empty() {
        tracing::warn!("Webhook secret not configured, rejecting signature");
        metrics::record_signature_failure("missing_secret");
        return false;
    }
    if signature.is_empty() {
        metrics::record_signature_failure("missing_input");
        return false;
    }

    let valid = verify_hmac(raw_body, signature, secret);
    if !valid {
        tracing::warn!("Webhook signature mismatch");
        metrics::record_signature_failure("webhook_mismatch");
    }
    valid
}

/// Compare `signature` against the lowercase-hex HMAC of `payload`.
///
/// The expected digest has a fixed length, so a length mismatch can be
/// rejected up front without leaking anything about the digest content;
/// equal-length candidates go through a constant-time comparison.
fn verify_hmac(payload: &[u8], signature: &str, secret: &str) -> bool {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());

    constant_time_eq(expected.as_bytes(), signature.as_bytes())
}

/// Constant-time equality for equal-length inputs; unequal lengths are
/// rejected immediately, which reveals only the public digest length.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
