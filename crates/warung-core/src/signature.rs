//! HMAC signature utilities shared by the gateway client and webhook path.
//!
//! Two independent signatures exist in the gateway protocol:
//!
//! - Outbound payment creation is signed with the merchant **secret key**
//!   over `refId || apiKey || amount`.
//! - Inbound callbacks are signed with the **api key** over the reference id
//!   alone.
//!
//! Both are hex-encoded HMAC-SHA256.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute HMAC-SHA256 and return the hex-encoded result.
///
/// # Panics
///
/// Never panics in practice: HMAC-SHA256 accepts keys of any size per
/// RFC 2104, so `new_from_slice` only fails if the implementation is broken.
#[must_use]
pub fn hmac_sha256_hex(key: &str, message: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(key.as_bytes()).expect("HMAC-SHA256 accepts any key size");
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Signature for an outbound payment-creation request.
///
/// Keyed by the merchant secret key over `refId || apiKey || amount`, where
/// the amount is its decimal string form.
#[must_use]
pub fn payment_signature(secret_key: &str, api_key: &str, ref_id: &str, amount: i64) -> String {
    hmac_sha256_hex(secret_key, &format!("{ref_id}{api_key}{amount}"))
}

/// Expected signature of an inbound gateway callback for a reference id.
///
/// Keyed by the merchant api key over the reference id alone.
#[must_use]
pub fn callback_signature(api_key: &str, ref_id: &str) -> String {
    hmac_sha256_hex(api_key, ref_id)
}

/// Constant-time string comparison for signature verification.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        diff |= x ^ y;
    }
    diff == 0
}
