//! Webhook origin check: HMAC-SHA512 over the raw request body, keyed by the
//! gateway secret, hex-encoded in the `x-paystack-signature` header.

use hmac::{Hmac, Mac, digest::InvalidLength};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

/// Hex HMAC of `payload`, as the gateway would send it.
pub fn sign(secret: &[u8], payload: &[u8]) -> Result<String, InvalidLength> {
    let mut mac = HmacSha512::new_from_slice(secret)?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time comparison of `signature` against the body's HMAC.
pub fn verify(secret: &[u8], payload: &[u8], signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha512::new_from_slice(secret) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}
