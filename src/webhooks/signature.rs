//! GitHub webhook signature verification using HMAC-SHA256.
//!
//! GitHub signs every delivery with the app's webhook secret and sends the
//! result in the `X-Hub-Signature-256` header as `sha256=<hex>`. Deliveries
//! are verified before any parsing.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Parses a GitHub signature header (e.g., "sha256=abc123...") into raw bytes.
///
/// Returns `None` for malformed headers (missing prefix, invalid hex, etc.).
pub fn parse_signature_header(header: &str) -> Option<Vec<u8>> {
    let hex_sig = header.strip_prefix("sha256=")?;
    hex::decode(hex_sig).ok()
}

/// Verifies a GitHub webhook signature against the payload and secret.
///
/// Uses the HMAC library's constant-time comparison.
///
/// # Examples
///
/// ```
/// use auto_merge_bot::webhooks::verify_signature;
///
/// assert!(!verify_signature(b"{}", "sha256=00", b"secret"));
/// assert!(!verify_signature(b"{}", "not-a-header", b"secret"));
/// ```
pub fn verify_signature(payload: &[u8], signature_header: &str, secret: &[u8]) -> bool {
    let Some(expected_signature) = parse_signature_header(signature_header) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(payload);

    mac.verify_slice(&expected_signature).is_ok()
}

/// Signs `payload` the way GitHub does, returning the full header value.
#[cfg(test)]
pub fn sign(payload: &[u8], secret: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).unwrap();
    mac.update(payload);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}
