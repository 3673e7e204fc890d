//! Keyed-hash helpers for authenticating inbound provider callbacks.

use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha512};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;
type HmacSha512 = Hmac<Sha512>;

/// Lower-case hex HMAC-SHA512 of `payload` keyed by `secret`.
pub fn hmac_sha512_hex(secret: &[u8], payload: &[u8]) -> Result<String, anyhow::Error> {
    let mut mac = HmacSha512::new_from_slice(secret)
        .map_err(|e| anyhow::anyhow!("Invalid key length: {}", e))?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Lower-case hex HMAC-SHA256 of `payload` keyed by `secret`.
pub fn hmac_sha256_hex(secret: &[u8], payload: &[u8]) -> Result<String, anyhow::Error> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| anyhow::anyhow!("Invalid key length: {}", e))?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Compare an expected hex digest with one supplied by a caller in constant time.
///
/// Hex case is normalised first; providers are not consistent about it.
pub fn digests_match(expected: &str, provided: &str) -> bool {
    let provided = provided.trim().to_ascii_lowercase();
    let expected_bytes = expected.as_bytes();
    let provided_bytes = provided.as_bytes();

    if expected_bytes.len() != provided_bytes.len() {
        return false;
    }

    expected_bytes.ct_eq(provided_bytes).into()
}
