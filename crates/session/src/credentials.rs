//! Per-device key derivation from a group enrollment key.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::CredentialError;

type HmacSha256 = Hmac<Sha256>;

/// Derives the symmetric key for `device_id` from a base64 group key.
///
/// The result is `base64(HMAC-SHA256(key = base64_decode(group_key),
/// message = utf8(device_id)))`.
pub fn derive_device_key(device_id: &str, group_key: &str) -> Result<String, CredentialError> {
    let signing_key = STANDARD.decode(group_key)?;
    let mut mac = HmacSha256::new_from_slice(&signing_key)
        .map_err(|e| CredentialError::InvalidKey(e.to_string()))?;
    mac.update(device_id.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}
