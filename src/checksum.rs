//! Paytm merchant checksum, used on both directions of the gateway exchange.
//!
//! A checksum is `sha256_hex(payload + "|" + salt) + salt` (4-character salt),
//! encrypted with AES-128-CBC under the merchant key with a fixed IV and
//! base64-encoded. Verification decrypts, takes the salt from the tail and
//! recomputes the hash.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::domain::errors::DomainError;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

const IV: &[u8; 16] = b"@@@@&&&&####$$$$";
const SALT_LEN: usize = 4;

/// Shared merchant secret. Cheap to clone; never printed.
#[derive(Clone)]
pub struct MerchantKey(Arc<str>);

impl MerchantKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(Arc::from(key.into()))
    }

    pub fn sign(&self, payload: &str) -> Result<String, DomainError> {
        let salt: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SALT_LEN)
            .map(char::from)
            .collect();
        self.sign_with_salt(payload, &salt)
    }

    pub fn sign_with_salt(&self, payload: &str, salt: &str) -> Result<String, DomainError> {
        let cipher = Aes128CbcEnc::new_from_slices(self.0.as_bytes(), IV)
            .map_err(|e| DomainError::Gateway(format!("invalid merchant key: {}", e)))?;
        let sealed = cipher.encrypt_padded_vec_mut::<Pkcs7>(salted_hash(payload, salt).as_bytes());
        Ok(STANDARD.encode(sealed))
    }

    /// Check `checksum` against `payload`. Anything that does not decrypt to
    /// a salted hash fails verification.
    pub fn verify(&self, payload: &str, checksum: &str) -> bool {
        let Ok(sealed) = STANDARD.decode(checksum.trim()) else {
            return false;
        };
        let Ok(cipher) = Aes128CbcDec::new_from_slices(self.0.as_bytes(), IV) else {
            return false;
        };
        let Ok(opened) = cipher.decrypt_padded_vec_mut::<Pkcs7>(&sealed) else {
            return false;
        };
        let Ok(opened) = String::from_utf8(opened) else {
            return false;
        };
        if opened.len() <= SALT_LEN || !opened.is_char_boundary(opened.len() - SALT_LEN) {
            return false;
        }
        let salt = &opened[opened.len() - SALT_LEN..];
        salted_hash(payload, salt) == opened
    }
}

fn salted_hash(payload: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    hasher.update(b"|");
    hasher.update(salt.as_bytes());
    format!("{}{}", hex::encode(hasher.finalize()), salt)
}

impl fmt::Debug for MerchantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MerchantKey(<redacted>)")
    }
}

/// Canonical string for a flat field set: values ordered by key, joined by
/// `|`. A `null` value, in any letter case, is treated as empty.
pub fn canonical_params(fields: &BTreeMap<String, String>) -> String {
    fields
        .values()
        .map(|v| if v.eq_ignore_ascii_case("null") { "" } else { v.as_str() })
        .collect::<Vec<_>>()
        .join("|")
}
