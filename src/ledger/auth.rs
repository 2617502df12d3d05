//! Record Authentication
//!
//! HMAC-SHA256 signatures over record hashes. A re-hashed chain still
//! fails verification unless it was re-signed with the owner's key.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use subtle::ConstantTimeEq;

use crate::error::{LedgerError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Secret key material; never printed, never serialized
#[derive(Clone)]
pub struct SecretKey(Vec<u8>);

impl SecretKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(LedgerError::Config("Secret key must not be empty".to_string()));
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey([REDACTED; {} bytes])", self.0.len())
    }
}

/// Signs and verifies record hashes with a fixed secret key
#[derive(Clone)]
pub struct Authenticator {
    key_len: usize,
    mac: HmacSha256,
}

impl Authenticator {
    pub fn new(key: SecretKey) -> Result<Self> {
        let mac = HmacSha256::new_from_slice(key.as_bytes())
            .map_err(|e| LedgerError::Config(format!("Unusable secret key: {}", e)))?;
        Ok(Self {
            key_len: key.as_bytes().len(),
            mac,
        })
    }

    /// Hex-encoded HMAC-SHA256 of the hash string's bytes
    pub fn sign(&self, hash: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(hash.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Constant-time comparison of the expected signature against `signature`
    pub fn verify(&self, hash: &str, signature: &str) -> bool {
        let expected = self.sign(hash);
        expected.as_bytes().ct_eq(signature.as_bytes()).into()
    }
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("algorithm", &"HMAC-SHA256")
            .field("key_len", &self.key_len)
            .finish()
    }
}
