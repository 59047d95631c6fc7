//! Message digests and HMAC.
//!
//! SHA-1 and MD5 are provided for interoperability with legacy data only.

use std::fmt;
use std::str::FromStr;

use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::error::CryptoError;

/// Supported hash algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// SHA-1 (160-bit).
    Sha1,
    /// SHA-256.
    Sha256,
    /// SHA-384.
    Sha384,
    /// SHA-512.
    Sha512,
    /// MD5 (128-bit).
    Md5,
}

impl HashAlgorithm {
    /// All hash algorithms.
    pub const ALL: [HashAlgorithm; 5] = [
        Self::Sha1,
        Self::Sha256,
        Self::Sha384,
        Self::Sha512,
        Self::Md5,
    ];

    /// Digest length in bytes.
    pub fn output_size(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
            Self::Md5 => 16,
        }
    }

    /// Canonical textual identifier, e.g. `SHA256`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
            Self::Sha384 => "SHA384",
            Self::Sha512 => "SHA512",
            Self::Md5 => "MD5",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.as_str() == s)
            .ok_or_else(|| CryptoError::InvalidParameter(format!("unknown hash algorithm: {s}")))
    }
}

/// Computes the digest of `data`.
pub fn hash(data: &[u8], algorithm: HashAlgorithm) -> Vec<u8> {
    match algorithm {
        HashAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
        HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
        HashAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
        HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        HashAlgorithm::Md5 => Md5::digest(data).to_vec(),
    }
}

/// Computes the HMAC of `data` under `key`.
///
/// Keys of any length are accepted, as in RFC 2104.
pub fn hmac(data: &[u8], key: &[u8], algorithm: HashAlgorithm) -> Result<Vec<u8>, CryptoError> {
    match algorithm {
        HashAlgorithm::Sha1 => mac::<Hmac<Sha1>>(data, key),
        HashAlgorithm::Sha256 => mac::<Hmac<Sha256>>(data, key),
        HashAlgorithm::Sha384 => mac::<Hmac<Sha384>>(data, key),
        HashAlgorithm::Sha512 => mac::<Hmac<Sha512>>(data, key),
        HashAlgorithm::Md5 => mac::<Hmac<Md5>>(data, key),
    }
}

fn mac<M: Mac + hmac::digest::KeyInit>(data: &[u8], key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut mac = <M as hmac::digest::KeyInit>::new_from_slice(key)
        .map_err(|e| CryptoError::CryptoOperation(format!("HMAC initialization failed: {e}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}
