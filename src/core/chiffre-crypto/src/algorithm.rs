//! Cipher algorithm registry.
//!
//! Every supported algorithm maps to exactly one [`AlgorithmSpec`] row in a
//! static table. The rest of the crate reads key, IV and block sizes from
//! here and nowhere else.

use std::fmt;
use std::str::FromStr;

use crate::error::CryptoError;

/// Length of every AEAD authentication tag produced by this crate.
pub const TAG_SIZE: usize = 16;

/// Supported symmetric cipher algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherAlgorithm {
    /// AES-128 in CBC mode.
    Aes128Cbc,
    /// AES-192 in CBC mode.
    Aes192Cbc,
    /// AES-256 in CBC mode.
    Aes256Cbc,
    /// AES-128 in GCM mode (AEAD).
    Aes128Gcm,
    /// AES-192 in GCM mode (AEAD).
    Aes192Gcm,
    /// AES-256 in GCM mode (AEAD).
    Aes256Gcm,
    /// AES-128 in CTR mode.
    Aes128Ctr,
    /// AES-192 in CTR mode.
    Aes192Ctr,
    /// AES-256 in CTR mode.
    Aes256Ctr,
    /// ChaCha20 stream cipher (IETF, 96-bit nonce).
    ChaCha20,
    /// ChaCha20-Poly1305 (AEAD).
    ChaCha20Poly1305,
}

/// Fixed parameter contract of a cipher algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlgorithmSpec {
    /// Required key length in bytes.
    pub key_size: usize,
    /// Block size in bytes (1 for ChaCha20 variants).
    pub block_size: usize,
    /// Required IV or nonce length in bytes.
    pub iv_size: usize,
    /// Whether the algorithm authenticates its output.
    pub is_aead: bool,
    /// Whether the algorithm operates as a stream (no padding applied).
    pub is_stream: bool,
}

const fn row(
    key_size: usize,
    block_size: usize,
    iv_size: usize,
    is_aead: bool,
    is_stream: bool,
) -> AlgorithmSpec {
    AlgorithmSpec {
        key_size,
        block_size,
        iv_size,
        is_aead,
        is_stream,
    }
}

// Indexed by `CipherAlgorithm as usize`; order must follow the enum.
static SPECS: [AlgorithmSpec; 11] = [
    row(16, 16, 16, false, false), // AES_128_CBC
    row(24, 16, 16, false, false), // AES_192_CBC
    row(32, 16, 16, false, false), // AES_256_CBC
    row(16, 16, 12, true, false),  // AES_128_GCM
    row(24, 16, 12, true, false),  // AES_192_GCM
    row(32, 16, 12, true, false),  // AES_256_GCM
    row(16, 16, 16, false, true),  // AES_128_CTR
    row(24, 16, 16, false, true),  // AES_192_CTR
    row(32, 16, 16, false, true),  // AES_256_CTR
    row(32, 1, 12, false, true),   // CHACHA20
    row(32, 1, 12, true, true),    // CHACHA20_POLY1305
];

impl CipherAlgorithm {
    /// All supported algorithms, in table order.
    pub const ALL: [CipherAlgorithm; 11] = [
        Self::Aes128Cbc,
        Self::Aes192Cbc,
        Self::Aes256Cbc,
        Self::Aes128Gcm,
        Self::Aes192Gcm,
        Self::Aes256Gcm,
        Self::Aes128Ctr,
        Self::Aes192Ctr,
        Self::Aes256Ctr,
        Self::ChaCha20,
        Self::ChaCha20Poly1305,
    ];

    /// Returns the parameter contract for this algorithm.
    #[inline]
    pub fn spec(self) -> &'static AlgorithmSpec {
        &SPECS[self as usize]
    }

    /// Required key length in bytes.
    #[inline]
    pub fn key_size(self) -> usize {
        self.spec().key_size
    }

    /// Block size in bytes.
    #[inline]
    pub fn block_size(self) -> usize {
        self.spec().block_size
    }

    /// Required IV or nonce length in bytes.
    #[inline]
    pub fn iv_size(self) -> usize {
        self.spec().iv_size
    }

    /// Whether the algorithm produces an authentication tag.
    #[inline]
    pub fn is_aead(self) -> bool {
        self.spec().is_aead
    }

    /// Whether the algorithm runs without block padding.
    #[inline]
    pub fn is_stream_cipher(self) -> bool {
        self.spec().is_stream
    }

    /// Whether plaintext goes through the padding engine before encryption.
    #[inline]
    pub fn uses_padding(self) -> bool {
        !self.is_stream_cipher() && !self.is_aead()
    }

    /// Canonical textual identifier, e.g. `AES_256_GCM`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aes128Cbc => "AES_128_CBC",
            Self::Aes192Cbc => "AES_192_CBC",
            Self::Aes256Cbc => "AES_256_CBC",
            Self::Aes128Gcm => "AES_128_GCM",
            Self::Aes192Gcm => "AES_192_GCM",
            Self::Aes256Gcm => "AES_256_GCM",
            Self::Aes128Ctr => "AES_128_CTR",
            Self::Aes192Ctr => "AES_192_CTR",
            Self::Aes256Ctr => "AES_256_CTR",
            Self::ChaCha20 => "CHACHA20",
            Self::ChaCha20Poly1305 => "CHACHA20_POLY1305",
        }
    }
}

/// Required key length in bytes for `algorithm`.
pub fn key_size(algorithm: CipherAlgorithm) -> usize {
    algorithm.key_size()
}

/// Block size in bytes for `algorithm`.
pub fn block_size(algorithm: CipherAlgorithm) -> usize {
    algorithm.block_size()
}

/// Required IV or nonce length in bytes for `algorithm`.
pub fn iv_size(algorithm: CipherAlgorithm) -> usize {
    algorithm.iv_size()
}

/// Whether `algorithm` is an AEAD construction.
pub fn is_aead(algorithm: CipherAlgorithm) -> bool {
    algorithm.is_aead()
}

/// Whether `algorithm` runs without block padding.
pub fn is_stream_cipher(algorithm: CipherAlgorithm) -> bool {
    algorithm.is_stream_cipher()
}

impl fmt::Display for CipherAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CipherAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.as_str() == s)
            .ok_or_else(|| CryptoError::InvalidParameter(format!("unknown cipher algorithm: {s}")))
    }
}
