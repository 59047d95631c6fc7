//! Block padding schemes.
//!
//! Padding always appends between 1 and `block_size` bytes, so a padded
//! buffer is never empty and always block-aligned.
//!
//! Removal validates the trailing length byte for every length-bearing
//! scheme. PKCS#7/PKCS#5 padding bytes are compared in constant time over
//! the padding run. Every validation failure yields the same
//! `CryptoOperation` error.
//!
//! Zero padding is lossy: removal strips every trailing zero byte, including
//! zero bytes that belonged to the plaintext.

use std::fmt;
use std::str::FromStr;

use subtle::{Choice, ConstantTimeEq};

use crate::error::CryptoError;
use crate::random::{EntropySource, OsEntropy, SecureRandom};

/// Largest block size a one-byte length marker can describe.
pub const MAX_BLOCK_SIZE: usize = 255;

/// Supported padding schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PaddingMode {
    /// PKCS#7: `n` bytes of value `n`.
    #[default]
    Pkcs7,
    /// PKCS#5: identical to PKCS#7 in this crate.
    Pkcs5,
    /// ISO 10126: `n - 1` random bytes followed by `n`.
    Iso10126,
    /// ANSI X9.23: `n - 1` zero bytes followed by `n`.
    AnsiX923,
    /// Zero bytes; removal strips all trailing zeros.
    Zero,
    /// No padding.
    None,
}

impl PaddingMode {
    /// All padding modes.
    pub const ALL: [PaddingMode; 6] = [
        Self::Pkcs7,
        Self::Pkcs5,
        Self::Iso10126,
        Self::AnsiX923,
        Self::Zero,
        Self::None,
    ];

    /// Canonical textual identifier, e.g. `PKCS7`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pkcs7 => "PKCS7",
            Self::Pkcs5 => "PKCS5",
            Self::Iso10126 => "ISO10126",
            Self::AnsiX923 => "ANSIX923",
            Self::Zero => "ZERO",
            Self::None => "NONE",
        }
    }
}

impl fmt::Display for PaddingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaddingMode {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| CryptoError::InvalidParameter(format!("unknown padding mode: {s}")))
    }
}

/// Pads `data` to a multiple of `block_size`, drawing ISO 10126 filler from
/// the operating system.
pub fn add_padding(
    data: &[u8],
    mode: PaddingMode,
    block_size: usize,
) -> Result<Vec<u8>, CryptoError> {
    add_padding_with(data, mode, block_size, &SecureRandom::new(OsEntropy))
}

/// Pads `data` to a multiple of `block_size` using `rng` for random filler.
///
/// # Errors
///
/// Returns `InvalidParameter` if `block_size` is outside `1..=255` for any
/// mode other than `None`.
pub fn add_padding_with<E: EntropySource>(
    data: &[u8],
    mode: PaddingMode,
    block_size: usize,
    rng: &SecureRandom<E>,
) -> Result<Vec<u8>, CryptoError> {
    if mode == PaddingMode::None {
        return Ok(data.to_vec());
    }
    check_block_size(block_size)?;

    let pad_len = block_size - data.len() % block_size;
    let mut padded = Vec::with_capacity(data.len() + pad_len);
    padded.extend_from_slice(data);

    match mode {
        PaddingMode::Pkcs7 | PaddingMode::Pkcs5 => {
            padded.resize(data.len() + pad_len, pad_len as u8);
        }
        PaddingMode::Zero => {
            padded.resize(data.len() + pad_len, 0);
        }
        PaddingMode::Iso10126 => {
            padded.extend_from_slice(&rng.random_bytes(pad_len - 1)?);
            padded.push(pad_len as u8);
        }
        PaddingMode::AnsiX923 => {
            padded.resize(data.len() + pad_len - 1, 0);
            padded.push(pad_len as u8);
        }
        PaddingMode::None => {}
    }

    Ok(padded)
}

/// Strips and validates padding, returning the original data.
///
/// # Errors
///
/// Returns `InvalidParameter` for an unusable `block_size` and
/// `CryptoOperation` if the padding is malformed.
pub fn remove_padding(
    data: &[u8],
    mode: PaddingMode,
    block_size: usize,
) -> Result<Vec<u8>, CryptoError> {
    let len = unpadded_len(data, mode, block_size)?;
    Ok(data[..len].to_vec())
}

/// Validates the padding of `data` and returns the length of the content
/// that precedes it.
pub fn unpadded_len(
    data: &[u8],
    mode: PaddingMode,
    block_size: usize,
) -> Result<usize, CryptoError> {
    if mode == PaddingMode::None {
        return Ok(data.len());
    }
    check_block_size(block_size)?;

    if mode == PaddingMode::Zero {
        let trailing = data.iter().rev().take_while(|b| **b == 0).count();
        return Ok(data.len() - trailing);
    }

    let Some(&marker) = data.last() else {
        return Err(CryptoError::invalid_padding());
    };
    let pad_len = marker as usize;
    if pad_len == 0 || pad_len > block_size || pad_len > data.len() {
        return Err(CryptoError::invalid_padding());
    }

    let content_len = data.len() - pad_len;
    let fill = &data[content_len..data.len() - 1];

    let valid = match mode {
        PaddingMode::Pkcs7 | PaddingMode::Pkcs5 => all_equal(fill, marker),
        PaddingMode::AnsiX923 => all_equal(fill, 0),
        _ => Choice::from(1),
    };

    if bool::from(valid) {
        Ok(content_len)
    } else {
        Err(CryptoError::invalid_padding())
    }
}

fn all_equal(bytes: &[u8], expected: u8) -> Choice {
    bytes
        .iter()
        .fold(Choice::from(1), |acc, byte| acc & byte.ct_eq(&expected))
}

fn check_block_size(block_size: usize) -> Result<(), CryptoError> {
    if block_size == 0 || block_size > MAX_BLOCK_SIZE {
        return Err(CryptoError::InvalidParameter(format!(
            "block size must be in 1..={MAX_BLOCK_SIZE}, got {block_size}"
        )));
    }
    Ok(())
}
