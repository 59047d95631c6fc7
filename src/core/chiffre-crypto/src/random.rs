//! Cryptographically secure random generation.
//!
//! All randomness flows through an [`EntropySource`]. The default source,
//! [`OsEntropy`], reads the operating system's CSPRNG and reports failure
//! instead of falling back to a weaker generator.

use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// A source of cryptographically strong random bytes.
///
/// Implementations are shared behind `&self` across threads and must
/// serialize any internal state themselves.
pub trait EntropySource: Send + Sync {
    /// Fills `dest` entirely with random bytes.
    fn fill(&self, dest: &mut [u8]) -> Result<(), CryptoError>;
}

/// Entropy from the operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill(&self, dest: &mut [u8]) -> Result<(), CryptoError> {
        OsRng.try_fill_bytes(dest).map_err(|e| {
            CryptoError::CryptoOperation(format!("failed to generate random bytes: {e}"))
        })
    }
}

impl<E: EntropySource + ?Sized> EntropySource for &E {
    fn fill(&self, dest: &mut [u8]) -> Result<(), CryptoError> {
        (**self).fill(dest)
    }
}

/// Random byte and integer generation on top of an [`EntropySource`].
#[derive(Debug, Clone, Default)]
pub struct SecureRandom<E = OsEntropy> {
    source: E,
}

impl<E: EntropySource> SecureRandom<E> {
    /// Wraps an entropy source.
    pub fn new(source: E) -> Self {
        Self { source }
    }

    /// Returns the underlying entropy source.
    pub fn source(&self) -> &E {
        &self.source
    }

    /// Generates `length` random bytes.
    pub fn random_bytes(&self, length: usize) -> Result<Vec<u8>, CryptoError> {
        let mut bytes = vec![0u8; length];
        self.source.fill(&mut bytes)?;
        Ok(bytes)
    }

    /// Generates a uniformly distributed integer in `[min, max)`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if `min >= max`.
    pub fn random_int(&self, min: u32, max: u32) -> Result<u32, CryptoError> {
        if min >= max {
            return Err(CryptoError::InvalidParameter(format!(
                "invalid range for random integer: [{min}, {max})"
            )));
        }

        let range = max - min;
        // Draws below this bound would bias the modulo; 2^32 mod range of them.
        let threshold = range.wrapping_neg() % range;

        loop {
            let mut word = [0u8; 4];
            self.source.fill(&mut word)?;
            let value = u32::from_le_bytes(word);
            if value >= threshold {
                return Ok(min + value % range);
            }
        }
    }

    /// Generates `length` bytes of key material, wiped when the returned
    /// buffer is dropped.
    pub fn generate_key(&self, length: usize) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let mut key = Zeroizing::new(vec![0u8; length]);
        self.source.fill(&mut key)?;
        Ok(key)
    }
}

/// Generates `length` random bytes from the OS CSPRNG.
pub fn random_bytes(length: usize) -> Result<Vec<u8>, CryptoError> {
    SecureRandom::new(OsEntropy).random_bytes(length)
}

/// Generates a uniformly distributed integer in `[min, max)` from the OS CSPRNG.
pub fn random_int(min: u32, max: u32) -> Result<u32, CryptoError> {
    SecureRandom::new(OsEntropy).random_int(min, max)
}

/// Generates `length` bytes of key material from the OS CSPRNG.
pub fn generate_key(length: usize) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    SecureRandom::new(OsEntropy).generate_key(length)
}
