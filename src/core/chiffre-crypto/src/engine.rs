//! The cipher engine.
//!
//! [`CryptoEngine`] validates every parameter against the algorithm registry,
//! generates IVs, applies block padding and routes the transform to its
//! [`CipherProvider`]. All checks run before any entropy or provider call, so
//! a rejected call has no side effects.
//!
//! The engine also carries the rest of the crate's surface (key generation,
//! key derivation, digests, codecs) so that one handle serves every caller.

use tracing::{debug, warn};
use zeroize::{Zeroize, Zeroizing};

use crate::algorithm::{CipherAlgorithm, TAG_SIZE};
use crate::digest::{self, HashAlgorithm};
use crate::encoding;
use crate::error::CryptoError;
use crate::kdf::{self, DerivedKey, KeyDerivationOptions};
use crate::padding::{self, PaddingMode};
use crate::provider::{CipherProvider, Direction, RustCryptoProvider};
use crate::random::{EntropySource, OsEntropy, SecureRandom};
use crate::secure;

/// Output of [`CryptoEngine::encrypt`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionResult {
    /// Encrypted bytes.
    pub ciphertext: Vec<u8>,
    /// IV or nonce actually used, either supplied or generated.
    pub iv: Vec<u8>,
    /// Authentication tag, present for AEAD algorithms only.
    pub tag: Option<Vec<u8>>,
}

/// Symmetric encryption engine.
///
/// The engine holds no per-call state. Construct it once and share it; it is
/// `Send + Sync` whenever its backends are.
#[derive(Debug, Clone, Default)]
pub struct CryptoEngine<P = RustCryptoProvider, E = OsEntropy> {
    provider: P,
    rng: SecureRandom<E>,
}

impl CryptoEngine {
    /// Creates an engine backed by the RustCrypto provider and the OS CSPRNG.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes bytes as standard Base64.
    pub fn encode_base64(data: &[u8]) -> String {
        encoding::encode_base64(data)
    }

    /// Decodes the leading valid Base64 of `data`.
    pub fn decode_base64(data: &str) -> Vec<u8> {
        encoding::decode_base64(data)
    }

    /// Decodes canonical Base64, failing on any malformed input.
    pub fn decode_base64_strict(data: &str) -> Result<Vec<u8>, CryptoError> {
        encoding::decode_base64_strict(data)
    }

    /// Encodes bytes as lowercase hex.
    pub fn encode_hex(data: &[u8]) -> String {
        encoding::encode_hex(data)
    }

    /// Decodes a hex string.
    pub fn decode_hex(data: &str) -> Result<Vec<u8>, CryptoError> {
        encoding::decode_hex(data)
    }

    /// Compares two byte strings in constant time.
    pub fn secure_compare(a: &[u8], b: &[u8]) -> bool {
        secure::secure_compare(a, b)
    }

    /// Zeroizes `data`.
    pub fn secure_zero(data: &mut [u8]) {
        secure::secure_zero(data)
    }
}

impl<P: CipherProvider, E: EntropySource> CryptoEngine<P, E> {
    /// Creates an engine with explicit provider and entropy backends.
    pub fn with_backends(provider: P, entropy: E) -> Self {
        Self {
            provider,
            rng: SecureRandom::new(entropy),
        }
    }

    /// Returns the primitive provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Returns the entropy source.
    pub fn entropy(&self) -> &E {
        self.rng.source()
    }

    /// Encrypts `data`.
    ///
    /// A missing or empty `iv` is replaced by a fresh random one of the
    /// algorithm's IV size. `padding` applies to CBC only and `aad` to AEAD
    /// algorithms only.
    ///
    /// # Errors
    ///
    /// - `InvalidKey` if the key length does not match the algorithm.
    /// - `InvalidParameter` if a supplied IV has the wrong length.
    /// - `CryptoOperation` if the transform fails, e.g. unaligned CBC input
    ///   with [`PaddingMode::None`].
    pub fn encrypt(
        &self,
        data: &[u8],
        key: &[u8],
        algorithm: CipherAlgorithm,
        padding: PaddingMode,
        iv: Option<&[u8]>,
        aad: Option<&[u8]>,
    ) -> Result<EncryptionResult, CryptoError> {
        check_key(algorithm, key)?;
        let supplied_iv = match iv {
            Some(iv) if !iv.is_empty() => {
                check_iv(algorithm, iv)?;
                Some(iv)
            }
            _ => None,
        };

        debug!(
            algorithm = %algorithm,
            padding = %padding,
            data_len = data.len(),
            generated_iv = supplied_iv.is_none(),
            "Encrypting"
        );

        let iv = match supplied_iv {
            Some(iv) => iv.to_vec(),
            None => self.rng.random_bytes(algorithm.iv_size())?,
        };

        if algorithm.is_aead() {
            let (ciphertext, tag) =
                self.provider
                    .seal(algorithm, key, &iv, aad.unwrap_or_default(), data)?;
            if tag.len() != TAG_SIZE {
                return Err(CryptoError::CryptoOperation(format!(
                    "provider returned a {}-byte tag",
                    tag.len()
                )));
            }
            return Ok(EncryptionResult {
                ciphertext,
                iv,
                tag: Some(tag),
            });
        }

        let ciphertext = if algorithm.uses_padding() {
            let padded = Zeroizing::new(padding::add_padding_with(
                data,
                padding,
                algorithm.block_size(),
                &self.rng,
            )?);
            self.provider
                .transform(algorithm, Direction::Encrypt, key, &iv, &padded)?
        } else {
            self.provider
                .transform(algorithm, Direction::Encrypt, key, &iv, data)?
        };

        Ok(EncryptionResult {
            ciphertext,
            iv,
            tag: None,
        })
    }

    /// Decrypts `ciphertext`.
    ///
    /// AEAD algorithms require the 16-byte `tag` produced by
    /// [`encrypt`](Self::encrypt) and the same `aad`. No plaintext is
    /// returned unless the tag verifies.
    ///
    /// # Errors
    ///
    /// - `InvalidKey` if the key length does not match the algorithm.
    /// - `InvalidParameter` for a wrong IV length, or a missing or
    ///   wrong-length tag on an AEAD algorithm.
    /// - `CryptoOperation` if authentication, the transform or padding
    ///   removal fails.
    #[allow(clippy::too_many_arguments)]
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        key: &[u8],
        algorithm: CipherAlgorithm,
        iv: &[u8],
        padding: PaddingMode,
        aad: Option<&[u8]>,
        tag: Option<&[u8]>,
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        check_key(algorithm, key)?;
        check_iv(algorithm, iv)?;

        debug!(
            algorithm = %algorithm,
            padding = %padding,
            ciphertext_len = ciphertext.len(),
            "Decrypting"
        );

        if algorithm.is_aead() {
            let tag = match tag {
                Some(tag) if !tag.is_empty() => tag,
                _ => {
                    return Err(CryptoError::InvalidParameter(format!(
                        "{algorithm} requires an authentication tag"
                    )))
                }
            };
            if tag.len() != TAG_SIZE {
                return Err(CryptoError::InvalidParameter(format!(
                    "expected {TAG_SIZE}-byte tag, got {}",
                    tag.len()
                )));
            }

            let plaintext = self
                .provider
                .open(algorithm, key, iv, aad.unwrap_or_default(), ciphertext, tag)
                .inspect_err(|_| warn!(algorithm = %algorithm, "Authentication failed"))?;
            return Ok(Zeroizing::new(plaintext));
        }

        let mut plaintext = Zeroizing::new(self.provider.transform(
            algorithm,
            Direction::Decrypt,
            key,
            iv,
            ciphertext,
        )?);

        if algorithm.uses_padding() {
            let len = padding::unpadded_len(&plaintext, padding, algorithm.block_size())
                .inspect_err(|_| warn!(algorithm = %algorithm, "Padding check failed"))?;
            plaintext[len..].zeroize();
            plaintext.truncate(len);
        }

        Ok(plaintext)
    }

    /// Generates `length` bytes of key material.
    pub fn generate_key(&self, length: usize) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        self.rng.generate_key(length)
    }

    /// Derives a key from `password` with a fresh random salt.
    pub fn derive_key(
        &self,
        password: &[u8],
        options: &KeyDerivationOptions,
    ) -> Result<DerivedKey, CryptoError> {
        kdf::derive_key_with_rng(password, options, &self.rng)
    }

    /// Derives a key from `password` and an existing `salt`.
    pub fn derive_key_with_salt(
        &self,
        password: &[u8],
        salt: &[u8],
        options: &KeyDerivationOptions,
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        kdf::derive_key_with_salt(password, salt, options)
    }

    /// Computes the digest of `data`.
    pub fn hash(&self, data: &[u8], algorithm: HashAlgorithm) -> Vec<u8> {
        digest::hash(data, algorithm)
    }

    /// Computes the HMAC of `data` under `key`.
    pub fn hmac(
        &self,
        data: &[u8],
        key: &[u8],
        algorithm: HashAlgorithm,
    ) -> Result<Vec<u8>, CryptoError> {
        digest::hmac(data, key, algorithm)
    }

    /// Generates `length` random bytes.
    pub fn random_bytes(&self, length: usize) -> Result<Vec<u8>, CryptoError> {
        self.rng.random_bytes(length)
    }

    /// Generates a uniformly distributed integer in `[min, max)`.
    pub fn random_int(&self, min: u32, max: u32) -> Result<u32, CryptoError> {
        self.rng.random_int(min, max)
    }
}

fn check_key(algorithm: CipherAlgorithm, key: &[u8]) -> Result<(), CryptoError> {
    if key.len() != algorithm.key_size() {
        return Err(CryptoError::InvalidKey(format!(
            "{algorithm} expects {} bytes, got {}",
            algorithm.key_size(),
            key.len()
        )));
    }
    Ok(())
}

fn check_iv(algorithm: CipherAlgorithm, iv: &[u8]) -> Result<(), CryptoError> {
    if iv.len() != algorithm.iv_size() {
        return Err(CryptoError::InvalidParameter(format!(
            "{algorithm} expects a {}-byte IV, got {}",
            algorithm.iv_size(),
            iv.len()
        )));
    }
    Ok(())
}
