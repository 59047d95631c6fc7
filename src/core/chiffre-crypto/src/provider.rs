//! Primitive provider capability.
//!
//! The engine never performs cipher math itself. It hands validated keys,
//! IVs and buffers to a [`CipherProvider`], which runs the raw transform and,
//! for AEAD algorithms, produces or verifies the tag.
//!
//! [`RustCryptoProvider`] is the default provider, backed by the RustCrypto
//! `aes`, `cbc`, `ctr`, `aes-gcm`, `chacha20` and `chacha20poly1305` crates.

use aes::{Aes128, Aes192, Aes256};
use aes_gcm::{
    aead::{
        consts::U12, generic_array::typenum::Unsigned, AeadCore, AeadInPlace, KeyInit, Nonce, Tag,
    },
    Aes128Gcm, Aes256Gcm, AesGcm,
};
use cbc::cipher::{
    block_padding::NoPadding, BlockCipher, BlockDecryptMut, BlockEncryptMut, KeyIvInit,
    StreamCipher,
};
use chacha20::ChaCha20 as ChaCha20Cipher;
use chacha20poly1305::ChaCha20Poly1305 as ChaCha20Poly1305Cipher;
use zeroize::Zeroizing;

use crate::algorithm::{CipherAlgorithm, TAG_SIZE};
use crate::error::CryptoError;

type Aes192Gcm = AesGcm<Aes192, U12>;
type Aes128CtrCipher = ctr::Ctr128BE<Aes128>;
type Aes192CtrCipher = ctr::Ctr128BE<Aes192>;
type Aes256CtrCipher = ctr::Ctr128BE<Aes256>;

/// Direction of an unauthenticated transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Plaintext to ciphertext.
    Encrypt,
    /// Ciphertext to plaintext.
    Decrypt,
}

/// Raw cipher transforms.
///
/// Callers guarantee that key and IV lengths match the algorithm's
/// [`AlgorithmSpec`](crate::AlgorithmSpec). Implementations must not return
/// plaintext from [`open`](Self::open) unless the tag verified.
pub trait CipherProvider: Send + Sync {
    /// Runs an unauthenticated transform (CBC over block-aligned data, CTR,
    /// ChaCha20).
    fn transform(
        &self,
        algorithm: CipherAlgorithm,
        direction: Direction,
        key: &[u8],
        iv: &[u8],
        data: &[u8],
    ) -> Result<Vec<u8>, CryptoError>;

    /// Encrypts and authenticates, returning `(ciphertext, tag)`.
    fn seal(
        &self,
        algorithm: CipherAlgorithm,
        key: &[u8],
        nonce: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), CryptoError>;

    /// Verifies `tag` and decrypts.
    fn open(
        &self,
        algorithm: CipherAlgorithm,
        key: &[u8],
        nonce: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
    ) -> Result<Vec<u8>, CryptoError>;
}

/// Provider backed by the RustCrypto crates.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustCryptoProvider;

impl CipherProvider for RustCryptoProvider {
    fn transform(
        &self,
        algorithm: CipherAlgorithm,
        direction: Direction,
        key: &[u8],
        iv: &[u8],
        data: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        use CipherAlgorithm as Alg;

        match (algorithm, direction) {
            (Alg::Aes128Cbc, Direction::Encrypt) => cbc_encrypt::<Aes128>(key, iv, data),
            (Alg::Aes192Cbc, Direction::Encrypt) => cbc_encrypt::<Aes192>(key, iv, data),
            (Alg::Aes256Cbc, Direction::Encrypt) => cbc_encrypt::<Aes256>(key, iv, data),
            (Alg::Aes128Cbc, Direction::Decrypt) => cbc_decrypt::<Aes128>(key, iv, data),
            (Alg::Aes192Cbc, Direction::Decrypt) => cbc_decrypt::<Aes192>(key, iv, data),
            (Alg::Aes256Cbc, Direction::Decrypt) => cbc_decrypt::<Aes256>(key, iv, data),
            // Keystream ciphers are their own inverse.
            (Alg::Aes128Ctr, _) => keystream::<Aes128CtrCipher>(key, iv, data),
            (Alg::Aes192Ctr, _) => keystream::<Aes192CtrCipher>(key, iv, data),
            (Alg::Aes256Ctr, _) => keystream::<Aes256CtrCipher>(key, iv, data),
            (Alg::ChaCha20, _) => keystream::<ChaCha20Cipher>(key, iv, data),
            (Alg::Aes128Gcm | Alg::Aes192Gcm | Alg::Aes256Gcm | Alg::ChaCha20Poly1305, _) => {
                Err(CryptoError::InvalidParameter(format!(
                    "{algorithm} requires an authenticated transform"
                )))
            }
        }
    }

    fn seal(
        &self,
        algorithm: CipherAlgorithm,
        key: &[u8],
        nonce: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), CryptoError> {
        match algorithm {
            CipherAlgorithm::Aes128Gcm => aead_seal::<Aes128Gcm>(key, nonce, aad, plaintext),
            CipherAlgorithm::Aes192Gcm => aead_seal::<Aes192Gcm>(key, nonce, aad, plaintext),
            CipherAlgorithm::Aes256Gcm => aead_seal::<Aes256Gcm>(key, nonce, aad, plaintext),
            CipherAlgorithm::ChaCha20Poly1305 => {
                aead_seal::<ChaCha20Poly1305Cipher>(key, nonce, aad, plaintext)
            }
            _ => Err(not_aead(algorithm)),
        }
    }

    fn open(
        &self,
        algorithm: CipherAlgorithm,
        key: &[u8],
        nonce: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        match algorithm {
            CipherAlgorithm::Aes128Gcm => aead_open::<Aes128Gcm>(key, nonce, aad, ciphertext, tag),
            CipherAlgorithm::Aes192Gcm => aead_open::<Aes192Gcm>(key, nonce, aad, ciphertext, tag),
            CipherAlgorithm::Aes256Gcm => aead_open::<Aes256Gcm>(key, nonce, aad, ciphertext, tag),
            CipherAlgorithm::ChaCha20Poly1305 => {
                aead_open::<ChaCha20Poly1305Cipher>(key, nonce, aad, ciphertext, tag)
            }
            _ => Err(not_aead(algorithm)),
        }
    }
}

fn not_aead(algorithm: CipherAlgorithm) -> CryptoError {
    CryptoError::InvalidParameter(format!("{algorithm} is not an AEAD algorithm"))
}

fn init_failed(e: impl std::fmt::Display) -> CryptoError {
    CryptoError::CryptoOperation(format!("failed to initialize cipher: {e}"))
}

fn check_aligned(len: usize, block_size: usize) -> Result<(), CryptoError> {
    if len % block_size != 0 {
        return Err(CryptoError::CryptoOperation(format!(
            "data length {len} is not a multiple of the {block_size}-byte block size"
        )));
    }
    Ok(())
}

fn cbc_encrypt<C>(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>, CryptoError>
where
    C: BlockCipher + BlockEncryptMut + KeyInit,
{
    check_aligned(data.len(), C::BlockSize::USIZE)?;
    let cipher = cbc::Encryptor::<C>::new_from_slices(key, iv).map_err(init_failed)?;
    Ok(cipher.encrypt_padded_vec_mut::<NoPadding>(data))
}

fn cbc_decrypt<C>(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>, CryptoError>
where
    C: BlockCipher + BlockDecryptMut + KeyInit,
{
    check_aligned(data.len(), C::BlockSize::USIZE)?;
    let cipher = cbc::Decryptor::<C>::new_from_slices(key, iv).map_err(init_failed)?;
    cipher
        .decrypt_padded_vec_mut::<NoPadding>(data)
        .map_err(|_| CryptoError::CryptoOperation("decryption failed".to_string()))
}

fn keystream<S>(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>, CryptoError>
where
    S: KeyIvInit + StreamCipher,
{
    let mut cipher = S::new_from_slices(key, iv).map_err(init_failed)?;
    let mut buffer = data.to_vec();
    cipher
        .try_apply_keystream(&mut buffer)
        .map_err(|e| CryptoError::CryptoOperation(format!("keystream exhausted: {e}")))?;
    Ok(buffer)
}

fn check_nonce<A: AeadCore>(nonce: &[u8]) -> Result<(), CryptoError> {
    if nonce.len() != A::NonceSize::USIZE {
        return Err(CryptoError::InvalidParameter(format!(
            "expected {}-byte nonce, got {}",
            A::NonceSize::USIZE,
            nonce.len()
        )));
    }
    Ok(())
}

fn aead_seal<A>(
    key: &[u8],
    nonce: &[u8],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<(Vec<u8>, Vec<u8>), CryptoError>
where
    A: AeadInPlace + KeyInit,
{
    check_nonce::<A>(nonce)?;
    let cipher = A::new_from_slice(key).map_err(init_failed)?;

    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::<A>::from_slice(nonce), aad, &mut buffer)
        .map_err(|_| CryptoError::CryptoOperation("encryption failed".to_string()))?;

    Ok((buffer, tag.to_vec()))
}

fn aead_open<A>(
    key: &[u8],
    nonce: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
) -> Result<Vec<u8>, CryptoError>
where
    A: AeadInPlace + KeyInit,
{
    check_nonce::<A>(nonce)?;
    if tag.len() != TAG_SIZE || tag.len() != A::TagSize::USIZE {
        return Err(CryptoError::InvalidParameter(format!(
            "expected {TAG_SIZE}-byte tag, got {}",
            tag.len()
        )));
    }
    let cipher = A::new_from_slice(key).map_err(init_failed)?;

    // Scrubbed on every path; only handed out after the tag verified.
    let mut buffer = Zeroizing::new(ciphertext.to_vec());
    cipher
        .decrypt_in_place_detached(
            Nonce::<A>::from_slice(nonce),
            aad,
            &mut buffer,
            Tag::<A>::from_slice(tag),
        )
        .map_err(|_| CryptoError::authentication_failed())?;

    Ok(std::mem::take(&mut *buffer))
}
