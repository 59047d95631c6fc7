//! Integration tests for the Chiffre engine.
//!
//! These tests exercise complete workflows across modules: password-based
//! key derivation, encryption into a portable envelope, transport as JSON
//! and decryption on the other side.

// Allow unwrap() in tests - panics are acceptable for test assertions
#![allow(clippy::disallowed_methods)]

use anyhow::{Context, Result};
use chiffre_crypto::{
    CipherAlgorithm, CryptoEngine, CryptoError, KeyDerivationOptions, PaddingMode,
};
use serde::{Deserialize, Serialize};

// ============================================================================
// Envelope Types
// ============================================================================

/// A self-describing encrypted payload with every field needed to decrypt
/// it again, given the password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub algorithm: String,
    pub padding: String,
    pub kdf: KeyDerivationOptions,
    pub salt: String,
    pub iv: String,
    pub tag: Option<String>,
    pub ciphertext: String,
}

// ============================================================================
// Password Sealing
// ============================================================================

/// Derives a key from `password` and encrypts `plaintext` into an envelope.
pub fn seal_with_password(
    engine: &CryptoEngine,
    password: &str,
    plaintext: &[u8],
    algorithm: CipherAlgorithm,
    padding: PaddingMode,
    kdf: KeyDerivationOptions,
) -> Result<Envelope> {
    let kdf = KeyDerivationOptions {
        key_length: algorithm.key_size() as u32,
        ..kdf
    };
    let derived = engine
        .derive_key(password.as_bytes(), &kdf)
        .context("Failed to derive key")?;

    let sealed = engine
        .encrypt(plaintext, derived.key(), algorithm, padding, None, None)
        .context("Failed to encrypt")?;

    Ok(Envelope {
        algorithm: algorithm.to_string(),
        padding: padding.to_string(),
        salt: CryptoEngine::encode_base64(derived.salt()),
        iv: CryptoEngine::encode_base64(&sealed.iv),
        tag: sealed.tag.as_deref().map(CryptoEngine::encode_base64),
        ciphertext: CryptoEngine::encode_base64(&sealed.ciphertext),
        kdf,
    })
}

/// Re-derives the key from `password` and decrypts `envelope`.
pub fn open_with_password(
    engine: &CryptoEngine,
    password: &str,
    envelope: &Envelope,
) -> Result<Vec<u8>, CryptoError> {
    let algorithm: CipherAlgorithm = envelope.algorithm.parse()?;
    let padding: PaddingMode = envelope.padding.parse()?;
    let salt = CryptoEngine::decode_base64(&envelope.salt);
    let key = engine.derive_key_with_salt(password.as_bytes(), &salt, &envelope.kdf)?;

    let tag = envelope.tag.as_deref().map(CryptoEngine::decode_base64);
    let plaintext = engine.decrypt(
        &CryptoEngine::decode_base64(&envelope.ciphertext),
        &key,
        algorithm,
        &CryptoEngine::decode_base64(&envelope.iv),
        padding,
        None,
        tag.as_deref(),
    )?;

    Ok(plaintext.to_vec())
}

/// Cheap derivation settings for tests.
pub fn fast_kdf() -> KeyDerivationOptions {
    KeyDerivationOptions {
        iterations: 1_000,
        salt_length: 16,
        ..KeyDerivationOptions::pbkdf2()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chiffre_crypto::{ErrorKind, HashAlgorithm, SecureBuffer};

    const MESSAGE: &[u8] = b"The quick brown fox jumps over the lazy dog";

    #[test]
    fn test_password_envelope_roundtrip_all_algorithms() {
        let engine = CryptoEngine::new();

        for algorithm in CipherAlgorithm::ALL {
            let envelope = seal_with_password(
                &engine,
                "correct horse battery staple",
                MESSAGE,
                algorithm,
                PaddingMode::Pkcs7,
                fast_kdf(),
            )
            .unwrap();

            // Transport through JSON.
            let wire = serde_json::to_string(&envelope).unwrap();
            let received: Envelope = serde_json::from_str(&wire).unwrap();
            assert_eq!(received, envelope);

            let plaintext =
                open_with_password(&engine, "correct horse battery staple", &received).unwrap();
            assert_eq!(plaintext, MESSAGE, "{algorithm}");
        }
    }

    #[test]
    fn test_wrong_password_rejected_by_aead() {
        let engine = CryptoEngine::new();

        for algorithm in [CipherAlgorithm::Aes128Gcm, CipherAlgorithm::ChaCha20Poly1305] {
            let envelope = seal_with_password(
                &engine,
                "right",
                MESSAGE,
                algorithm,
                PaddingMode::None,
                fast_kdf(),
            )
            .unwrap();

            let err = open_with_password(&engine, "wrong", &envelope).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::CryptoOperation);
            assert!(!err.is_caller_error());
        }
    }

    #[test]
    fn test_tampered_envelope_rejected() {
        let engine = CryptoEngine::new();
        let mut envelope = seal_with_password(
            &engine,
            "pw",
            MESSAGE,
            CipherAlgorithm::Aes256Gcm,
            PaddingMode::None,
            fast_kdf(),
        )
        .unwrap();

        let mut ciphertext = CryptoEngine::decode_base64(&envelope.ciphertext);
        ciphertext[0] ^= 0x80;
        envelope.ciphertext = CryptoEngine::encode_base64(&ciphertext);

        let err = open_with_password(&engine, "pw", &envelope).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CryptoOperation);
    }

    #[test]
    fn test_unknown_algorithm_in_envelope() {
        let engine = CryptoEngine::new();
        let mut envelope = seal_with_password(
            &engine,
            "pw",
            MESSAGE,
            CipherAlgorithm::Aes256Cbc,
            PaddingMode::AnsiX923,
            fast_kdf(),
        )
        .unwrap();
        envelope.algorithm = "BLOWFISH_CBC".to_string();

        let err = open_with_password(&engine, "pw", &envelope).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn test_memory_hard_kdfs_feed_the_cipher() {
        let engine = CryptoEngine::new();

        let scrypt = KeyDerivationOptions {
            iterations: 1 << 10,
            ..KeyDerivationOptions::scrypt()
        };
        let argon2 = KeyDerivationOptions {
            iterations: 1,
            memory: 64,
            parallelism: 1,
            ..KeyDerivationOptions::argon2()
        };

        for kdf in [scrypt, argon2] {
            let function = kdf.function;
            let envelope = seal_with_password(
                &engine,
                "pw",
                MESSAGE,
                CipherAlgorithm::ChaCha20,
                PaddingMode::None,
                kdf,
            )
            .unwrap();
            assert_eq!(envelope.kdf.function, function);
            assert_eq!(open_with_password(&engine, "pw", &envelope).unwrap(), MESSAGE);
        }
    }

    #[test]
    fn test_shared_engine_across_threads() {
        let engine = CryptoEngine::new();
        let key = engine.generate_key(32).unwrap();

        std::thread::scope(|scope| {
            for i in 0..8u8 {
                let engine = &engine;
                let key = &key;
                scope.spawn(move || {
                    let data = vec![i; 100 + i as usize];
                    let sealed = engine
                        .encrypt(
                            &data,
                            key,
                            CipherAlgorithm::Aes256Cbc,
                            PaddingMode::Iso10126,
                            None,
                            None,
                        )
                        .unwrap();
                    let opened = engine
                        .decrypt(
                            &sealed.ciphertext,
                            key,
                            CipherAlgorithm::Aes256Cbc,
                            &sealed.iv,
                            PaddingMode::Iso10126,
                            None,
                            None,
                        )
                        .unwrap();
                    assert_eq!(*opened, data);
                });
            }
        });
    }

    #[test]
    fn test_fresh_iv_per_encryption() {
        let engine = CryptoEngine::new();
        let key = engine.generate_key(32).unwrap();

        let a = engine
            .encrypt(MESSAGE, &key, CipherAlgorithm::Aes256Gcm, PaddingMode::None, None, None)
            .unwrap();
        let b = engine
            .encrypt(MESSAGE, &key, CipherAlgorithm::Aes256Gcm, PaddingMode::None, None, None)
            .unwrap();

        assert_ne!(a.iv, b.iv);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_secure_buffer_holds_key_material() {
        let engine = CryptoEngine::new();
        let mut buffer = SecureBuffer::new(32);
        buffer
            .as_mut_slice()
            .copy_from_slice(&engine.generate_key(32).unwrap());

        let sealed = engine
            .encrypt(
                MESSAGE,
                buffer.as_slice(),
                CipherAlgorithm::ChaCha20Poly1305,
                PaddingMode::None,
                None,
                None,
            )
            .unwrap();

        let moved = buffer.take();
        assert!(buffer.is_empty());

        let opened = engine
            .decrypt(
                &sealed.ciphertext,
                moved.as_slice(),
                CipherAlgorithm::ChaCha20Poly1305,
                &sealed.iv,
                PaddingMode::None,
                None,
                sealed.tag.as_deref(),
            )
            .unwrap();
        assert_eq!(&*opened, MESSAGE);
    }

    #[test]
    fn test_integrity_check_with_hmac() {
        let engine = CryptoEngine::new();
        let mac_key = engine.generate_key(32).unwrap();

        let mac = engine.hmac(MESSAGE, &mac_key, HashAlgorithm::Sha256).unwrap();
        let recomputed = engine.hmac(MESSAGE, &mac_key, HashAlgorithm::Sha256).unwrap();
        let forged = engine.hmac(b"forged", &mac_key, HashAlgorithm::Sha256).unwrap();

        assert!(CryptoEngine::secure_compare(&mac, &recomputed));
        assert!(!CryptoEngine::secure_compare(&mac, &forged));
    }
}
