//! # Chiffre Crypto
//!
//! Symmetric cryptography engine for Chiffre.
//!
//! A single entry point, [`CryptoEngine`], maps an algorithm identifier plus
//! key, IV, AAD and tag material to ciphertext, independently of the library
//! that performs the underlying transform. This crate provides:
//! - Symmetric encryption (AES-128/192/256 in CBC, CTR and GCM, ChaCha20,
//!   ChaCha20-Poly1305)
//! - Block padding (PKCS#7, PKCS#5, ISO 10126, ANSI X9.23, zero padding)
//! - Password-based key derivation (PBKDF2, scrypt, Argon2id)
//! - Digests and HMAC (SHA-1, SHA-2, MD5)
//! - Secure random generation
//! - Zeroizing buffers and constant-time comparison
//!
//! ## Example
//!
//! ```
//! use chiffre_crypto::{CipherAlgorithm, CryptoEngine, PaddingMode};
//!
//! let engine = CryptoEngine::new();
//! let key = engine.generate_key(32).unwrap();
//!
//! let sealed = engine
//!     .encrypt(b"attack at dawn", &key, CipherAlgorithm::Aes256Gcm, PaddingMode::None, None, None)
//!     .unwrap();
//!
//! let plaintext = engine
//!     .decrypt(
//!         &sealed.ciphertext,
//!         &key,
//!         CipherAlgorithm::Aes256Gcm,
//!         &sealed.iv,
//!         PaddingMode::None,
//!         None,
//!         sealed.tag.as_deref(),
//!     )
//!     .unwrap();
//!
//! assert_eq!(&*plaintext, b"attack at dawn");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod algorithm;
pub mod digest;
pub mod encoding;
pub mod engine;
pub mod error;
pub mod kdf;
pub mod padding;
pub mod provider;
pub mod random;
pub mod secure;

pub use algorithm::{AlgorithmSpec, CipherAlgorithm};
pub use digest::HashAlgorithm;
pub use engine::{CryptoEngine, EncryptionResult};
pub use error::{CryptoError, ErrorKind};
pub use kdf::{DerivedKey, KeyDerivationFunction, KeyDerivationOptions};
pub use padding::PaddingMode;
pub use provider::{CipherProvider, Direction, RustCryptoProvider};
pub use random::{EntropySource, OsEntropy, SecureRandom};
pub use secure::SecureBuffer;
