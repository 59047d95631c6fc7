//! Password-based key derivation.
//!
//! Routes a password, salt and [`KeyDerivationOptions`] to one of:
//! - PBKDF2-HMAC-SHA256 (RFC 8018)
//! - scrypt (RFC 7914), `N = iterations`, `r = 8`, `p = parallelism`
//! - Argon2id v1.3, `t = iterations`, `m = memory` KiB, `p = parallelism`
//!
//! The memory-hard functions never fall back to PBKDF2.

use std::fmt;
use std::str::FromStr;

use argon2::{Algorithm, Argon2, Params as Argon2Params, Version};
use hmac::Hmac;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::CryptoError;
use crate::random::{EntropySource, OsEntropy, SecureRandom};

/// scrypt block size parameter `r`.
pub const SCRYPT_BLOCK_SIZE: u32 = 8;

/// Argon2 rejects salts shorter than this.
pub const ARGON2_MIN_SALT_LEN: usize = 8;

/// Argon2 rejects outputs shorter than this.
pub const ARGON2_MIN_OUTPUT_LEN: u32 = 4;

// Only consulted by scrypt's PHC-string support; raw output length is
// passed separately.
const SCRYPT_PARAMS_LEN: usize = 32;

/// Supported key derivation functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum KeyDerivationFunction {
    /// PBKDF2 with HMAC-SHA256.
    #[default]
    Pbkdf2,
    /// scrypt.
    Scrypt,
    /// Argon2id.
    Argon2,
}

impl KeyDerivationFunction {
    /// All key derivation functions.
    pub const ALL: [KeyDerivationFunction; 3] = [Self::Pbkdf2, Self::Scrypt, Self::Argon2];

    /// Canonical textual identifier, e.g. `PBKDF2`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pbkdf2 => "PBKDF2",
            Self::Scrypt => "SCRYPT",
            Self::Argon2 => "ARGON2",
        }
    }
}

impl fmt::Display for KeyDerivationFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyDerivationFunction {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kdf| kdf.as_str() == s)
            .ok_or_else(|| {
                CryptoError::InvalidParameter(format!("unknown key derivation function: {s}"))
            })
    }
}

/// Parameters for password-based key derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyDerivationOptions {
    /// Derivation function.
    pub function: KeyDerivationFunction,
    /// PBKDF2 rounds, scrypt `N` (power of two) or Argon2 time cost.
    pub iterations: u32,
    /// Length of the generated salt in bytes.
    pub salt_length: u32,
    /// Length of the derived key in bytes.
    pub key_length: u32,
    /// Argon2 memory cost in KiB.
    pub memory: u32,
    /// scrypt `p` or Argon2 lanes.
    pub parallelism: u32,
}

impl Default for KeyDerivationOptions {
    fn default() -> Self {
        Self::pbkdf2()
    }
}

impl KeyDerivationOptions {
    /// PBKDF2-HMAC-SHA256 with 100 000 rounds.
    pub fn pbkdf2() -> Self {
        Self {
            function: KeyDerivationFunction::Pbkdf2,
            iterations: 100_000,
            salt_length: 32,
            key_length: 32,
            memory: 0,
            parallelism: 1,
        }
    }

    /// scrypt with `N = 2^14`, `r = 8`, `p = 1`.
    pub fn scrypt() -> Self {
        Self {
            function: KeyDerivationFunction::Scrypt,
            iterations: 1 << 14,
            ..Self::pbkdf2()
        }
    }

    /// Argon2id with 64 MiB, 3 passes and 4 lanes.
    pub fn argon2() -> Self {
        Self {
            function: KeyDerivationFunction::Argon2,
            iterations: 3,
            memory: 65_536,
            parallelism: 4,
            ..Self::pbkdf2()
        }
    }
}

/// A derived key together with the salt it was derived with.
///
/// The key is zeroized on drop. The salt is not secret and must be stored
/// next to the ciphertext so the key can be derived again.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: Vec<u8>,
    #[zeroize(skip)]
    salt: Vec<u8>,
}

impl DerivedKey {
    /// Returns the derived key bytes.
    #[inline]
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Returns the salt.
    #[inline]
    pub fn salt(&self) -> &[u8] {
        &self.salt
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedKey")
            .field("key", &"[REDACTED]")
            .field("salt", &self.salt)
            .finish()
    }
}

/// Derives a key from `password` with a freshly generated OS-random salt.
pub fn derive_key(
    password: &[u8],
    options: &KeyDerivationOptions,
) -> Result<DerivedKey, CryptoError> {
    derive_key_with_rng(password, options, &SecureRandom::new(OsEntropy))
}

/// Derives a key from `password` with a salt drawn from `rng`.
pub fn derive_key_with_rng<E: EntropySource>(
    password: &[u8],
    options: &KeyDerivationOptions,
    rng: &SecureRandom<E>,
) -> Result<DerivedKey, CryptoError> {
    if options.salt_length == 0 {
        return Err(CryptoError::InvalidParameter(
            "salt length must be > 0".to_string(),
        ));
    }
    validate(options)?;

    let salt = rng.random_bytes(options.salt_length as usize)?;
    let mut key = derive_key_with_salt(password, &salt, options)?;

    Ok(DerivedKey {
        key: std::mem::take(&mut *key),
        salt,
    })
}

/// Derives a key from `password` and an existing `salt`.
///
/// # Errors
///
/// Returns `InvalidParameter` for unusable options and `CryptoOperation` if
/// the derivation itself fails.
pub fn derive_key_with_salt(
    password: &[u8],
    salt: &[u8],
    options: &KeyDerivationOptions,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    validate(options)?;

    debug!(
        function = %options.function,
        iterations = options.iterations,
        key_length = options.key_length,
        "Deriving key"
    );

    let mut output = Zeroizing::new(vec![0u8; options.key_length as usize]);

    match options.function {
        KeyDerivationFunction::Pbkdf2 => {
            pbkdf2::pbkdf2::<Hmac<Sha256>>(password, salt, options.iterations, &mut output)
                .map_err(|e| {
                    CryptoError::CryptoOperation(format!("PBKDF2 derivation failed: {e}"))
                })?;
        }
        KeyDerivationFunction::Scrypt => {
            let log_n = options.iterations.trailing_zeros() as u8;
            let params = scrypt::Params::new(
                log_n,
                SCRYPT_BLOCK_SIZE,
                options.parallelism,
                SCRYPT_PARAMS_LEN,
            )
            .map_err(|e| CryptoError::InvalidParameter(format!("invalid scrypt parameters: {e}")))?;

            scrypt::scrypt(password, salt, &params, &mut output)
                .map_err(|e| {
                    CryptoError::CryptoOperation(format!("scrypt derivation failed: {e}"))
                })?;
        }
        KeyDerivationFunction::Argon2 => {
            if salt.len() < ARGON2_MIN_SALT_LEN {
                return Err(CryptoError::InvalidParameter(format!(
                    "Argon2 salt must be at least {ARGON2_MIN_SALT_LEN} bytes"
                )));
            }

            let params = Argon2Params::new(
                options.memory,
                options.iterations,
                options.parallelism,
                Some(options.key_length as usize),
            )
            .map_err(|e| CryptoError::InvalidParameter(format!("invalid Argon2 parameters: {e}")))?;

            Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
                .hash_password_into(password, salt, &mut output)
                .map_err(|e| {
                    CryptoError::CryptoOperation(format!("Argon2 derivation failed: {e}"))
                })?;
        }
    }

    Ok(output)
}

fn validate(options: &KeyDerivationOptions) -> Result<(), CryptoError> {
    if options.key_length == 0 {
        return Err(CryptoError::InvalidParameter(
            "key length must be > 0".to_string(),
        ));
    }
    if options.iterations == 0 {
        return Err(CryptoError::InvalidParameter(
            "iterations must be > 0".to_string(),
        ));
    }

    match options.function {
        KeyDerivationFunction::Pbkdf2 => {}
        KeyDerivationFunction::Scrypt => {
            if options.iterations < 2 || !options.iterations.is_power_of_two() {
                return Err(CryptoError::InvalidParameter(format!(
                    "scrypt cost must be a power of two >= 2, got {}",
                    options.iterations
                )));
            }
            if options.parallelism == 0 {
                return Err(CryptoError::InvalidParameter(
                    "parallelism must be > 0".to_string(),
                ));
            }
        }
        KeyDerivationFunction::Argon2 => {
            if options.parallelism == 0 {
                return Err(CryptoError::InvalidParameter(
                    "parallelism must be > 0".to_string(),
                ));
            }
            if u64::from(options.memory) < 8 * u64::from(options.parallelism) {
                return Err(CryptoError::InvalidParameter(format!(
                    "Argon2 memory must be at least 8 KiB per lane, got {} KiB for {} lanes",
                    options.memory, options.parallelism
                )));
            }
            if options.key_length < ARGON2_MIN_OUTPUT_LEN {
                return Err(CryptoError::InvalidParameter(format!(
                    "Argon2 output must be at least {ARGON2_MIN_OUTPUT_LEN} bytes"
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    fn fast_pbkdf2() -> KeyDerivationOptions {
        KeyDerivationOptions {
            iterations: 1_000,
            ..KeyDerivationOptions::pbkdf2()
        }
    }

    fn fast_scrypt() -> KeyDerivationOptions {
        KeyDerivationOptions {
            iterations: 1 << 10,
            ..KeyDerivationOptions::scrypt()
        }
    }

    fn fast_argon2() -> KeyDerivationOptions {
        KeyDerivationOptions {
            iterations: 1,
            memory: 64,
            parallelism: 1,
            ..KeyDerivationOptions::argon2()
        }
    }

    #[test]
    fn test_pbkdf2_rfc7914_vector() {
        let options = KeyDerivationOptions {
            iterations: 1,
            key_length: 64,
            ..KeyDerivationOptions::pbkdf2()
        };

        let key = derive_key_with_salt(b"passwd", b"salt", &options).unwrap();

        let expected = hex::decode(
            "55ac046e56e3089fec1691c22544b605f94185216dde0465e68b9d57c20dacbc\
             49ca9cccf179b645991664b39d77ef317c71b845b1e30bd509112041d3a19783",
        )
        .unwrap();
        assert_eq!(&*key, &expected);
    }

    #[test]
    fn test_scrypt_rfc7914_vector() {
        let options = KeyDerivationOptions {
            iterations: 1024,
            parallelism: 16,
            key_length: 64,
            ..KeyDerivationOptions::scrypt()
        };

        let key = derive_key_with_salt(b"password", b"NaCl", &options).unwrap();

        let expected = hex::decode(
            "fdbabe1c9d3472007856e7190d01e9fe7c6ad7cbc8237830e77376634b373162\
             2eaf30d92e22a3886ff109279d9830dac727afb94a83ee6d8360cbdfa2cc0640",
        )
        .unwrap();
        assert_eq!(&*key, &expected);
    }

    #[test]
    fn test_memory_hard_functions_differ_from_pbkdf2() {
        let salt = [7u8; 16];
        let pbkdf2 = derive_key_with_salt(b"secret", &salt, &fast_pbkdf2()).unwrap();
        let scrypt = derive_key_with_salt(b"secret", &salt, &fast_scrypt()).unwrap();
        let argon2 = derive_key_with_salt(b"secret", &salt, &fast_argon2()).unwrap();

        assert_ne!(*pbkdf2, *scrypt);
        assert_ne!(*pbkdf2, *argon2);
        assert_ne!(*scrypt, *argon2);
    }

    #[test]
    fn test_derive_key_deterministic() {
        let salt = [42u8; 16];
        for options in [fast_pbkdf2(), fast_scrypt(), fast_argon2()] {
            let key1 = derive_key_with_salt(b"password", &salt, &options).unwrap();
            let key2 = derive_key_with_salt(b"password", &salt, &options).unwrap();
            assert_eq!(*key1, *key2, "{}", options.function);
            assert_eq!(key1.len(), 32);
        }
    }

    #[test]
    fn test_derive_key_generates_salt() {
        let options = KeyDerivationOptions {
            salt_length: 24,
            key_length: 48,
            ..fast_pbkdf2()
        };

        let first = derive_key(b"password", &options).unwrap();
        let second = derive_key(b"password", &options).unwrap();

        assert_eq!(first.salt().len(), 24);
        assert_eq!(first.key().len(), 48);
        assert_ne!(first.salt(), second.salt());
        assert_ne!(first.key(), second.key());

        let again = derive_key_with_salt(b"password", first.salt(), &options).unwrap();
        assert_eq!(first.key(), &again[..]);
    }

    #[test]
    fn test_argon2_parameters_are_honoured() {
        let salt = [1u8; 16];
        let base = derive_key_with_salt(b"pw", &salt, &fast_argon2()).unwrap();

        let more_memory = KeyDerivationOptions {
            memory: 128,
            ..fast_argon2()
        };
        let more_passes = KeyDerivationOptions {
            iterations: 2,
            ..fast_argon2()
        };

        assert_ne!(*base, *derive_key_with_salt(b"pw", &salt, &more_memory).unwrap());
        assert_ne!(*base, *derive_key_with_salt(b"pw", &salt, &more_passes).unwrap());
    }

    #[test]
    fn test_invalid_options_rejected() {
        let cases = [
            KeyDerivationOptions {
                key_length: 0,
                ..fast_pbkdf2()
            },
            KeyDerivationOptions {
                iterations: 0,
                ..fast_pbkdf2()
            },
            KeyDerivationOptions {
                iterations: 1000,
                ..fast_scrypt()
            },
            KeyDerivationOptions {
                parallelism: 0,
                ..fast_scrypt()
            },
            KeyDerivationOptions {
                memory: 0,
                ..fast_argon2()
            },
            KeyDerivationOptions {
                key_length: 2,
                ..fast_argon2()
            },
            // 8 * lanes would overflow u32.
            KeyDerivationOptions {
                parallelism: 0x2000_0000,
                ..fast_argon2()
            },
            KeyDerivationOptions {
                memory: u32::MAX,
                parallelism: u32::MAX,
                ..fast_argon2()
            },
        ];

        for options in cases {
            let result = derive_key_with_salt(b"pw", &[0u8; 16], &options);
            assert!(
                matches!(result, Err(CryptoError::InvalidParameter(_))),
                "{options:?}"
            );
        }
    }

    #[test]
    fn test_argon2_short_salt_rejected() {
        let result = derive_key_with_salt(b"pw", b"short", &fast_argon2());
        assert!(matches!(result, Err(CryptoError::InvalidParameter(_))));
    }

    #[test]
    fn test_zero_salt_length_rejected() {
        let options = KeyDerivationOptions {
            salt_length: 0,
            ..fast_pbkdf2()
        };
        assert!(matches!(
            derive_key(b"pw", &options),
            Err(CryptoError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_derived_key_debug_redacted() {
        let derived = derive_key(b"pw", &fast_pbkdf2()).unwrap();
        let debug_str = format!("{:?}", derived);
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_options_serde() {
        let json = r#"{"function":"ARGON2","iterations":2,"memory":1024}"#;
        let options: KeyDerivationOptions = serde_json::from_str(json).unwrap();

        assert_eq!(options.function, KeyDerivationFunction::Argon2);
        assert_eq!(options.iterations, 2);
        assert_eq!(options.memory, 1024);
        assert_eq!(options.salt_length, 32);
        assert_eq!(options.parallelism, 1);
    }

    #[test]
    fn test_function_text_roundtrip() {
        for kdf in KeyDerivationFunction::ALL {
            assert_eq!(kdf.to_string().parse::<KeyDerivationFunction>().unwrap(), kdf);
        }
        assert!(matches!(
            "BCRYPT".parse::<KeyDerivationFunction>(),
            Err(CryptoError::InvalidParameter(_))
        ));
    }
}
