//! Cryptographic error types.

use thiserror::Error;

/// Errors that can occur during cryptographic operations.
///
/// `InvalidParameter` and `InvalidKey` are caller bugs and are always raised
/// before any transform runs. `CryptoOperation` covers legitimate runtime
/// failures such as a wrong authentication tag.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Malformed or unsupported input shape.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Key length does not match the chosen algorithm.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The transform, derivation, authentication or padding check failed.
    #[error("crypto operation failed: {0}")]
    CryptoOperation(String),
}

/// Coarse classification of a [`CryptoError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// See [`CryptoError::InvalidParameter`].
    InvalidParameter,
    /// See [`CryptoError::InvalidKey`].
    InvalidKey,
    /// See [`CryptoError::CryptoOperation`].
    CryptoOperation,
}

impl CryptoError {
    /// Returns the taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidParameter(_) => ErrorKind::InvalidParameter,
            Self::InvalidKey(_) => ErrorKind::InvalidKey,
            Self::CryptoOperation(_) => ErrorKind::CryptoOperation,
        }
    }

    /// Returns `true` if the error stems from bad caller input.
    pub fn is_caller_error(&self) -> bool {
        !matches!(self, Self::CryptoOperation(_))
    }

    pub(crate) fn authentication_failed() -> Self {
        Self::CryptoOperation("authentication failed".to_string())
    }

    pub(crate) fn invalid_padding() -> Self {
        Self::CryptoOperation("invalid padding".to_string())
    }
}
