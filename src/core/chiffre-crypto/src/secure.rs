//! Zeroizing memory for sensitive data.
//!
//! [`SecureBuffer`] owns a fixed-size region that is wiped before it is
//! released, whether on drop, on resize or through [`SecureBuffer::clear`].
//! The crate forbids `unsafe`, so pages are not locked against swapping.

use std::fmt;

use subtle::ConstantTimeEq;
use zeroize::Zeroize;

/// A heap buffer that is zeroized on drop.
///
/// The buffer is deliberately not `Clone`: each secret has a single owner.
#[derive(Default)]
pub struct SecureBuffer {
    data: Box<[u8]>,
}

impl SecureBuffer {
    /// Allocates a zero-filled buffer of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0u8; size].into_boxed_slice(),
        }
    }

    /// Copies `bytes` into a new buffer.
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self {
            data: bytes.to_vec().into_boxed_slice(),
        }
    }

    /// Overwrites the contents with zeros, keeping the size.
    pub fn clear(&mut self) {
        self.data.zeroize();
    }

    /// Replaces the region with a fresh zeroed one of `new_size` bytes.
    ///
    /// The old contents are wiped first. Resizing to the current size is a
    /// no-op and keeps the contents.
    pub fn resize(&mut self, new_size: usize) {
        if new_size == self.data.len() {
            return;
        }
        self.data.zeroize();
        self.data = vec![0u8; new_size].into_boxed_slice();
    }

    /// Moves the contents out, leaving this buffer empty.
    pub fn take(&mut self) -> SecureBuffer {
        SecureBuffer {
            data: std::mem::take(&mut self.data),
        }
    }

    /// Returns the contents.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Returns the contents mutably.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Size of the region in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` for an empty (or moved-from) buffer.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Drop for SecureBuffer {
    fn drop(&mut self) {
        self.data.zeroize();
    }
}

impl AsRef<[u8]> for SecureBuffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl fmt::Debug for SecureBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureBuffer")
            .field("len", &self.data.len())
            .field("data", &"[REDACTED]")
            .finish()
    }
}

/// Compares two byte strings in constant time.
///
/// Returns `false` immediately when the lengths differ; lengths are not
/// treated as secret.
pub fn secure_compare(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}

/// Overwrites `data` with zeros in a way the optimizer cannot elide.
pub fn secure_zero(data: &mut [u8]) {
    data.zeroize();
}
